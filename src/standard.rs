//! # Standard Callbacks
//!
//! Typed payloads for the well-known callback channels listed in
//! [`crate::constants::callbacks`].
//!
//! The dispatch core only moves bytes. This module fixes a JSON encoding for the
//! standard channels so modules and applications can exchange structured
//! values without agreeing on anything else:
//!
//! ```rust
//! use callback_core::standard::{self, Question, QuestionIn, QuestionOut};
//! use callback_core::CallbackContext;
//!
//! let ctx = CallbackContext::new();
//! ctx.set_default(
//!     callback_core::constants::callbacks::QUESTION,
//!     standard::typed_handler::<Question, _>(|question, answer| {
//!         answer.answer = question.choices.len() as i32 - 1;
//!     })
//!     .into_ref(),
//! );
//!
//! let question = QuestionIn {
//!     primary_message: "Replace file?".into(),
//!     choices: vec!["Cancel".into(), "Replace".into()],
//!     ..Default::default()
//! };
//! let mut answer = QuestionOut::default();
//! assert!(standard::invoke_typed::<Question>(&ctx, &question, &mut answer).unwrap());
//! assert_eq!(answer.answer, 1);
//! ```

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bridge::CallbackResponder;
use crate::constants::callbacks;
use crate::context::CallbackContext;
use crate::error::{CallbackError, Result};
use crate::handler::CallbackHandler;

/// A callback channel with a fixed name and payload types.
pub trait StandardCallback: 'static {
    const NAME: &'static str;
    type In: Serialize + DeserializeOwned + Send + 'static;
    type Out: Serialize + DeserializeOwned + Default + Send + 'static;
}

/// Invoke channel `C`, decoding the handler's reply into `out`.
///
/// `out` is sent along as the initial reply so handlers may fill only part of
/// it. It is left untouched when no handler is registered.
pub fn invoke_typed<C: StandardCallback>(
    ctx: &CallbackContext,
    input: &C::In,
    out: &mut C::Out,
) -> Result<bool> {
    let input = serde_json::to_vec(input).map_err(|e| CallbackError::payload(C::NAME, e))?;
    let mut buffer = serde_json::to_vec(out).map_err(|e| CallbackError::payload(C::NAME, e))?;

    if !ctx.try_invoke(C::NAME, &input, &mut buffer)? {
        return Ok(false);
    }

    *out = serde_json::from_slice(&buffer).map_err(|e| CallbackError::payload(C::NAME, e))?;
    Ok(true)
}

/// Adapt a typed synchronous closure into a handler for channel `C`.
///
/// Input that does not decode is logged and the reply is left as it was.
pub fn typed_handler<C, F>(f: F) -> CallbackHandler
where
    C: StandardCallback,
    F: Fn(&C::In, &mut C::Out) + Send + Sync + 'static,
{
    CallbackHandler::new(move |input, output| {
        let Some(input) = decode_input::<C>(input) else {
            return;
        };
        let mut reply = decode_reply::<C>(output);
        f(&input, &mut reply);
        match serde_json::to_vec(&reply) {
            Ok(bytes) => *output = bytes,
            Err(e) => warn!(callback = C::NAME, error = %e, "typed reply not encodable"),
        }
    })
}

/// Adapt a typed asynchronous closure into a bridged handler for channel `C`.
///
/// The closure receives the decoded input, the initial reply and a responder.
/// Input that does not decode abandons the call.
pub fn typed_async_handler<C, F>(f: F) -> CallbackHandler
where
    C: StandardCallback,
    F: Fn(C::In, C::Out, TypedResponder<C>) + Send + Sync + 'static,
{
    CallbackHandler::new_async(move |request| {
        let (input, output, responder) = request.into_parts();
        let Some(input) = decode_input::<C>(&input) else {
            return;
        };
        let reply = decode_reply::<C>(&output);
        f(
            input,
            reply,
            TypedResponder {
                inner: responder,
                _channel: PhantomData,
            },
        );
    })
}

/// Responder for a typed async handler.
#[derive(Debug)]
pub struct TypedResponder<C: StandardCallback> {
    inner: CallbackResponder,
    _channel: PhantomData<fn() -> C>,
}

impl<C: StandardCallback> TypedResponder<C> {
    pub fn respond(self, reply: C::Out) {
        match serde_json::to_vec(&reply) {
            Ok(bytes) => self.inner.respond(bytes),
            // Dropping the responder wakes the caller as abandoned.
            Err(e) => warn!(callback = C::NAME, error = %e, "typed reply not encodable"),
        }
    }
}

fn decode_input<C: StandardCallback>(input: &[u8]) -> Option<C::In> {
    match serde_json::from_slice(input) {
        Ok(input) => Some(input),
        Err(e) => {
            warn!(callback = C::NAME, error = %e, "typed callback input not decodable");
            None
        }
    }
}

fn decode_reply<C: StandardCallback>(output: &[u8]) -> C::Out {
    if output.is_empty() {
        return C::Out::default();
    }
    serde_json::from_slice(output).unwrap_or_default()
}

macro_rules! standard_callback {
    ($(#[$meta:meta])* $marker:ident, $name:expr, $input:ty, $output:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub enum $marker {}

        impl StandardCallback for $marker {
            const NAME: &'static str = $name;
            type In = $input;
            type Out = $output;
        }
    };
}

// -- Authentication ------------------------------------------------------

/// What a full-authentication prompt needs to ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullAuthenticationFlags {
    pub previous_attempt_failed: bool,
    pub need_password: bool,
    pub need_username: bool,
    pub need_domain: bool,
    pub saving_supported: bool,
    pub anon_supported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullAuthenticationIn {
    pub flags: FullAuthenticationFlags,
    pub uri: String,
    pub protocol: Option<String>,
    pub server: Option<String>,
    pub object: Option<String>,
    pub port: u16,
    pub authtype: Option<String>,
    pub username: Option<String>,
    pub domain: Option<String>,
    /// Prefill for the prompt.
    pub default_user: Option<String>,
    pub default_domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullAuthenticationOut {
    pub abort_auth: bool,
    pub username: Option<String>,
    pub domain: Option<String>,
    pub password: Option<String>,
    pub save_password: bool,
    pub keyring: Option<String>,
    pub anon_selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillAuthenticationIn {
    pub uri: String,
    pub protocol: Option<String>,
    pub server: Option<String>,
    pub object: Option<String>,
    pub port: u16,
    pub authtype: Option<String>,
    pub username: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillAuthenticationOut {
    /// False when no stored credentials matched.
    pub valid: bool,
    pub username: Option<String>,
    pub domain: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveAuthenticationIn {
    pub keyring: Option<String>,
    pub uri: String,
    pub protocol: Option<String>,
    pub server: Option<String>,
    pub object: Option<String>,
    pub port: u16,
    pub authtype: Option<String>,
    pub username: Option<String>,
    pub domain: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAuthenticationOut {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    #[default]
    Basic,
    Digest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationIn {
    pub uri: String,
    pub realm: Option<String>,
    pub previous_attempt_failed: bool,
    pub auth_type: AuthType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationOut {
    pub username: Option<String>,
    pub password: Option<String>,
}

// -- Questions and status ------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionIn {
    pub primary_message: String,
    pub secondary_message: Option<String>,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionOut {
    /// Index into `choices`; -1 when the user dismissed the question.
    pub answer: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusMessageIn {
    pub uri: String,
    pub message: Option<String>,
    /// Progress from 0 to 100, or -1 when unknown.
    pub percentage: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessageOut {}

// -- HTTP headers --------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalHeadersIn {
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalHeadersOut {
    /// Complete header lines, e.g. `"X-Trace: 1"`.
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivedHeadersIn {
    pub uri: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedHeadersOut {}

standard_callback!(
    /// Interactive credential prompt.
    FullAuthentication,
    callbacks::FULL_AUTHENTICATION,
    FullAuthenticationIn,
    FullAuthenticationOut
);
standard_callback!(
    /// Non-interactive lookup of stored credentials.
    FillAuthentication,
    callbacks::FILL_AUTHENTICATION,
    FillAuthenticationIn,
    FillAuthenticationOut
);
standard_callback!(
    SaveAuthentication,
    callbacks::SAVE_AUTHENTICATION,
    SaveAuthenticationIn,
    SaveAuthenticationOut
);
standard_callback!(
    /// Older username/password prompt.
    Authentication,
    callbacks::AUTHENTICATION,
    AuthenticationIn,
    AuthenticationOut
);
standard_callback!(
    HttpProxyAuthentication,
    callbacks::HTTP_PROXY_AUTHENTICATION,
    AuthenticationIn,
    AuthenticationOut
);
standard_callback!(Question, callbacks::QUESTION, QuestionIn, QuestionOut);
standard_callback!(
    AdditionalHeaders,
    callbacks::HTTP_SEND_ADDITIONAL_HEADERS,
    AdditionalHeadersIn,
    AdditionalHeadersOut
);
standard_callback!(
    ReceivedHeaders,
    callbacks::HTTP_RECEIVED_HEADERS,
    ReceivedHeadersIn,
    ReceivedHeadersOut
);
standard_callback!(
    StatusMessage,
    callbacks::STATUS_MESSAGE,
    StatusMessageIn,
    StatusMessageOut
);
