//! # Async Bridge
//!
//! Makes an asynchronous handler look like an ordinary blocking call.
//!
//! ## Overview
//!
//! An async handler does not have to produce its reply before returning. It is
//! handed an [`AsyncCallbackRequest`] and may finish the work anywhere (usually
//! on the thread that owns the UI event loop), completing the call by sending
//! the filled output through the request's [`CallbackResponder`].
//!
//! The invoking thread goes through four states for every call:
//!
//! ```text
//! Dispatching -> Blocked -> Completed -> Resumed
//!   forward       wait on     responder     copy reply
//!   request       channel     fires         into `out`
//! ```
//!
//! Where the request is forwarded to is decided by the embedder through the
//! [`AsyncDispatcher`] installed on the [`CallbackContext`](crate::CallbackContext).
//! Without one, the handler runs inline on the invoking thread.
//!
//! Each call owns a single-use completion channel, so concurrent bridged calls
//! never share wakeups and a reply can never be delivered to the wrong caller.

pub mod main_loop;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{trace, warn};

use crate::error::{CallbackError, Result};
use crate::handler::AsyncCallbackFn;

pub use main_loop::{MainLoop, MainLoopDispatcher};

/// Embedder hook deciding where async handlers run.
pub trait AsyncDispatcher: Send + Sync {
    /// Arrange for `callback` to run. Returning before it has run is expected.
    fn dispatch(&self, callback: ForwardedCallback);
}

/// Completion handle for one bridged call.
///
/// Sending consumes the responder, so a call completes at most once. Dropping it
/// without responding wakes the caller with an abandoned-response outcome.
pub struct CallbackResponder {
    name: Arc<str>,
    tx: Sender<Vec<u8>>,
}

impl CallbackResponder {
    /// Deliver the filled output and wake the blocked caller.
    pub fn respond(self, output: Vec<u8>) {
        trace!(callback = %self.name, bytes = output.len(), "async callback responded");
        // The caller may have given up after a timeout.
        if self.tx.send(output).is_err() {
            warn!(callback = %self.name, "async callback responded after its caller stopped waiting");
        }
    }

    pub fn callback_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CallbackResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackResponder")
            .field("name", &self.name)
            .finish()
    }
}

/// Arguments of one bridged call, as seen by the async handler.
///
/// `output` starts out as a copy of the caller's out buffer so handlers that
/// only fill in some fields behave the same as their synchronous counterparts.
#[derive(Debug)]
pub struct AsyncCallbackRequest {
    name: Arc<str>,
    input: Vec<u8>,
    output: Vec<u8>,
    responder: CallbackResponder,
}

impl AsyncCallbackRequest {
    pub fn callback_name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Vec<u8> {
        &mut self.output
    }

    /// Complete the call with the current contents of the output buffer.
    pub fn respond(self) {
        self.responder.respond(self.output);
    }

    /// Complete the call with a replacement output buffer.
    pub fn respond_with(self, output: Vec<u8>) {
        self.responder.respond(output);
    }

    /// Split the request so the reply can be produced somewhere else entirely.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>, CallbackResponder) {
        (self.input, self.output, self.responder)
    }
}

/// An async handler paired with the request it should process.
pub struct ForwardedCallback {
    handler: Arc<AsyncCallbackFn>,
    request: AsyncCallbackRequest,
}

impl ForwardedCallback {
    pub fn callback_name(&self) -> &str {
        self.request.callback_name()
    }

    /// Run the handler on the current thread.
    pub fn run(self) {
        (self.handler)(self.request);
    }
}

impl fmt::Debug for ForwardedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardedCallback")
            .field("request", &self.request)
            .finish()
    }
}

/// Synchronous front for an async handler.
pub struct AsyncBridge {
    handler: Arc<AsyncCallbackFn>,
}

impl AsyncBridge {
    pub(crate) fn new(handler: Arc<AsyncCallbackFn>) -> Self {
        Self { handler }
    }

    /// Forward one call and block until it completes.
    ///
    /// `output` is only written when the handler responds. With `timeout` set
    /// to `None` the wait is unconditional.
    pub(crate) fn call(
        &self,
        name: &str,
        input: &[u8],
        output: &mut Vec<u8>,
        forwarder: Option<&dyn AsyncDispatcher>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let name: Arc<str> = Arc::from(name);
        let (tx, rx) = channel::bounded(1);
        let forwarded = ForwardedCallback {
            handler: self.handler.clone(),
            request: AsyncCallbackRequest {
                name: name.clone(),
                input: input.to_vec(),
                output: output.clone(),
                responder: CallbackResponder {
                    name: name.clone(),
                    tx,
                },
            },
        };

        match forwarder {
            Some(forwarder) => {
                trace!(callback = %name, "forwarding async callback");
                forwarder.dispatch(forwarded);
            }
            None => {
                trace!(callback = %name, "no async forwarder installed, running inline");
                forwarded.run();
            }
        }

        *output = Self::wait(&name, &rx, timeout)?;
        Ok(())
    }

    fn wait(name: &str, rx: &Receiver<Vec<u8>>, timeout: Option<Duration>) -> Result<Vec<u8>> {
        match timeout {
            None => rx.recv().map_err(|_| CallbackError::ResponseAbandoned {
                name: name.to_string(),
            }),
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => CallbackError::ResponseTimeout {
                    name: name.to_string(),
                    timeout,
                },
                RecvTimeoutError::Disconnected => CallbackError::ResponseAbandoned {
                    name: name.to_string(),
                },
            }),
        }
    }
}

impl fmt::Debug for AsyncBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncBridge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct ThreadForwarder;

    impl AsyncDispatcher for ThreadForwarder {
        fn dispatch(&self, callback: ForwardedCallback) {
            thread::spawn(move || callback.run());
        }
    }

    fn bridge<F>(f: F) -> AsyncBridge
    where
        F: Fn(AsyncCallbackRequest) + Send + Sync + 'static,
    {
        AsyncBridge::new(Arc::new(f))
    }

    #[test]
    fn test_inline_response_completes_before_wait() {
        let bridge = bridge(|mut request| {
            let input = request.input().to_vec();
            request.output_mut().extend_from_slice(&input);
            request.respond();
        });

        let mut out = b">".to_vec();
        bridge.call("echo", b"hi", &mut out, None, None).unwrap();
        assert_eq!(out, b">hi");
    }

    #[test]
    fn test_forwarded_response_arrives_from_other_thread() {
        let bridge = bridge(|request| {
            thread::sleep(Duration::from_millis(20));
            request.respond_with(b"done".to_vec());
        });

        let mut out = Vec::new();
        bridge
            .call("slow", b"", &mut out, Some(&ThreadForwarder), None)
            .unwrap();
        assert_eq!(out, b"done");
    }

    #[test]
    fn test_dropped_responder_reports_abandoned_and_leaves_output() {
        let bridge = bridge(|request| drop(request));

        let mut out = b"sentinel".to_vec();
        let err = bridge.call("lost", b"", &mut out, None, None).unwrap_err();
        assert!(matches!(err, CallbackError::ResponseAbandoned { .. }));
        assert_eq!(out, b"sentinel");
    }

    #[test]
    fn test_timeout_leaves_output_untouched() {
        let (park_tx, park_rx) = channel::unbounded();
        let bridge = bridge(move |request| {
            // Keep the responder alive without answering.
            park_tx.send(request).unwrap();
        });

        let mut out = b"sentinel".to_vec();
        let err = bridge
            .call("stuck", b"", &mut out, None, Some(Duration::from_millis(10)))
            .unwrap_err();
        assert!(matches!(err, CallbackError::ResponseTimeout { .. }));
        assert!(err.is_bridge_failure());
        assert_eq!(out, b"sentinel");

        // A late reply is tolerated.
        park_rx.recv().unwrap().respond_with(b"late".to_vec());
    }
}
