//! # Callback Handlers
//!
//! A handler is the function a callback name resolves to, plus whatever data it
//! captured and an optional destructor for that data.
//!
//! Handlers are immutable once built and shared through [`HandlerRef`]
//! (`Arc<CallbackHandler>`). Every registry slot, every override stack entry and
//! every in-flight invocation holds its own strong reference, and the
//! destructor runs exactly once, when the last of those references goes away.
//! Replacing a handler means installing a new `HandlerRef`, never mutating one.

use std::fmt;
use std::sync::Arc;

use crate::bridge::{AsyncBridge, AsyncCallbackRequest};

/// Synchronous handler body: reads `input`, fills `output`.
pub type CallbackFn = dyn Fn(&[u8], &mut Vec<u8>) + Send + Sync;

/// Asynchronous handler body. It may return before the work is finished and
/// completes the call later through the request's responder.
pub type AsyncCallbackFn = dyn Fn(AsyncCallbackRequest) + Send + Sync;

/// Cleanup hook run once when the handler is released.
pub type Destructor = Box<dyn FnOnce() + Send>;

/// Shared handle to a registered handler.
pub type HandlerRef = Arc<CallbackHandler>;

/// Which table family a handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Runs on the invoking thread.
    Direct,
    /// Runs wherever the installed forwarder sends it; the invoking thread blocks.
    Async,
}

impl Tier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum HandlerBody {
    Direct(Box<CallbackFn>),
    Async(AsyncBridge),
}

/// An installed callback handler.
pub struct CallbackHandler {
    body: HandlerBody,
    destructor: parking_lot::Mutex<Option<Destructor>>,
}

impl CallbackHandler {
    /// Wrap a synchronous function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[u8], &mut Vec<u8>) + Send + Sync + 'static,
    {
        Self {
            body: HandlerBody::Direct(Box::new(f)),
            destructor: parking_lot::Mutex::new(None),
        }
    }

    /// Wrap an asynchronous function behind an [`AsyncBridge`], so it can be
    /// invoked like any synchronous handler.
    pub fn new_async<F>(f: F) -> Self
    where
        F: Fn(AsyncCallbackRequest) + Send + Sync + 'static,
    {
        Self {
            body: HandlerBody::Async(AsyncBridge::new(Arc::new(f))),
            destructor: parking_lot::Mutex::new(None),
        }
    }

    /// Attach a destructor for the handler's user data.
    #[must_use]
    pub fn with_destructor<D>(self, destructor: D) -> Self
    where
        D: FnOnce() + Send + 'static,
    {
        *self.destructor.lock() = Some(Box::new(destructor));
        self
    }

    /// Finish construction.
    pub fn into_ref(self) -> HandlerRef {
        Arc::new(self)
    }

    /// True when this handler goes through the async bridge.
    pub fn is_async(&self) -> bool {
        matches!(self.body, HandlerBody::Async(_))
    }

    pub(crate) fn bridge(&self) -> Option<&AsyncBridge> {
        match &self.body {
            HandlerBody::Async(bridge) => Some(bridge),
            HandlerBody::Direct(_) => None,
        }
    }

    /// Run a synchronous body. Async bodies are driven by the dispatcher,
    /// which owns the forwarder and the bridge settings.
    pub(crate) fn call_direct(&self, input: &[u8], output: &mut Vec<u8>) -> bool {
        match &self.body {
            HandlerBody::Direct(f) => {
                f(input, output);
                true
            }
            HandlerBody::Async(_) => false,
        }
    }
}

impl Drop for CallbackHandler {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.get_mut().take() {
            destructor();
        }
    }
}

impl fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("async", &self.is_async())
            .field("has_destructor", &self.destructor.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_destructor_runs_once_after_last_reference() {
        let drops = Arc::new(AtomicUsize::new(0));
        let counter = drops.clone();
        let handler = CallbackHandler::new(|_, out| out.push(1))
            .with_destructor(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .into_ref();

        let second = handler.clone();
        drop(handler);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(second);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_direct_handler_fills_output() {
        let handler = CallbackHandler::new(|input, out| out.extend_from_slice(input));
        let mut out = Vec::new();
        assert!(handler.call_direct(b"abc", &mut out));
        assert_eq!(out, b"abc");
        assert!(!handler.is_async());
    }

    #[test]
    fn test_async_handler_is_not_called_directly() {
        let handler = CallbackHandler::new_async(|request| request.respond_with(Vec::new()));
        let mut out = vec![9];
        assert!(handler.is_async());
        assert!(!handler.call_direct(b"", &mut out));
        assert_eq!(out, vec![9]);
    }
}
