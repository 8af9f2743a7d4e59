//! # Callback Dispatch
//!
//! Resolution and invocation of callbacks by name.
//!
//! ## Resolution order
//!
//! On a thread that is not running an async job:
//!
//! 1. top of the thread's direct override stack
//! 2. the direct default
//!
//! On a thread inside an async job the async tier is tried first, in the same
//! order, and the direct tier only when it has nothing for `name`. This lets a
//! worker job reach a handler bound to the main loop when one exists and still
//! use a plain synchronous default otherwise. When a transport is installed on the
//! context, resolution is skipped entirely and the call is handed to it.

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::context::CallbackContext;
use crate::error::{CallbackError, Result};
use crate::handler::{HandlerRef, Tier};

impl CallbackContext {
    /// Handler `invoke` would run for `name` on the calling thread, if any.
    pub fn resolve(&self, name: &str) -> Option<HandlerRef> {
        let (in_async_job, async_top, direct_top) = self
            .inner
            .live
            .with_current(|t| {
                let async_top = if t.in_async_job {
                    t.table(Tier::Async).top(name)
                } else {
                    None
                };
                (t.in_async_job, async_top, t.table(Tier::Direct).top(name))
            })
            .unwrap_or_else(|e| {
                debug!(callback = name, error = %e, "thread tables unavailable, using defaults only");
                (false, None, None)
            });

        if in_async_job {
            if let Some(handler) = self.lookup(Tier::Async, name, async_top) {
                return Some(handler);
            }
        }
        self.lookup(Tier::Direct, name, direct_top)
    }

    fn lookup(&self, tier: Tier, name: &str, top: Option<HandlerRef>) -> Option<HandlerRef> {
        if let Some(handler) = top {
            trace!(callback = name, tier = %tier, source = "override", "resolved callback");
            return Some(handler);
        }
        let handler = self.inner.registry.get(tier, name);
        if handler.is_some() {
            trace!(callback = name, tier = %tier, source = "default", "resolved callback");
        }
        handler
    }

    /// Invoke the callback registered for `name`.
    ///
    /// Returns `false` when nothing is registered, leaving `output` untouched.
    /// A bridged handler that times out or never responds still counts as
    /// found; the failure is logged and `output` keeps its previous contents.
    /// Use [`try_invoke`](Self::try_invoke) to observe those failures.
    pub fn invoke(&self, name: &str, input: &[u8], output: &mut Vec<u8>) -> bool {
        match self.try_invoke(name, input, output) {
            Ok(found) => found,
            Err(e) => {
                warn!(callback = name, error = %e, "bridged callback did not complete");
                true
            }
        }
    }

    /// Like [`invoke`](Self::invoke), reporting async bridge failures as errors.
    pub fn try_invoke(&self, name: &str, input: &[u8], output: &mut Vec<u8>) -> Result<bool> {
        if let Some(transport) = self.transport() {
            trace!(callback = name, "routing callback through transport");
            return Ok(transport.invoke(name, input, output));
        }

        let Some(handler) = self.resolve(name) else {
            trace!(callback = name, "no handler registered");
            return Ok(false);
        };

        let started = Instant::now();
        match handler.bridge() {
            Some(bridge) => {
                let forwarder = self.forwarder();
                bridge.call(
                    name,
                    input,
                    output,
                    forwarder.as_deref(),
                    self.inner.config.async_bridge.response_timeout(),
                )?;
            }
            None => {
                handler.call_direct(input, output);
            }
        }

        trace!(
            callback = name,
            async_handler = handler.is_async(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "callback invoked"
        );
        Ok(true)
    }

    /// Invoke `name` with an empty output buffer and return what it produced.
    pub fn call(&self, name: &str, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        if self.try_invoke(name, input, &mut output)? {
            Ok(output)
        } else {
            Err(CallbackError::NoHandler {
                name: name.to_string(),
            })
        }
    }
}
