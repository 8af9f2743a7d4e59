//! # Process-Wide Context
//!
//! Free functions over one lazily created [`CallbackContext`], for code that
//! does not thread a context through explicitly.
//!
//! The context is configured from [`ConfigManager::load`] on first use, falling
//! back to defaults when no configuration can be loaded.
//!
//! Thread-local destructors do not run for every thread at process exit, so
//! applications should hold an [`ExitSweep`] in `main`:
//!
//! ```rust,no_run
//! fn main() {
//!     let _sweep = callback_core::global::install_exit_sweep();
//!     // ... application ...
//! }
//! ```

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::config::ConfigManager;
use crate::context::CallbackContext;
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::job::JobContextSnapshot;

static GLOBAL: OnceLock<CallbackContext> = OnceLock::new();

/// The process-wide context.
pub fn context() -> &'static CallbackContext {
    GLOBAL.get_or_init(|| match ConfigManager::load() {
        Ok(manager) => CallbackContext::with_config(manager.config().clone()),
        Err(e) => {
            warn!(error = %e, "callback configuration unavailable, using defaults");
            CallbackContext::new()
        }
    })
}

pub fn set_default(name: &str, handler: HandlerRef) {
    context().set_default(name, handler);
}

pub fn set_default_async(name: &str, handler: HandlerRef) {
    context().set_default_async(name, handler);
}

pub fn get_default(name: &str) -> Option<HandlerRef> {
    context().get_default(name)
}

pub fn get_default_async(name: &str) -> Option<HandlerRef> {
    context().get_default_async(name)
}

pub fn push(name: &str, handler: HandlerRef) {
    context().push(name, handler);
}

pub fn pop(name: &str) {
    context().pop(name);
}

pub fn push_async(name: &str, handler: HandlerRef) {
    context().push_async(name, handler);
}

pub fn pop_async(name: &str) {
    context().pop_async(name);
}

pub fn invoke(name: &str, input: &[u8], output: &mut Vec<u8>) -> bool {
    context().invoke(name, input, output)
}

pub fn try_invoke(name: &str, input: &[u8], output: &mut Vec<u8>) -> Result<bool> {
    context().try_invoke(name, input, output)
}

pub fn capture() -> Result<JobContextSnapshot> {
    context().capture()
}

pub fn set_in_async_job(in_async_job: bool) {
    context().set_in_async_job(in_async_job);
}

/// Guard that releases the global context's handlers when dropped.
#[must_use = "the sweep runs when the guard is dropped"]
#[derive(Debug)]
pub struct ExitSweep {
    _private: (),
}

/// Arm the exit sweep for the global context.
pub fn install_exit_sweep() -> ExitSweep {
    // Create the context now so the sweep never initializes it during exit.
    context();
    ExitSweep { _private: () }
}

impl Drop for ExitSweep {
    fn drop(&mut self) {
        if let Some(ctx) = GLOBAL.get() {
            let released = ctx.shutdown();
            debug!(released, "exit sweep released callback handlers");
        }
    }
}
