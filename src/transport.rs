//! Out-of-process transport seam.
//!
//! When dispatch is split across a process boundary, a [`CallbackTransport`]
//! installed on the context receives every `invoke` instead of the local
//! tables. Implementations serialize `(name, input)`, wait for the remote side
//! and write its reply into `output`. The wire format is theirs to choose.

use std::fmt;

use tracing::trace;

use crate::context::CallbackContext;

pub trait CallbackTransport: Send + Sync {
    /// Same contract as [`CallbackContext::invoke`]: `false` means no handler
    /// on the far side, and `output` must then be left untouched.
    fn invoke(&self, name: &str, input: &[u8], output: &mut Vec<u8>) -> bool;
}

/// Transport that hands calls to another context in the same process.
///
/// Useful for wiring a client context to a "server" context in tests and for
/// embedders that keep separate dispatch domains per subsystem.
#[derive(Clone)]
pub struct LoopbackTransport {
    target: CallbackContext,
}

impl LoopbackTransport {
    pub fn new(target: CallbackContext) -> Self {
        Self { target }
    }
}

impl CallbackTransport for LoopbackTransport {
    fn invoke(&self, name: &str, input: &[u8], output: &mut Vec<u8>) -> bool {
        trace!(callback = name, bytes = input.len(), "loopback transport call");
        self.target.invoke(name, input, output)
    }
}

impl fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("target", &self.target)
            .finish()
    }
}
