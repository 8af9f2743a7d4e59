use std::time::Duration;

use crate::config::ConfigurationError;

/// Errors surfaced by the callback dispatch layer.
///
/// `invoke` itself only reports whether a handler ran; these variants are what
/// `try_invoke` and the typed helpers return when the caller wants detail.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("No handler registered for callback '{name}'")]
    NoHandler { name: String },

    #[error("Async handler for '{name}' did not respond within {timeout:?}")]
    ResponseTimeout { name: String, timeout: Duration },

    #[error("Async handler for '{name}' dropped its responder without responding")]
    ResponseAbandoned { name: String },

    #[error("Payload error for callback '{name}': {source}")]
    Payload {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Per-thread callback state is no longer available: {reason}")]
    ThreadTeardown { reason: String },

    #[error("Failed to start job thread '{thread_name}': {source}")]
    JobSpawn {
        thread_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl CallbackError {
    pub(crate) fn payload(name: &str, source: serde_json::Error) -> Self {
        Self::Payload {
            name: name.to_string(),
            source,
        }
    }

    /// True for outcomes where a handler ran but the reply never arrived.
    pub fn is_bridge_failure(&self) -> bool {
        matches!(
            self,
            Self::ResponseTimeout { .. } | Self::ResponseAbandoned { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CallbackError>;
