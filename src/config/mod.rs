//! # Callback Configuration System
//!
//! Layered configuration for the dispatch core, loaded with the `config` crate.
//!
//! ## Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults ([`CallbackConfig::default`])
//! 2. `callback.yaml` in the configuration directory
//! 3. `callback.<environment>.yaml` in the same directory
//! 4. `CALLBACK_*` environment variables, `__` separating nested keys
//!    (e.g. `CALLBACK_ASYNC_BRIDGE__RESPONSE_TIMEOUT_MS=5000`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use callback_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().async_bridge.response_timeout();
//! println!("bridge timeout: {timeout:?}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring callback.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Blocking behaviour of bridged async handlers
    pub async_bridge: AsyncBridgeConfig,

    /// Override stack discipline
    pub stacks: StackConfig,

    /// Worker thread settings for the job runner
    pub jobs: JobConfig,

    /// Structured logging output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AsyncBridgeConfig {
    /// How long a bridged call waits for its responder. Unset waits forever.
    pub response_timeout_ms: Option<u64>,
}

impl AsyncBridgeConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StackConfig {
    /// Treat a pop with nothing to pop as a bug in debug builds.
    pub strict_pop: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    /// Prefix for worker thread names, suffixed with the job id.
    pub thread_name_prefix: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "callback-job".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; falls back to `RUST_LOG`, then to a per-environment level.
    pub level: Option<String>,

    /// Also write JSON logs to a file under `log_dir`.
    pub file_output: bool,

    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            file_output: false,
            log_dir: PathBuf::from("log"),
        }
    }
}

impl CallbackConfig {
    /// Reject values the dispatch core cannot work with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.async_bridge.response_timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "async_bridge.response_timeout_ms",
                "0",
                "timeout must be greater than 0; leave unset to wait without a timeout",
            ));
        }

        if self.jobs.thread_name_prefix.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "jobs.thread_name_prefix",
                self.jobs.thread_name_prefix.clone(),
                "thread name prefix cannot be empty",
            ));
        }

        if self.logging.file_output && self.logging.log_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "logging.log_dir",
                "",
                "log directory is required when file output is enabled",
            ));
        }

        Ok(())
    }
}
