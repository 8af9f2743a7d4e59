//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to the console and,
//! optionally, to JSON log files for tracing callback traffic across threads.

use std::fs;
use std::process;
use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{ConfigManager, LoggingConfig};
use crate::handler::Tier;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from the default configuration sources.
pub fn init_structured_logging() {
    let logging = ConfigManager::load()
        .map(|manager| manager.config().logging.clone())
        .unwrap_or_default();
    init_structured_logging_with(&logging);
}

/// Initialize structured logging with explicit settings. Only the first call
/// has any effect.
pub fn init_structured_logging_with(logging: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let filter = || match &logging.level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment))),
        };

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_level(true)
            .with_filter(filter());

        let mut log_file = None;
        let file_layer = if logging.file_output {
            match fs::create_dir_all(&logging.log_dir) {
                Ok(()) => {
                    let pid = process::id();
                    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
                    let file_name = format!("{environment}.{pid}.{timestamp}.log");
                    log_file = Some(logging.log_dir.join(&file_name));

                    let appender = tracing_appender::rolling::never(&logging.log_dir, file_name);
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    // Must outlive the process-wide subscriber.
                    std::mem::forget(guard);

                    Some(
                        fmt::layer()
                            .with_writer(writer)
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_ansi(false)
                            .json()
                            .with_filter(filter()),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "callback_core: cannot create log directory {}: {e}",
                        logging.log_dir.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry().with(console).with(file_layer);

        // An embedding application may already own the global subscriber.
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_file = ?log_file,
            "structured logging initialized"
        );
    });
}

/// Log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for registry and stack operations
pub fn log_callback_operation(operation: &str, name: &str, tier: Tier, status: &str) {
    tracing::debug!(
        operation = %operation,
        callback = %name,
        tier = %tier,
        status = %status,
        "CALLBACK_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
