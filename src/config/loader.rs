//! Configuration Loader
//!
//! Environment-aware loading of [`CallbackConfig`] from defaults, YAML files and
//! `CALLBACK_*` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::CallbackConfig;
use crate::constants::env as env_keys;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const BASE_FILE_STEM: &str = "callback";
const ENV_PREFIX: &str = "CALLBACK";

/// Loaded configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CallbackConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment,
            directory = %config_directory.display(),
            "loading callback configuration"
        );

        let base = config_directory.join(format!("{BASE_FILE_STEM}.yaml"));
        let overlay = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.yaml"));
        let config = Self::build(&[(base.as_path(), false), (overlay.as_path(), false)])?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Load one explicit file, which must exist, plus environment variables.
    pub fn load_from_file(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        let config = Self::build(&[(path, true)])?;
        let config_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_directory);

        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory,
        }))
    }

    fn build(files: &[(&Path, bool)]) -> ConfigResult<CallbackConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&CallbackConfig::default())?);

        for (path, required) in files {
            debug!(file = %path.display(), required, exists = path.exists(), "configuration file source");
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Yaml)
                    .required(*required),
            );
        }

        let config: CallbackConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CallbackConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Current environment from `CALLBACK_ENV`, then `APP_ENV`, else `development`.
    pub fn detect_environment() -> String {
        env::var(env_keys::ENVIRONMENT)
            .or_else(|_| env::var(env_keys::FALLBACK_ENVIRONMENT))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var(env_keys::CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
