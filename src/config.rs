use crate::error::ConfigError;
use derivative::Derivative;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "DOCSEARCH_UPLOADER_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "docsearch-uploader.toml";

#[derive(Debug, Clone, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct UploaderConfig {
    #[derivative(Default(value = "String::from(\"docsearch_uploader=info\")"))]
    pub log_filter: String,
    #[derivative(Default(value = "4"))]
    pub toast_seconds: u64,
    pub transfer: TransferConfig,
    pub window: WindowConfig,
}

/// Cadence of the simulated transfer.
#[derive(Debug, Clone, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct TransferConfig {
    #[derivative(Default(value = "10"))]
    pub progress_step: u8,
    #[derivative(Default(value = "300"))]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct WindowConfig {
    #[derivative(Default(value = "600.0"))]
    pub width: f32,
    #[derivative(Default(value = "640.0"))]
    pub height: f32,
}

impl TransferConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl UploaderConfig {
    /// Resolves the config from `DOCSEARCH_UPLOADER_CONFIG`, then the working
    /// directory, falling back to defaults when neither exists.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!(path = %path.display(), "Loading configuration");

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path.to_path_buf())
    }

    fn parse(content: &str, path: PathBuf) -> Result<Self, ConfigError> {
        let config: UploaderConfig =
            toml::from_str(content).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.transfer.progress_step) {
            return Err(ConfigError::Invalid {
                field: "transfer.progress_step",
                reason: format!("{} is not between 1 and 100", self.transfer.progress_step),
            });
        }
        if self.transfer.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "transfer.tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "window",
                reason: "width and height must be positive".to_string(),
            });
        }
        Ok(())
    }
}
