//! Layered configuration
//!
//! Built-in defaults, then an optional file, then `VIGIL__*` environment
//! variables (e.g. `VIGIL__ANALYZER__CONFIDENCE_THRESHOLD=0.6`).

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use state_classifier::{HysteresisConfig, StateThresholds};
use window_metrics::AnalyzerConfig;

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analyzer: AnalyzerConfig,
    pub thresholds: StateThresholds,
    pub hysteresis: HysteresisConfig,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load defaults, the optional file at `path`, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("VIGIL")
                .separator("__")
                .try_parsing(true),
        );

        let settings = Self::build(builder)?;
        match path {
            Some(path) => debug!("Loaded configuration from {}", path.display()),
            None => debug!("Loaded default configuration"),
        }
        Ok(settings)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Self = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate().context("analyzer")?;
        self.thresholds.validate().context("thresholds")?;
        self.hysteresis.validate().context("hysteresis")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(text: &str) -> Result<Settings> {
        Settings::build(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.analyzer.window_seconds, 15.0);
        assert_eq!(settings.hysteresis.downgrade_confirmations, 2);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_partial_override() {
        let settings = from_toml(
            r#"
            [analyzer]
            confidence_threshold = 0.6

            [thresholds]
            fps_min_ok = 12.0

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(settings.analyzer.confidence_threshold, 0.6);
        assert_eq!(settings.analyzer.window_seconds, 15.0);
        assert_eq!(settings.thresholds.fps_min_ok, 12.0);
        assert_eq!(settings.thresholds.perclos_asleep_primary, 0.60);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = from_toml(
            r#"
            [hysteresis]
            inactivity_seconds = -1.0
            "#,
        );
        assert!(result.is_err());
    }
}
