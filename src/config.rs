//! Process configuration, modeled on the teacher's `Config::load` (TOML
//! file resolved via `directories::ProjectDirs`, parsed with `toml`,
//! validated before use).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoreError, ErrorKind, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Default validity window, in days, used to seed `PolicyStore`
    /// entries for applications that don't yet have one.
    #[serde(default = "default_validity_days")]
    pub default_validity_days: u32,
    /// Upper bound on a single `CryptoFacade` operation; `None` disables
    /// the bound.
    #[serde(default)]
    pub operation_deadline_ms: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_validity_days() -> u32 {
    365
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory `tracing-appender` rolls daily files into. `None` logs
    /// to stdout only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_validity_days: default_validity_days(),
            operation_deadline_ms: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Loads from `path`, or from the platform config directory
    /// (`tenant-keyvault/config.toml`) when `path` is `None`.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "tenant-keyvault", "tenant-keyvault")
                .map(|dirs| dirs.config_dir().join("config.toml"))
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            CoreError::new(
                ErrorKind::StoreFailure,
                format!("failed to read config file {}: {e}", path.display()),
                "core_config",
                "-",
            )
        })?;

        toml::from_str(&raw).map_err(|e| {
            CoreError::new(ErrorKind::StoreFailure, format!("failed to parse config: {e}"), "core_config", "-")
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_validity_days == 0 {
            return Err(CoreError::new(
                ErrorKind::PolicyConflict,
                "default_validity_days must be positive",
                "core_config",
                "-",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CoreConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_validity_days_fails_validation() {
        let mut config = CoreConfig::default();
        config.default_validity_days = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyConflict);
    }

    #[test]
    fn parses_a_minimal_toml_document() {
        let config: CoreConfig = toml::from_str(
            r#"
            default_validity_days = 90
            "#,
        )
        .unwrap();
        assert_eq!(config.default_validity_days, 90);
        assert_eq!(config.logging.level, "info");
    }
}
