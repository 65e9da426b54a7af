//! Service configuration.
//!
//! Read from `cabgrisk.toml` in the working directory, or the path in the
//! `CABGRISK_CONFIG` env var. YAML (`.yaml`/`.yml`) is accepted as well.
//! A missing file falls back to defaults; a malformed one is an error.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RiskError};
use crate::locale::Locale;

/// Complete service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub locale: LocaleConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3001 }
fn default_static_dir() -> String { "crates/cabgrisk-web/static".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

// ── Locale ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocaleConfig {
    /// Label set used when a request does not ask for one
    #[serde(default)]
    pub default: Locale,
}

// ── Models ────────────────────────────────────────────────────────────────────

/// One trained classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Name of the feature layout the model was fit on
    pub name: String,

    /// Heading shown above the model's results
    pub display_name: String,

    /// Path to the XGBoost JSON model file
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_primary")]
    pub primary: ModelSpec,

    #[serde(default = "default_extended")]
    pub extended: ModelSpec,
}

fn default_primary() -> ModelSpec {
    ModelSpec {
        name: "xgb_mortality".to_string(),
        display_name: "Model 1 (xgb_mortality)".to_string(),
        path: "models/xgb_mortality.json".to_string(),
    }
}

fn default_extended() -> ModelSpec {
    ModelSpec {
        name: "xgM_ALL".to_string(),
        display_name: "Model 2 (xgM_ALL)".to_string(),
        path: "models/xgM_ALL.json".to_string(),
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            extended: default_extended(),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Bars shown in a waterfall plot, the last one collapsing the remainder
    #[serde(default = "default_max_display")]
    pub max_display: usize,

    /// Decimals used when rendering probabilities
    #[serde(default = "default_probability_decimals")]
    pub probability_decimals: usize,
}

fn default_max_display() -> usize { 10 }
fn default_probability_decimals() -> usize { 3 }

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_display: default_max_display(),
            probability_decimals: default_probability_decimals(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load from `CABGRISK_CONFIG` (or `./cabgrisk.toml`), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CABGRISK_CONFIG")
            .unwrap_or_else(|_| "cabgrisk.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_path(&path)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML or YAML file, chosen by extension.
    pub fn from_path(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(&content)
                .map_err(|e| RiskError::Config(format!("{path}: {e}")))?
        } else {
            Self::from_toml_str(&content)
                .map_err(|e| RiskError::Config(format!("{path}: {e}")))?
        };
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(locale) = std::env::var("CABGRISK_LOCALE") {
            self.locale.default = locale.parse().map_err(RiskError::Config)?;
        }
        if let Ok(host) = std::env::var("CABGRISK_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CABGRISK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| RiskError::Config(format!("CABGRISK_PORT: {e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.report.max_display < 2 {
            return Err(RiskError::Config(
                "report.max_display must be at least 2".to_string(),
            ));
        }
        if self.models.primary.name == self.models.extended.name {
            return Err(RiskError::Config(format!(
                "models.primary and models.extended share the name {}",
                self.models.primary.name
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.locale.default, Locale::En);
        assert_eq!(config.models.primary.name, "xgb_mortality");
        assert_eq!(config.models.extended.name, "xgM_ALL");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [locale]
            default = "zh-TW"

            [report]
            max_display = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.locale.default, Locale::ZhTw);
        assert_eq!(config.report.max_display, 12);
        assert_eq!(config.report.probability_decimals, 3);
        assert_eq!(config.models.primary.path, "models/xgb_mortality.json");
    }

    #[test]
    fn test_max_display_too_small_rejected() {
        let mut config = AppConfig::default();
        config.report.max_display = 1;
        assert!(matches!(config.validate(), Err(RiskError::Config(_))));
    }

    #[test]
    fn test_duplicate_model_names_rejected() {
        let mut config = AppConfig::default();
        config.models.extended.name = config.models.primary.name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "server:\n  port: 8080\nlocale:\n  default: zh-TW").unwrap();
        let config = AppConfig::from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.locale.default, Locale::ZhTw);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = AppConfig::from_path(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RiskError::Config(_)));
    }
}
