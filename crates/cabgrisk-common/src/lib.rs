//! cabgrisk-common: Shared errors, locale and configuration used across all cabgrisk crates.

pub mod error;
pub mod locale;
pub mod config;

// Re-export commonly used types
pub use config::{AppConfig, ModelSpec, ModelsConfig, ReportConfig, ServerConfig};
pub use error::{ApiError, Result, RiskError};
pub use locale::Locale;
