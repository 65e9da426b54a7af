//! Shared application state for the web server.

use std::sync::Arc;

use cabgrisk_common::{AppConfig, Locale, Result};
use cabgrisk_model::ModelRegistry;
use cabgrisk_ranker::PredictionPipeline;
use cabgrisk_schema::{FeatureSchema, LabelIndex, ModelFeatureSubset};

/// Shared state injected into every Axum handler. Read-only after start-up.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<PredictionPipeline>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: PredictionPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Build the schema and label index, check both layouts, and load the
    /// models. Any failure here should stop the process.
    pub fn load(config: AppConfig) -> Result<Self> {
        let schema = FeatureSchema::cabg()?;
        let labels = LabelIndex::builtin(&schema)?;
        let (base, extended) = ModelFeatureSubset::builtin_pair(&schema)?;
        for subset in [&base, &extended] {
            tracing::info!(
                model = subset.name(),
                features = subset.len(),
                fingerprint = subset.fingerprint(),
                "Feature layout"
            );
        }

        let registry = ModelRegistry::load(&config.models, &schema, &labels)?;
        let pipeline = PredictionPipeline::new(schema, labels, registry, config.report.clone());
        Ok(Self::new(config, pipeline))
    }

    /// Requested locale if it parses, else the configured default.
    pub fn locale(&self, requested: Option<&str>) -> Locale {
        requested
            .and_then(|code| code.parse().ok())
            .unwrap_or(self.config.locale.default)
    }
}

pub type SharedState = Arc<AppState>;
