//! Model handles, loaded once at start-up and shared read-only.

use std::sync::Arc;

use cabgrisk_common::{ModelSpec, ModelsConfig, Result, RiskError};
use cabgrisk_schema::{FeatureSchema, LabelIndex, ModelFeatureSubset};

use crate::adapter::{Classifier, Explainer};
use crate::xgboost::TreeEnsemble;

/// One trained model bound to the feature layout it was fit on.
#[derive(Clone)]
pub struct ModelHandle {
    pub subset: ModelFeatureSubset,
    pub display_name: String,
    pub classifier: Arc<dyn Classifier>,
    pub explainer: Arc<dyn Explainer>,
}

impl ModelHandle {
    /// Handle whose classifier and explainer are the same backend.
    pub fn new<M>(subset: ModelFeatureSubset, display_name: &str, model: M) -> Self
    where
        M: Classifier + Explainer + 'static,
    {
        let model = Arc::new(model);
        Self {
            subset,
            display_name: display_name.to_string(),
            classifier: model.clone(),
            explainer: model,
        }
    }

    pub fn name(&self) -> &str {
        self.subset.name()
    }

    /// Load an XGBoost JSON model and check it against its layout.
    pub fn load(spec: &ModelSpec, schema: &FeatureSchema, labels: &LabelIndex) -> Result<Self> {
        let subset = ModelFeatureSubset::builtin(&spec.name, schema)?;
        let columns = subset.column_names(labels)?;
        let load_error = |e: anyhow::Error| RiskError::ModelLoad {
            model: spec.name.clone(),
            reason: format!("{e:#}"),
        };

        let ensemble = TreeEnsemble::load(&spec.name, &spec.path).map_err(load_error)?;
        ensemble.check_layout(&columns).map_err(load_error)?;

        tracing::info!(
            model = %spec.name,
            path = %spec.path,
            trees = ensemble.num_trees(),
            features = subset.len(),
            fingerprint = %subset.fingerprint(),
            "Model loaded"
        );

        Ok(Self::new(subset, &spec.display_name, ensemble))
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.subset.name())
            .field("display_name", &self.display_name)
            .field("features", &self.subset.len())
            .finish()
    }
}

/// Both models, primary first. The extended layout must start with the
/// primary one.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    primary: ModelHandle,
    extended: ModelHandle,
}

impl ModelRegistry {
    pub fn new(primary: ModelHandle, extended: ModelHandle) -> Result<Self> {
        if extended.subset.extension_of(&primary.subset).is_none() {
            return Err(RiskError::InvalidSubset {
                model: extended.name().to_string(),
                reason: format!("does not extend {}", primary.name()),
            });
        }
        Ok(Self { primary, extended })
    }

    pub fn load(config: &ModelsConfig, schema: &FeatureSchema, labels: &LabelIndex) -> Result<Self> {
        let primary = ModelHandle::load(&config.primary, schema, labels)?;
        let extended = ModelHandle::load(&config.extended, schema, labels)?;
        Self::new(primary, extended)
    }

    pub fn primary(&self) -> &ModelHandle {
        &self.primary
    }

    pub fn extended(&self) -> &ModelHandle {
        &self.extended
    }

    /// Evaluation order: primary, then extended.
    pub fn handles(&self) -> [&ModelHandle; 2] {
        [&self.primary, &self.extended]
    }
}
