//! Per-request prediction pipeline.
//!
//! Collect → build ×2 → infer ×2 → explain ×2 → rank ×2. The first failure
//! aborts the request; no partial report is ever returned. Models run in
//! fixed order, primary first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use cabgrisk_common::{Locale, ReportConfig, Result, RiskError};
use cabgrisk_model::{ModelHandle, ModelRegistry};
use cabgrisk_schema::{FeatureId, FeatureSchema, InputCollector, InputRecord, LabelIndex, VectorBuilder};

use crate::report::{rank, Attribution, RankedRow};
use crate::waterfall::{waterfall, Waterfall};

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub name: String,
    pub display_name: String,
    pub fingerprint: String,
    /// Probability of in-hospital mortality, in [0, 1].
    pub probability: f64,
    /// Expected model output (log-odds) the attributions start from.
    pub base_value: f64,
    pub rows: Vec<RankedRow>,
    pub waterfall: Waterfall,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub locale: Locale,
    /// Primary model first.
    pub models: [ModelReport; 2],
    /// Features nobody filled in, evaluated at their widget default.
    pub defaulted_features: Vec<FeatureId>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct PredictionPipeline {
    schema: FeatureSchema,
    labels: LabelIndex,
    registry: ModelRegistry,
    report: ReportConfig,
}

impl PredictionPipeline {
    pub fn new(schema: FeatureSchema, labels: LabelIndex, registry: ModelRegistry, report: ReportConfig) -> Self {
        Self {
            schema,
            labels,
            registry,
            report,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn report_config(&self) -> &ReportConfig {
        &self.report
    }

    /// Run from raw form fields keyed by feature identifier.
    pub fn predict_fields(&self, fields: &HashMap<String, String>, locale: Locale) -> Result<PredictionReport> {
        let record = InputCollector::new(&self.schema).collect(fields)?;
        self.predict_record(&record, locale)
    }

    #[instrument(skip_all, fields(locale = %locale))]
    pub fn predict_record(&self, record: &InputRecord, locale: Locale) -> Result<PredictionReport> {
        let request_id = Uuid::new_v4();
        let t0 = std::time::Instant::now();

        let [primary, extended] = self.registry.handles();
        let models = [
            self.run_model(primary, record, locale)?,
            self.run_model(extended, record, locale)?,
        ];

        info!(
            request_id = %request_id,
            primary = models[0].probability,
            extended = models[1].probability,
            defaulted = record.defaulted().len(),
            duration_ms = t0.elapsed().as_millis() as u64,
            "Prediction complete"
        );

        Ok(PredictionReport {
            request_id,
            generated_at: Utc::now(),
            locale,
            models,
            defaulted_features: record.defaulted().to_vec(),
        })
    }

    fn run_model(&self, handle: &ModelHandle, record: &InputRecord, locale: Locale) -> Result<ModelReport> {
        let model = handle.name().to_string();
        let vector = VectorBuilder::new(&self.labels).build(record, &handle.subset)?;

        let probability = handle
            .classifier
            .predict_probability(&vector)
            .map_err(|e| RiskError::InferenceFailure {
                model: model.clone(),
                reason: format!("{e:#}"),
            })?;
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(RiskError::InferenceFailure {
                model,
                reason: format!("probability {probability} outside [0, 1]"),
            });
        }

        let explanation = handle
            .explainer
            .explain(&vector)
            .map_err(|e| RiskError::ExplanationFailure {
                model: model.clone(),
                reason: format!("{e:#}"),
            })?;
        let attribution = Attribution::from_explanation(&handle.subset, explanation)?;

        let rows = rank(&attribution, &self.labels, locale)?;
        let waterfall = waterfall(&attribution, &vector.values, &self.labels, locale, self.report.max_display)?;

        tracing::debug!(model = %model, probability, "Model evaluated");

        Ok(ModelReport {
            name: model,
            display_name: handle.display_name.clone(),
            fingerprint: handle.subset.fingerprint().to_string(),
            probability,
            base_value: attribution.base_value,
            rows,
            waterfall,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabgrisk_model::{Classifier, Explanation, Explainer, MockModel};
    use cabgrisk_schema::{ModelFeatureSubset, OrderedVector};

    struct OutOfRange;

    impl Classifier for OutOfRange {
        fn predict_probability(&self, _: &OrderedVector) -> anyhow::Result<f64> {
            Ok(1.5)
        }
    }

    impl Explainer for OutOfRange {
        fn explain(&self, v: &OrderedVector) -> anyhow::Result<Explanation> {
            Ok(Explanation { base_value: 0.0, values: vec![0.0; v.len()] })
        }
    }

    fn pipeline_with(primary: ModelHandle) -> PredictionPipeline {
        let schema = FeatureSchema::cabg().unwrap();
        let labels = LabelIndex::builtin(&schema).unwrap();
        let (_, ext) = ModelFeatureSubset::builtin_pair(&schema).unwrap();
        let registry = ModelRegistry::new(primary, ModelHandle::new(ext, "Model 2", MockModel::new())).unwrap();
        PredictionPipeline::new(schema, labels, registry, ReportConfig::default())
    }

    fn base_subset() -> ModelFeatureSubset {
        let schema = FeatureSchema::cabg().unwrap();
        ModelFeatureSubset::builtin_pair(&schema).unwrap().0
    }

    #[test]
    fn test_out_of_range_probability_is_inference_failure() {
        let pipeline = pipeline_with(ModelHandle::new(base_subset(), "Model 1", OutOfRange));
        let err = pipeline.predict_fields(&HashMap::new(), Locale::En).unwrap_err();
        assert!(matches!(err, RiskError::InferenceFailure { .. }));
    }

    #[test]
    fn test_classifier_error_aborts_request() {
        let pipeline = pipeline_with(ModelHandle::new(base_subset(), "Model 1", MockModel::new().failing("boom")));
        match pipeline.predict_fields(&HashMap::new(), Locale::En).unwrap_err() {
            RiskError::InferenceFailure { model, reason } => {
                assert_eq!(model, "xgb_mortality");
                assert_eq!(reason, "boom");
            }
            other => panic!("expected InferenceFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_short_explanation_is_explanation_failure() {
        let pipeline = pipeline_with(ModelHandle::new(
            base_subset(),
            "Model 1",
            MockModel::new().with_explanation_len(3),
        ));
        let err = pipeline.predict_fields(&HashMap::new(), Locale::En).unwrap_err();
        assert!(matches!(err, RiskError::ExplanationFailure { .. }));
    }

    #[test]
    fn test_bad_input_aborts_before_models() {
        let pipeline = pipeline_with(ModelHandle::new(base_subset(), "Model 1", MockModel::new()));
        let fields: HashMap<String, String> = [("Age".to_string(), "-4".to_string())].into();
        let err = pipeline.predict_fields(&fields, Locale::En).unwrap_err();
        assert!(err.is_input_error());
    }
}
