//! Ranked attribution tables.
//!
//! Rows are ordered by absolute contribution, largest first; ties keep
//! the model layout order. Importance is each row's share of the total
//! absolute contribution, in percent.

use serde::Serialize;

use cabgrisk_common::{Locale, Result, RiskError};
use cabgrisk_model::Explanation;
use cabgrisk_schema::{FeatureId, LabelIndex, ModelFeatureSubset};

/// One model's explanation with positions resolved to features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub model: String,
    pub base_value: f64,
    /// Layout order.
    pub entries: Vec<(FeatureId, f64)>,
}

impl Attribution {
    /// Attach the subset's identifiers to positional explanation values.
    pub fn from_explanation(subset: &ModelFeatureSubset, explanation: Explanation) -> Result<Self> {
        let failure = |reason: String| RiskError::ExplanationFailure {
            model: subset.name().to_string(),
            reason,
        };

        if explanation.values.len() != subset.len() {
            return Err(failure(format!(
                "{} attribution values for {} features",
                explanation.values.len(),
                subset.len()
            )));
        }
        if !explanation.base_value.is_finite() || explanation.values.iter().any(|v| !v.is_finite()) {
            return Err(failure("non-finite attribution value".to_string()));
        }

        Ok(Self {
            model: subset.name().to_string(),
            base_value: explanation.base_value,
            entries: subset.features().iter().copied().zip(explanation.values).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Model output being explained, `base_value + total()`.
    pub fn output_value(&self) -> f64 {
        self.base_value + self.total()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    /// 1-based
    pub rank: usize,
    pub feature: FeatureId,
    pub label: String,
    pub signed_value: f64,
    pub abs_value: f64,
    pub importance_pct: f64,
}

pub fn rank(attribution: &Attribution, labels: &LabelIndex, locale: Locale) -> Result<Vec<RankedRow>> {
    let total_abs: f64 = attribution.entries.iter().map(|(_, v)| v.abs()).sum();

    let mut order: Vec<usize> = (0..attribution.len()).collect();
    // stable: equal magnitudes keep layout order
    order.sort_by(|&a, &b| {
        let (_, va) = attribution.entries[a];
        let (_, vb) = attribution.entries[b];
        vb.abs().total_cmp(&va.abs())
    });

    order
        .into_iter()
        .enumerate()
        .map(|(i, idx)| {
            let (feature, signed_value) = attribution.entries[idx];
            let abs_value = signed_value.abs();
            let importance_pct = if total_abs > 0.0 {
                abs_value / total_abs * 100.0
            } else {
                0.0
            };
            Ok(RankedRow {
                rank: i + 1,
                feature,
                label: labels.display_label(feature, locale)?,
                signed_value,
                abs_value,
                importance_pct,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabgrisk_schema::{ColumnNaming, FeatureSchema};

    fn fixture(ids: &[&str], values: &[f64]) -> (LabelIndex, Attribution) {
        let schema = FeatureSchema::cabg().unwrap();
        let labels = LabelIndex::builtin(&schema).unwrap();
        let subset = ModelFeatureSubset::new("m", ids, ColumnNaming::Identifier, &schema).unwrap();
        let explanation = Explanation {
            base_value: -1.0,
            values: values.to_vec(),
        };
        let attribution = Attribution::from_explanation(&subset, explanation).unwrap();
        (labels, attribution)
    }

    #[test]
    fn test_rank_by_magnitude() {
        let (labels, attribution) = fixture(&["Age", "BMI", "COPD"], &[0.1, -0.5, 0.3]);
        let rows = rank(&attribution, &labels, Locale::En).unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["BMI", "COPD", "Age"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].signed_value, -0.5);
        assert_eq!(rows[0].abs_value, 0.5);
        assert!((rows[0].importance_pct - 500.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_importance_sums_to_100() {
        let (labels, attribution) =
            fixture(&["Age", "BMI", "COPD", "ESRD"], &[0.013, -0.27, 1.9, -0.0004]);
        let rows = rank(&attribution, &labels, Locale::ZhTw).unwrap();
        let total: f64 = rows.iter().map(|r| r.importance_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_gives_zero_importance() {
        let (labels, attribution) = fixture(&["Age", "BMI"], &[0.0, 0.0]);
        let rows = rank(&attribution, &labels, Locale::En).unwrap();
        assert!(rows.iter().all(|r| r.importance_pct == 0.0));
        assert_eq!(rows[0].feature.as_str(), "Age");
    }

    #[test]
    fn test_ties_keep_layout_order() {
        let (labels, attribution) = fixture(&["COPD", "Age", "BMI", "ESRD"], &[0.2, -0.2, 0.5, 0.2]);
        let rows = rank(&attribution, &labels, Locale::En).unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["BMI", "COPD", "Age", "ESRD"]);
        let ranks: Vec<usize> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_length_mismatch_is_explanation_failure() {
        let schema = FeatureSchema::cabg().unwrap();
        let subset = ModelFeatureSubset::new("m", &["Age", "BMI"], ColumnNaming::Identifier, &schema).unwrap();
        let explanation = Explanation {
            base_value: 0.0,
            values: vec![0.1],
        };
        let err = Attribution::from_explanation(&subset, explanation).unwrap_err();
        assert!(matches!(err, RiskError::ExplanationFailure { .. }));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let schema = FeatureSchema::cabg().unwrap();
        let subset = ModelFeatureSubset::new("m", &["Age"], ColumnNaming::Identifier, &schema).unwrap();
        let explanation = Explanation {
            base_value: 0.0,
            values: vec![f64::NAN],
        };
        assert!(Attribution::from_explanation(&subset, explanation).is_err());
    }

    #[test]
    fn test_output_value() {
        let (_, attribution) = fixture(&["Age", "BMI"], &[0.25, 0.5]);
        assert_eq!(attribution.output_value(), -0.25);
    }
}
