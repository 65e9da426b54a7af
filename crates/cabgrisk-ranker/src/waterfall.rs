//! Waterfall layout of one attribution.
//!
//! Steps are listed top to bottom, largest contribution first. Accumulation
//! runs bottom up: the lowest step starts at the base value and the top
//! step ends at the model output. When there are more features than
//! `max_display`, the smallest ones collapse into a single trailing
//! "other features" step so exactly `max_display` steps remain.

use serde::Serialize;

use cabgrisk_common::{Locale, Result, RiskError};
use cabgrisk_schema::{FeatureId, LabelIndex};

use crate::report::Attribution;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterfallStep {
    /// `None` for the collapsed step.
    pub feature: Option<FeatureId>,
    pub label: String,
    /// Model input for the feature; `None` for the collapsed step.
    pub input_value: Option<f64>,
    pub contribution: f64,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waterfall {
    pub base_value: f64,
    pub output_value: f64,
    pub steps: Vec<WaterfallStep>,
}

impl Waterfall {
    /// Lowest and highest point any step reaches, base and output included.
    pub fn extent(&self) -> (f64, f64) {
        self.steps.iter().fold(
            (self.base_value.min(self.output_value), self.base_value.max(self.output_value)),
            |(lo, hi), s| (lo.min(s.start).min(s.end), hi.max(s.start).max(s.end)),
        )
    }
}

fn others_label(count: usize, locale: Locale) -> String {
    match locale {
        Locale::En => format!("{count} other features"),
        Locale::ZhTw => format!("其他 {count} 個特徵"),
    }
}

/// `inputs` are the model input values, in layout order.
pub fn waterfall(
    attribution: &Attribution,
    inputs: &[f64],
    labels: &LabelIndex,
    locale: Locale,
    max_display: usize,
) -> Result<Waterfall> {
    if inputs.len() != attribution.len() {
        return Err(RiskError::ExplanationFailure {
            model: attribution.model.clone(),
            reason: format!("{} inputs for {} attribution values", inputs.len(), attribution.len()),
        });
    }

    let n = attribution.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        attribution.entries[b].1.abs().total_cmp(&attribution.entries[a].1.abs())
    });

    let shown = if n > max_display { max_display.saturating_sub(1) } else { n };
    let (individual, rest) = order.split_at(shown);

    let mut steps = Vec::with_capacity(shown + 1);
    let mut cursor = attribution.base_value;

    if !rest.is_empty() {
        let contribution: f64 = rest.iter().map(|&i| attribution.entries[i].1).sum();
        steps.push(WaterfallStep {
            feature: None,
            label: others_label(rest.len(), locale),
            input_value: None,
            contribution,
            start: cursor,
            end: cursor + contribution,
        });
        cursor += contribution;
    }

    for &i in individual.iter().rev() {
        let (feature, contribution) = attribution.entries[i];
        steps.push(WaterfallStep {
            feature: Some(feature),
            label: labels.display_label(feature, locale)?,
            input_value: Some(inputs[i]),
            contribution,
            start: cursor,
            end: cursor + contribution,
        });
        cursor += contribution;
    }

    steps.reverse();
    Ok(Waterfall {
        base_value: attribution.base_value,
        output_value: cursor,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabgrisk_model::Explanation;
    use cabgrisk_schema::{ColumnNaming, FeatureSchema, ModelFeatureSubset};

    const IDS: &[&str] = &["Age", "BMI", "COPD", "ESRD", "Sepsis"];

    fn setup(values: &[f64]) -> (LabelIndex, Attribution) {
        let schema = FeatureSchema::cabg().unwrap();
        let labels = LabelIndex::builtin(&schema).unwrap();
        let subset = ModelFeatureSubset::new("m", &IDS[..values.len()], ColumnNaming::Identifier, &schema)
            .unwrap();
        let attribution = Attribution::from_explanation(
            &subset,
            Explanation {
                base_value: -2.0,
                values: values.to_vec(),
            },
        )
        .unwrap();
        (labels, attribution)
    }

    #[test]
    fn test_all_features_shown_when_few() {
        let (labels, attribution) = setup(&[0.5, -1.0, 0.25]);
        let wf = waterfall(&attribution, &[70.0, 22.0, 1.0], &labels, Locale::En, 10).unwrap();
        assert_eq!(wf.steps.len(), 3);
        assert_eq!(wf.steps[0].feature.map(|f| f.as_str()), Some("BMI"));
        assert_eq!(wf.steps[0].input_value, Some(22.0));
        assert_eq!(wf.steps[0].end, wf.output_value);
        assert_eq!(wf.steps[2].start, -2.0);
        assert!((wf.output_value + 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_steps_chain() {
        let (labels, attribution) = setup(&[0.5, -1.0, 0.25, 0.1, -0.05]);
        let wf = waterfall(&attribution, &[1.0; 5], &labels, Locale::En, 10).unwrap();
        for pair in wf.steps.windows(2) {
            assert_eq!(pair[0].start, pair[1].end);
        }
    }

    #[test]
    fn test_collapses_beyond_max_display() {
        let (labels, attribution) = setup(&[0.5, -1.0, 0.25, 0.1, -0.05]);
        let wf = waterfall(&attribution, &[1.0; 5], &labels, Locale::En, 3).unwrap();
        assert_eq!(wf.steps.len(), 3);
        let last = wf.steps.last().unwrap();
        assert_eq!(last.feature, None);
        assert_eq!(last.label, "3 other features");
        assert!((last.contribution - 0.3).abs() < 1e-12);
        assert_eq!(last.start, -2.0);
        assert!((wf.steps[0].end - attribution.output_value()).abs() < 1e-12);
    }

    #[test]
    fn test_localized_other_label() {
        let (labels, attribution) = setup(&[0.5, -1.0, 0.25]);
        let wf = waterfall(&attribution, &[1.0; 3], &labels, Locale::ZhTw, 2).unwrap();
        assert_eq!(wf.steps[1].label, "其他 2 個特徵");
    }

    #[test]
    fn test_extent_covers_overshoot() {
        let (labels, attribution) = setup(&[0.5, -1.0]);
        let wf = waterfall(&attribution, &[1.0; 2], &labels, Locale::En, 10).unwrap();
        // base -2, Age up to -1.5, BMI down to -2.5
        assert_eq!(wf.extent(), (-2.5, -1.5));
    }

    #[test]
    fn test_input_length_checked() {
        let (labels, attribution) = setup(&[0.5, -1.0]);
        assert!(waterfall(&attribution, &[1.0], &labels, Locale::En, 10).is_err());
    }
}
