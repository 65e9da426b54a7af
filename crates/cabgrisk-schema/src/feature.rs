//! Feature catalog: the fixed clinical input schema.
//!
//! `CATALOG` is the single source of truth for which features exist, how
//! each one is entered, and the order the form shows them in. Coercion is
//! driven by `FeatureKind` alone, so adding a feature means adding a row
//! here, never a new branch elsewhere.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use cabgrisk_common::{Locale, Result, RiskError};

/// Stable machine-facing feature identifier, e.g. `EuroSCORE_Additive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FeatureId(&'static str);

impl FeatureId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One permitted value of a categorical feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Choice {
    /// Literal submitted by the form
    pub value: &'static str,
    /// Stored value when the literal is a word; `None` passes the numeric literal through
    pub encoded: Option<f64>,
    /// zh-TW caption, when it differs from the literal
    #[serde(skip)]
    pub zh_label: Option<&'static str>,
}

impl Choice {
    pub const fn code(value: &'static str) -> Self {
        Self { value, encoded: None, zh_label: None }
    }

    pub const fn encoded(value: &'static str, stored: f64, zh_label: &'static str) -> Self {
        Self { value, encoded: Some(stored), zh_label: Some(zh_label) }
    }

    /// Value handed to the model for this choice.
    pub fn stored_value(&self) -> Option<f64> {
        match self.encoded {
            Some(v) => Some(v),
            None => self.value.parse::<f64>().ok(),
        }
    }

    pub fn label(&self, locale: Locale) -> &'static str {
        match (locale, self.zh_label) {
            (Locale::ZhTw, Some(zh)) => zh,
            _ => self.value,
        }
    }
}

/// How a feature is collected from the form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "choices", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Two-choice toggle stored as 0/1
    Binary,
    /// Fixed ordered choices; the first one is the widget default
    Categorical(&'static [Choice]),
    /// Non-negative number, 0 when left blank
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    pub id: FeatureId,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub const fn new(id: &'static str, kind: FeatureKind) -> Self {
        Self { id: FeatureId::new(id), kind }
    }
}

use FeatureKind::{Binary, Categorical, Numeric};

const SEX: &[Choice] = &[
    Choice::encoded("Male", 1.0, "男"),
    Choice::encoded("Female", 0.0, "女"),
];
const ANGINA_CCS: &[Choice] = &[Choice::code("0"), Choice::code("3"), Choice::code("4")];
const IABP: &[Choice] = &[Choice::code("1"), Choice::code("2"), Choice::code("3")];
const REVASCULARIZATION: &[Choice] = &[Choice::code("1"), Choice::code("2")];
const SVG_NON_LAD: &[Choice] = &[Choice::code("1"), Choice::code("2"), Choice::code("3")];

/// All features, in form display order.
pub const CATALOG: &[FeatureSpec] = &[
    FeatureSpec::new("Angina_class_CCS", Categorical(ANGINA_CCS)),
    FeatureSpec::new("IABP_insertion", Categorical(IABP)),
    FeatureSpec::new("Complete_revascularization", Categorical(REVASCULARIZATION)),
    FeatureSpec::new("SVG_non_LAD", Categorical(SVG_NON_LAD)),
    FeatureSpec::new("EuroSCORE_Additive", Numeric),
    FeatureSpec::new("Num_disease_vessels", Numeric),
    FeatureSpec::new("Num_grafts", Numeric),
    FeatureSpec::new("PreOp_EF_percent", Numeric),
    FeatureSpec::new("PostOp_EF_percent", Numeric),
    FeatureSpec::new("Surgery_time", Numeric),
    FeatureSpec::new("ICU_days", Numeric),
    FeatureSpec::new("Total_CPB_time", Numeric),
    FeatureSpec::new("Sex", Categorical(SEX)),
    FeatureSpec::new("Age", Numeric),
    FeatureSpec::new("Height", Numeric),
    FeatureSpec::new("Weight", Numeric),
    FeatureSpec::new("BMI", Numeric),
    FeatureSpec::new("Smoking", Binary),
    FeatureSpec::new("Diabetes", Binary),
    FeatureSpec::new("Pump_support", Binary),
    FeatureSpec::new("Quit_smoking", Binary),
    FeatureSpec::new("Stroke", Binary),
    FeatureSpec::new("Hypertension", Binary),
    FeatureSpec::new("OPCAB", Binary),
    FeatureSpec::new("PostBypass_MI", Binary),
    FeatureSpec::new("ESRD", Binary),
    FeatureSpec::new("Cerebral_deficits", Binary),
    FeatureSpec::new("Hyperlipidemia", Binary),
    FeatureSpec::new("Hyperkalemia", Binary),
    FeatureSpec::new("COPD", Binary),
    FeatureSpec::new("Ventilator_gt_24hr", Binary),
    FeatureSpec::new("Respiratory_failure", Binary),
    FeatureSpec::new("MIDCAB", Binary),
    FeatureSpec::new("Age_ge_60", Binary),
    FeatureSpec::new("Repeat_sternotomy_bleeding", Binary),
    FeatureSpec::new("Pump_arrest", Binary),
    FeatureSpec::new("Sepsis", Binary),
    FeatureSpec::new("LM_gt_50", Binary),
    FeatureSpec::new("GI_bleeding", Binary),
    FeatureSpec::new("InHospital_days", Numeric),
    FeatureSpec::new("PreOp_days", Numeric),
    FeatureSpec::new("PostOp_days", Numeric),
];

/// Validated, indexed view over a feature catalog.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
    positions: HashMap<&'static str, usize>,
}

impl FeatureSchema {
    /// Build from an arbitrary catalog, rejecting duplicate identifiers and
    /// categorical features whose choices cannot be turned into numbers.
    pub fn new(features: Vec<FeatureSpec>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(features.len());
        for (i, spec) in features.iter().enumerate() {
            if positions.insert(spec.id.as_str(), i).is_some() {
                return Err(RiskError::DuplicateFeature(spec.id.to_string()));
            }
            if let Categorical(choices) = spec.kind {
                if choices.is_empty() {
                    return Err(RiskError::InvalidSchema {
                        feature: spec.id.to_string(),
                        reason: "categorical feature declares no choices".to_string(),
                    });
                }
                if let Some(bad) = choices.iter().find(|c| c.stored_value().is_none()) {
                    return Err(RiskError::InvalidSchema {
                        feature: spec.id.to_string(),
                        reason: format!("choice {:?} is neither numeric nor explicitly encoded", bad.value),
                    });
                }
            }
        }
        Ok(Self { features, positions })
    }

    /// The CABG catalog.
    pub fn cabg() -> Result<Self> {
        Self::new(CATALOG.to_vec())
    }

    /// Features in display order.
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn get(&self, id: &str) -> Option<&FeatureSpec> {
        self.positions.get(id).map(|&i| &self.features[i])
    }

    /// Resolve a string to the schema's identifier.
    pub fn id(&self, id: &str) -> Option<FeatureId> {
        self.get(id).map(|spec| spec.id)
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.positions.contains_key(id.as_str())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
