//! Model feature subsets: the input layout each trained model was fit on.
//!
//! **The order of these lists is the contract with the trained models.**
//! Transposing two entries still yields a plausible probability, just a
//! wrong one. Any change here needs retrained models, and the layout
//! fingerprint logged at start-up changes with it.

use serde::Serialize;
use sha2::{Digest, Sha256};

use cabgrisk_common::{Locale, Result, RiskError};

use crate::feature::{FeatureId, FeatureSchema};
use crate::labels::LabelIndex;

pub const XGB_MORTALITY: &str = "xgb_mortality";
pub const XGM_ALL: &str = "xgM_ALL";

/// Layout of `xgb_mortality`.
pub const XGB_MORTALITY_FEATURES: &[&str] = &[
    "EuroSCORE_Additive", "Complete_revascularization", "Diabetes",
    "IABP_insertion", "Quit_smoking", "Respiratory_failure",
    "MIDCAB", "OPCAB", "Num_grafts", "Num_disease_vessels",
    "Cerebral_deficits", "PostBypass_MI", "Hypertension", "InHospital_days",
    "Hyperlipidemia", "ESRD", "Ventilator_gt_24hr", "PostOp_days",
    "Age_ge_60", "SVG_non_LAD", "PreOp_days",
    "Repeat_sternotomy_bleeding", "Smoking", "PostOp_EF_percent",
    "Surgery_time", "Height", "ICU_days",
];

/// Layout of `xgM_ALL`: the `xgb_mortality` layout followed by 15 more features.
pub const XGM_ALL_FEATURES: &[&str] = &[
    "EuroSCORE_Additive", "Complete_revascularization", "Diabetes",
    "IABP_insertion", "Quit_smoking", "Respiratory_failure",
    "MIDCAB", "OPCAB", "Num_grafts", "Num_disease_vessels",
    "Cerebral_deficits", "PostBypass_MI", "Hypertension", "InHospital_days",
    "Hyperlipidemia", "ESRD", "Ventilator_gt_24hr", "PostOp_days",
    "Age_ge_60", "SVG_non_LAD", "PreOp_days",
    "Repeat_sternotomy_bleeding", "Smoking", "PostOp_EF_percent",
    "Surgery_time", "Height", "ICU_days",
    // extension
    "Sex", "Total_CPB_time", "Weight", "LM_gt_50", "BMI", "Age",
    "Angina_class_CCS", "PreOp_EF_percent", "Pump_support", "Stroke",
    "GI_bleeding", "Hyperkalemia", "Sepsis", "Pump_arrest", "COPD",
];

pub const XGM_ALL_EXTENSION_LEN: usize = 15;

/// Column names a model expects on its input vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "naming", content = "locale", rename_all = "snake_case")]
pub enum ColumnNaming {
    Identifier,
    Label(Locale),
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelFeatureSubset {
    name: String,
    features: Vec<FeatureId>,
    columns: ColumnNaming,
    fingerprint: String,
}

impl ModelFeatureSubset {
    /// Resolve `ids` against the schema. Unknown, duplicate or no identifiers
    /// are rejected.
    pub fn new(
        name: &str,
        ids: &[&str],
        columns: ColumnNaming,
        schema: &FeatureSchema,
    ) -> Result<Self> {
        let invalid = |reason: String| RiskError::InvalidSubset {
            model: name.to_string(),
            reason,
        };

        if ids.is_empty() {
            return Err(invalid("no features declared".to_string()));
        }

        let mut features: Vec<FeatureId> = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = schema
                .id(raw)
                .ok_or_else(|| invalid(format!("{raw} is not in the feature schema")))?;
            if features.contains(&id) {
                return Err(invalid(format!("{raw} is listed twice")));
            }
            features.push(id);
        }

        let fingerprint = layout_fingerprint(name, &features);
        Ok(Self {
            name: name.to_string(),
            features,
            columns,
            fingerprint,
        })
    }

    /// One of the two layouts the shipped models were fit on. Both were fit
    /// on a frame whose columns carry the zh-TW labels.
    pub fn builtin(name: &str, schema: &FeatureSchema) -> Result<Self> {
        let ids = match name {
            XGB_MORTALITY => XGB_MORTALITY_FEATURES,
            XGM_ALL => XGM_ALL_FEATURES,
            other => {
                return Err(RiskError::InvalidSubset {
                    model: other.to_string(),
                    reason: format!("no built-in layout (known: {XGB_MORTALITY}, {XGM_ALL})"),
                })
            }
        };
        Self::new(name, ids, ColumnNaming::Label(Locale::ZhTw), schema)
    }

    /// Both built-in layouts, checked to be base + ordered extension.
    pub fn builtin_pair(schema: &FeatureSchema) -> Result<(Self, Self)> {
        let base = Self::builtin(XGB_MORTALITY, schema)?;
        let extended = Self::builtin(XGM_ALL, schema)?;
        match extended.extension_of(&base) {
            Some(ext) if ext.len() == XGM_ALL_EXTENSION_LEN => Ok((base, extended)),
            _ => Err(RiskError::InvalidSubset {
                model: extended.name,
                reason: format!(
                    "must be {XGB_MORTALITY} followed by {XGM_ALL_EXTENSION_LEN} features"
                ),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[FeatureId] {
        &self.features
    }

    pub fn columns(&self) -> ColumnNaming {
        self.columns
    }

    /// SHA-256 over the name and ordered identifiers, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self, id: FeatureId) -> Option<usize> {
        self.features.iter().position(|f| *f == id)
    }

    /// The features appended after `base`, if this subset starts with `base`.
    pub fn extension_of(&self, base: &ModelFeatureSubset) -> Option<&[FeatureId]> {
        self.features
            .strip_prefix(base.features.as_slice())
    }

    /// Column names in layout order, as the model expects them.
    pub fn column_names(&self, labels: &LabelIndex) -> Result<Vec<String>> {
        self.features
            .iter()
            .map(|&id| match self.columns {
                ColumnNaming::Identifier => Ok(id.as_str().to_string()),
                ColumnNaming::Label(locale) => labels.to_label(id, locale).map(str::to_string),
            })
            .collect()
    }
}

fn layout_fingerprint(name: &str, features: &[FeatureId]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    for id in features {
        hasher.update(id.as_str().as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::cabg().unwrap()
    }

    #[test]
    fn test_builtin_lengths() {
        let (base, ext) = ModelFeatureSubset::builtin_pair(&schema()).unwrap();
        assert_eq!(base.len(), 27);
        assert_eq!(ext.len(), 42);
    }

    #[test]
    fn test_extended_is_base_plus_extension_in_order() {
        let (base, ext) = ModelFeatureSubset::builtin_pair(&schema()).unwrap();
        assert_eq!(&ext.features()[..27], base.features());
        let tail: Vec<&str> = ext.extension_of(&base).unwrap().iter().map(|f| f.as_str()).collect();
        assert_eq!(tail[0], "Sex");
        assert_eq!(tail[14], "COPD");
    }

    #[test]
    fn test_extended_covers_whole_schema() {
        let schema = schema();
        let ext = ModelFeatureSubset::builtin(XGM_ALL, &schema).unwrap();
        for spec in schema.features() {
            assert!(ext.position(spec.id).is_some(), "{} missing", spec.id);
        }
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let err = ModelFeatureSubset::new("m", &["Age", "Heart_rate"], ColumnNaming::Identifier, &schema())
            .unwrap_err();
        assert!(matches!(err, RiskError::InvalidSubset { .. }));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let err = ModelFeatureSubset::new("m", &["Age", "Age"], ColumnNaming::Identifier, &schema())
            .unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let schema = schema();
        let a = ModelFeatureSubset::new("m", &["Age", "BMI"], ColumnNaming::Identifier, &schema).unwrap();
        let b = ModelFeatureSubset::new("m", &["BMI", "Age"], ColumnNaming::Identifier, &schema).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_column_names_use_zh_labels() {
        let schema = schema();
        let labels = LabelIndex::builtin(&schema).unwrap();
        let base = ModelFeatureSubset::builtin(XGB_MORTALITY, &schema).unwrap();
        let cols = base.column_names(&labels).unwrap();
        assert_eq!(cols[0], "EuroSCORE Additive");
        assert_eq!(cols[2], "DM");
        assert_eq!(cols[26], "ICU \n日數");
    }

    #[test]
    fn test_unknown_builtin_name() {
        assert!(ModelFeatureSubset::builtin("rf_v2", &schema()).is_err());
    }
}
