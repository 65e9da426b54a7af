//! Bilingual label index.
//!
//! Maps human-facing labels to feature identifiers and back, per locale.
//! The zh-TW labels double as the column names the trained models were
//! fit on, so they are kept byte-exact (embedded newlines and trailing
//! spaces included). The index is validated in full at construction.

use std::collections::HashMap;

use cabgrisk_common::{Locale, Result, RiskError};

use crate::feature::{FeatureId, FeatureSchema};

/// One locale's (label, identifier) pairs.
#[derive(Debug, Clone, Copy)]
pub struct LabelTable {
    pub locale: Locale,
    pub entries: &'static [(&'static str, &'static str)],
}

pub const ZH_TW_LABELS: LabelTable = LabelTable {
    locale: Locale::ZhTw,
    entries: &[
        ("angina class, CCS", "Angina_class_CCS"),
        ("IABP\n insertion", "IABP_insertion"),
        ("Complete revascularization", "Complete_revascularization"),
        ("SvG for non-LAD", "SVG_non_LAD"),
        ("EuroSCORE Additive", "EuroSCORE_Additive"),
        ("Number of disease vessels", "Num_disease_vessels"),
        ("Number of grafts", "Num_grafts"),
        ("術前EF%", "PreOp_EF_percent"),
        ("術後EF%", "PostOp_EF_percent"),
        ("手術時間", "Surgery_time"),
        ("ICU \n日數", "ICU_days"),
        ("total CPB time  (mins)", "Total_CPB_time"),
        ("性別", "Sex"),
        ("年齡", "Age"),
        ("身高", "Height"),
        ("體重", "Weight"),
        ("BMI", "BMI"),
        ("Smoking", "Smoking"),
        ("DM", "Diabetes"),
        ("Pump support ", "Pump_support"),
        ("Quit \nSmoking", "Quit_smoking"),
        ("Stroke", "Stroke"),
        ("HTN", "Hypertension"),
        ("OPCAB", "OPCAB"),
        ("Post-bypass MI", "PostBypass_MI"),
        ("ESRD", "ESRD"),
        ("Cerebral deficits", "Cerebral_deficits"),
        ("Hyperlipidemia", "Hyperlipidemia"),
        ("Hyperkalemia", "Hyperkalemia"),
        ("COPD", "COPD"),
        ("呼吸器\n>24 hr", "Ventilator_gt_24hr"),
        ("Respiratory failure", "Respiratory_failure"),
        ("MIDCAB", "MIDCAB"),
        ("年齡 ≥ 60", "Age_ge_60"),
        ("Repeat sternotomy for revision of bleeding", "Repeat_sternotomy_bleeding"),
        ("Pump Arrest", "Pump_arrest"),
        ("Sepsis", "Sepsis"),
        ("LM>50%", "LM_gt_50"),
        ("Gastrointestinal Bleeding", "GI_bleeding"),
        ("住院\n天數", "InHospital_days"),
        ("術前住院天數", "PreOp_days"),
        ("術後住院天數", "PostOp_days"),
    ],
};

pub const EN_LABELS: LabelTable = LabelTable {
    locale: Locale::En,
    entries: &[
        ("Angina class, CCS", "Angina_class_CCS"),
        ("IABP insertion", "IABP_insertion"),
        ("Complete revascularization", "Complete_revascularization"),
        ("SVG for non-LAD", "SVG_non_LAD"),
        ("EuroSCORE Additive", "EuroSCORE_Additive"),
        ("Number of diseased vessels", "Num_disease_vessels"),
        ("Number of grafts", "Num_grafts"),
        ("Pre-op EF %", "PreOp_EF_percent"),
        ("Post-op EF %", "PostOp_EF_percent"),
        ("Surgery time", "Surgery_time"),
        ("ICU days", "ICU_days"),
        ("Total CPB time (mins)", "Total_CPB_time"),
        ("Sex", "Sex"),
        ("Age", "Age"),
        ("Height", "Height"),
        ("Weight", "Weight"),
        ("BMI", "BMI"),
        ("Smoking", "Smoking"),
        ("Diabetes (DM)", "Diabetes"),
        ("Pump support", "Pump_support"),
        ("Quit smoking", "Quit_smoking"),
        ("Stroke", "Stroke"),
        ("Hypertension (HTN)", "Hypertension"),
        ("OPCAB", "OPCAB"),
        ("Post-bypass MI", "PostBypass_MI"),
        ("ESRD", "ESRD"),
        ("Cerebral deficits", "Cerebral_deficits"),
        ("Hyperlipidemia", "Hyperlipidemia"),
        ("Hyperkalemia", "Hyperkalemia"),
        ("COPD", "COPD"),
        ("Ventilator > 24 hr", "Ventilator_gt_24hr"),
        ("Respiratory failure", "Respiratory_failure"),
        ("MIDCAB", "MIDCAB"),
        ("Age ≥ 60", "Age_ge_60"),
        ("Repeat sternotomy for bleeding", "Repeat_sternotomy_bleeding"),
        ("Pump arrest", "Pump_arrest"),
        ("Sepsis", "Sepsis"),
        ("LM > 50%", "LM_gt_50"),
        ("Gastrointestinal bleeding", "GI_bleeding"),
        ("In-hospital days", "InHospital_days"),
        ("Pre-op hospital days", "PreOp_days"),
        ("Post-op hospital days", "PostOp_days"),
    ],
};

/// Captions of the two-choice toggle, (negative, positive).
pub fn binary_captions(locale: Locale) -> (&'static str, &'static str) {
    match locale {
        Locale::En => ("No", "Yes"),
        Locale::ZhTw => ("無", "有"),
    }
}

#[derive(Debug, Clone)]
pub struct LabelIndex {
    to_id: HashMap<(Locale, String), FeatureId>,
    to_label: HashMap<(Locale, FeatureId), String>,
}

impl LabelIndex {
    /// Build and validate. Fails on an identifier the schema does not know,
    /// a label or identifier listed twice within one locale, or a schema
    /// feature left without a label in any supported locale.
    pub fn new(schema: &FeatureSchema, tables: &[LabelTable]) -> Result<Self> {
        let mut to_id: HashMap<(Locale, String), FeatureId> = HashMap::new();
        let mut to_label: HashMap<(Locale, FeatureId), String> = HashMap::new();

        for table in tables {
            let locale = table.locale;
            for &(label, raw_id) in table.entries {
                let id = schema.id(raw_id).ok_or_else(|| RiskError::UnknownFeature {
                    feature: raw_id.to_string(),
                    locale,
                })?;

                if let Some(existing) = to_id.get(&(locale, label.to_string())) {
                    return Err(RiskError::DuplicateLabel {
                        label: label.to_string(),
                        locale,
                        first: existing.to_string(),
                        second: id.to_string(),
                    });
                }
                if to_label.contains_key(&(locale, id)) {
                    return Err(RiskError::DuplicateFeature(format!("{id} ({locale})")));
                }

                to_id.insert((locale, label.to_string()), id);
                to_label.insert((locale, id), label.to_string());
            }
        }

        for locale in Locale::ALL {
            if let Some(spec) = schema
                .features()
                .iter()
                .find(|spec| !to_label.contains_key(&(locale, spec.id)))
            {
                return Err(RiskError::MissingLabel {
                    feature: spec.id.to_string(),
                    locale,
                });
            }
        }

        tracing::debug!(entries = to_label.len(), "Label index built");
        Ok(Self { to_id, to_label })
    }

    /// The built-in en / zh-TW dictionaries.
    pub fn builtin(schema: &FeatureSchema) -> Result<Self> {
        Self::new(schema, &[EN_LABELS, ZH_TW_LABELS])
    }

    pub fn to_identifier(&self, label: &str, locale: Locale) -> Result<FeatureId> {
        self.to_id
            .get(&(locale, label.to_string()))
            .copied()
            .ok_or_else(|| RiskError::UnknownLabel {
                label: label.to_string(),
                locale,
            })
    }

    pub fn to_label(&self, id: FeatureId, locale: Locale) -> Result<&str> {
        self.to_label
            .get(&(locale, id))
            .map(String::as_str)
            .ok_or_else(|| RiskError::UnknownFeature {
                feature: id.to_string(),
                locale,
            })
    }

    /// Label with embedded line breaks and runs of spaces collapsed, for display.
    pub fn display_label(&self, id: FeatureId, locale: Locale) -> Result<String> {
        let raw = self.to_label(id, locale)?;
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::cabg().unwrap()
    }

    #[test]
    fn test_round_trip_every_feature_every_locale() {
        let schema = schema();
        let index = LabelIndex::builtin(&schema).unwrap();
        for locale in Locale::ALL {
            for spec in schema.features() {
                let label = index.to_label(spec.id, locale).unwrap();
                assert_eq!(index.to_identifier(label, locale).unwrap(), spec.id);
            }
        }
    }

    #[test]
    fn test_labels_are_byte_exact() {
        let schema = schema();
        let index = LabelIndex::builtin(&schema).unwrap();
        let iabp = schema.id("IABP_insertion").unwrap();
        assert_eq!(index.to_label(iabp, Locale::ZhTw).unwrap(), "IABP\n insertion");
        assert_eq!(index.display_label(iabp, Locale::ZhTw).unwrap(), "IABP insertion");
        let pump = schema.id("Pump_support").unwrap();
        assert_eq!(index.to_label(pump, Locale::ZhTw).unwrap(), "Pump support ");
        assert!(index.to_identifier("Pump support", Locale::ZhTw).is_err());
    }

    #[test]
    fn test_unknown_label() {
        let index = LabelIndex::builtin(&schema()).unwrap();
        let err = index.to_identifier("Heart rate", Locale::En).unwrap_err();
        assert!(matches!(err, RiskError::UnknownLabel { .. }));
    }

    #[test]
    fn test_unknown_feature() {
        let index = LabelIndex::builtin(&schema()).unwrap();
        let err = index.to_label(FeatureId::new("Heart_rate"), Locale::En).unwrap_err();
        assert!(matches!(err, RiskError::UnknownFeature { .. }));
    }

    #[test]
    fn test_duplicate_label_fails_construction() {
        const CLASHING: LabelTable = LabelTable {
            locale: Locale::En,
            entries: &[("Smoking", "Smoking"), ("Smoking", "Quit_smoking")],
        };
        let err = LabelIndex::new(&schema(), &[CLASHING, ZH_TW_LABELS]).unwrap_err();
        match err {
            RiskError::DuplicateLabel { label, first, second, .. } => {
                assert_eq!(label, "Smoking");
                assert_eq!(first, "Smoking");
                assert_eq!(second, "Quit_smoking");
            }
            other => panic!("expected DuplicateLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_feature_labelled_twice_fails() {
        const TWICE: LabelTable = LabelTable {
            locale: Locale::En,
            entries: &[("Smoker", "Smoking"), ("Smoking", "Smoking")],
        };
        let err = LabelIndex::new(&schema(), &[TWICE, ZH_TW_LABELS]).unwrap_err();
        assert!(matches!(err, RiskError::DuplicateFeature(_)));
    }

    #[test]
    fn test_incomplete_locale_fails() {
        let err = LabelIndex::new(&schema(), &[EN_LABELS]).unwrap_err();
        assert!(matches!(err, RiskError::MissingLabel { locale: Locale::ZhTw, .. }));
    }

    #[test]
    fn test_unknown_identifier_in_table_fails() {
        const STRAY: LabelTable = LabelTable {
            locale: Locale::En,
            entries: &[("Heart rate", "Heart_rate")],
        };
        let err = LabelIndex::new(&schema(), &[STRAY, EN_LABELS, ZH_TW_LABELS]).unwrap_err();
        assert!(matches!(err, RiskError::UnknownFeature { .. }));
    }
}
