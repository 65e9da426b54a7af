//! Vector builder: projects an input record onto one model's layout.

use serde::Serialize;

use cabgrisk_common::{Result, RiskError};

use crate::feature::FeatureId;
use crate::labels::LabelIndex;
use crate::record::InputRecord;
use crate::subsets::ModelFeatureSubset;

/// Model input in layout order. `features[i]`, `columns[i]` and `values[i]`
/// describe the same position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedVector {
    pub model: String,
    pub features: Vec<FeatureId>,
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl OrderedVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, f64)> + '_ {
        self.features.iter().copied().zip(self.values.iter().copied())
    }
}

pub struct VectorBuilder<'a> {
    labels: &'a LabelIndex,
}

impl<'a> VectorBuilder<'a> {
    pub fn new(labels: &'a LabelIndex) -> Self {
        Self { labels }
    }

    /// A record without a value for a required feature is an error, never a
    /// silently defaulted position.
    pub fn build(&self, record: &InputRecord, subset: &ModelFeatureSubset) -> Result<OrderedVector> {
        let values = subset
            .features()
            .iter()
            .map(|&id| {
                record.get(id).ok_or_else(|| RiskError::MissingFeatureValue {
                    model: subset.name().to_string(),
                    feature: id.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(OrderedVector {
            model: subset.name().to_string(),
            features: subset.features().to_vec(),
            columns: subset.column_names(self.labels)?,
            values,
        })
    }
}
