//! Input record and the collector that builds it from submitted form fields.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use cabgrisk_common::Result;

use crate::coercion::coerce;
use crate::feature::{FeatureId, FeatureSchema};

/// One value per feature, built fresh for each prediction request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputRecord {
    values: BTreeMap<FeatureId, f64>,
    defaulted: Vec<FeatureId>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FeatureId, value: f64) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: FeatureId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn remove(&mut self, id: FeatureId) -> Option<f64> {
        self.defaulted.retain(|d| *d != id);
        self.values.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Features filled from the widget default because nothing was entered.
    pub fn defaulted(&self) -> &[FeatureId] {
        &self.defaulted
    }
}

/// Gathers one value per schema feature from a flat map of form fields
/// keyed by feature identifier.
pub struct InputCollector<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> InputCollector<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn collect(&self, fields: &HashMap<String, String>) -> Result<InputRecord> {
        let mut record = InputRecord::new();
        for spec in self.schema.features() {
            let raw = fields.get(spec.id.as_str()).map(String::as_str);
            let coerced = coerce(spec, raw)?;
            record.insert(spec.id, coerced.value);
            if coerced.defaulted {
                record.defaulted.push(spec.id);
            }
        }

        let ignored = fields
            .keys()
            .filter(|k| self.schema.get(k).is_none())
            .count();
        if ignored > 0 {
            tracing::debug!(ignored, "Ignored form fields outside the feature schema");
        }

        Ok(record)
    }

    /// Record as produced by an untouched form.
    pub fn defaults(&self) -> Result<InputRecord> {
        self.collect(&HashMap::new())
    }
}
