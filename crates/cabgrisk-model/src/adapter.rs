//! Inference and explanation capabilities.
//!
//! The pipeline only sees these two traits; which library evaluates the
//! model is an implementation detail of the backend.

use serde::Serialize;
use std::collections::HashMap;

use cabgrisk_schema::OrderedVector;

/// Predicts the probability of the positive class (mortality).
pub trait Classifier: Send + Sync {
    fn predict_probability(&self, vector: &OrderedVector) -> anyhow::Result<f64>;
}

/// Attributes a prediction to the vector's entries.
pub trait Explainer: Send + Sync {
    fn explain(&self, vector: &OrderedVector) -> anyhow::Result<Explanation>;
}

/// Per-entry contributions in vector order, plus the expected model output.
/// `base_value + values.sum()` is the model output being explained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub base_value: f64,
    pub values: Vec<f64>,
}

impl Explanation {
    pub fn output(&self) -> f64 {
        self.base_value + self.values.iter().sum::<f64>()
    }
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Linear logistic model with exact linear attributions: `phi_i = w_i * x_i`.
///
/// Weights are keyed by column name; unweighted columns contribute nothing.
pub struct MockModel {
    bias: f64,
    weights: HashMap<String, f64>,
    failure: Option<String>,
    explain_len: Option<usize>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            bias: 0.0,
            weights: HashMap::new(),
            failure: None,
            explain_len: None,
        }
    }

    pub fn with(mut self, column: &str, weight: f64) -> Self {
        self.weights.insert(column.to_string(), weight);
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Every call fails with `reason`.
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Explanations carry `len` values regardless of the vector.
    pub fn with_explanation_len(mut self, len: usize) -> Self {
        self.explain_len = Some(len);
        self
    }

    fn contributions(&self, vector: &OrderedVector) -> anyhow::Result<Vec<f64>> {
        if let Some(reason) = &self.failure {
            anyhow::bail!("{reason}");
        }
        Ok(vector
            .columns
            .iter()
            .zip(&vector.values)
            .map(|(col, x)| self.weights.get(col).copied().unwrap_or(0.0) * x)
            .collect())
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for MockModel {
    fn predict_probability(&self, vector: &OrderedVector) -> anyhow::Result<f64> {
        let margin = self.bias + self.contributions(vector)?.iter().sum::<f64>();
        Ok(sigmoid(margin))
    }
}

impl Explainer for MockModel {
    fn explain(&self, vector: &OrderedVector) -> anyhow::Result<Explanation> {
        let mut values = self.contributions(vector)?;
        if let Some(len) = self.explain_len {
            values.resize(len, 0.0);
        }
        Ok(Explanation {
            base_value: self.bias,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(columns: &[&str], values: &[f64]) -> OrderedVector {
        OrderedVector {
            model: "m".to_string(),
            features: Vec::new(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) <= 1.0);
        assert!(sigmoid(-40.0) >= 0.0);
    }

    #[test]
    fn test_mock_attributions_add_up() {
        let model = MockModel::new().with("a", 0.5).with("b", -2.0).with_bias(-1.0);
        let v = vector(&["a", "b", "c"], &[2.0, 1.0, 9.0]);

        let explanation = model.explain(&v).unwrap();
        assert_eq!(explanation.values, vec![1.0, -2.0, 0.0]);
        assert_eq!(explanation.output(), -2.0);
        let p = model.predict_probability(&v).unwrap();
        assert!((p - sigmoid(-2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_failing_mock() {
        let model = MockModel::new().failing("booster unavailable");
        let v = vector(&["a"], &[1.0]);
        let err = model.predict_probability(&v).unwrap_err();
        assert_eq!(err.to_string(), "booster unavailable");
        assert!(model.explain(&v).is_err());
    }

    #[test]
    fn test_explanation_len_override() {
        let model = MockModel::new().with_explanation_len(1);
        let v = vector(&["a", "b"], &[1.0, 1.0]);
        assert_eq!(model.explain(&v).unwrap().values.len(), 1);
    }
}
