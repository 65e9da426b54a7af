//! XGBoost tree ensembles saved with `Booster.save_model("model.json")`.
//!
//! Supported: `gbtree` booster, `binary:logistic` objective, numerical
//! splits. Anything else is refused at load time rather than evaluated
//! incorrectly.

use anyhow::{anyhow, bail, ensure, Context};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use cabgrisk_schema::OrderedVector;

use crate::adapter::{sigmoid, Classifier, Explainer, Explanation};
use crate::tree::Tree;
use crate::tree_shap;

// ── On-disk layout ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<GbTreeModel>,
}

#[derive(Deserialize)]
struct GbTreeModel {
    trees: Vec<TreeJson>,
}

#[derive(Deserialize)]
struct TreeJson {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    #[serde(deserialize_with = "flags")]
    default_left: Vec<bool>,
    sum_hessian: Vec<f64>,
    #[serde(default)]
    split_type: Vec<i32>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Deserialize)]
struct Objective {
    name: String,
}

/// Older writers emit `default_left` as 0/1, newer ones as booleans.
fn flags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    let raw = Vec::<Flag>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|f| match f {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        })
        .collect())
}

/// `"5E-1"`, or `"[5E-1]"` from XGBoost 2.x.
fn parse_base_score(raw: &str) -> anyhow::Result<f64> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let first = inner.split(',').next().unwrap_or_default().trim();
    first
        .parse::<f64>()
        .with_context(|| format!("unreadable base_score {raw:?}"))
}

// ── Ensemble ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    name: String,
    trees: Vec<Tree>,
    base_margin: f64,
    num_feature: usize,
    feature_names: Vec<String>,
    expected_value: f64,
}

impl TreeEnsemble {
    pub fn load(name: &str, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(name, &json)
    }

    pub fn from_json_str(name: &str, json: &str) -> anyhow::Result<Self> {
        let file: ModelFile = serde_json::from_str(json).context("not an XGBoost JSON model")?;
        let learner = file.learner;

        ensure!(
            learner.objective.name == "binary:logistic",
            "unsupported objective {}",
            learner.objective.name
        );
        if let Some(classes) = learner.learner_model_param.num_class.as_deref() {
            let classes: u32 = classes.parse().unwrap_or(0);
            ensure!(classes <= 1, "multi-class models are not supported");
        }
        ensure!(
            learner.gradient_booster.name == "gbtree",
            "unsupported booster {}",
            learner.gradient_booster.name
        );

        let num_feature: usize = learner
            .learner_model_param
            .num_feature
            .parse()
            .with_context(|| format!("unreadable num_feature {:?}", learner.learner_model_param.num_feature))?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        ensure!(
            base_score > 0.0 && base_score < 1.0,
            "base_score {base_score} is not a probability"
        );
        let base_margin = (base_score / (1.0 - base_score)).ln();

        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| anyhow!("booster has no trees"))?;
        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| convert_tree(t, num_feature).with_context(|| format!("tree {i}")))
            .collect::<anyhow::Result<Vec<Tree>>>()?;

        if !learner.feature_names.is_empty() {
            ensure!(
                learner.feature_names.len() == num_feature,
                "{} feature names for {num_feature} features",
                learner.feature_names.len()
            );
        }

        let expected_value = base_margin + trees.iter().map(Tree::expected_value).sum::<f64>();

        tracing::debug!(model = name, trees = trees.len(), num_feature, "Loaded tree ensemble");

        Ok(Self {
            name: name.to_string(),
            trees,
            base_margin,
            num_feature,
            feature_names: learner.feature_names,
            expected_value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature names stored with the model; empty when it was fit on a bare array.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The model must have been fit on exactly `columns`, in this order.
    pub fn check_layout(&self, columns: &[String]) -> anyhow::Result<()> {
        ensure!(
            self.num_feature == columns.len(),
            "model expects {} features, layout has {}",
            self.num_feature,
            columns.len()
        );
        if let Some(pos) = self
            .feature_names
            .iter()
            .zip(columns)
            .position(|(stored, expected)| stored != expected)
        {
            bail!(
                "column {pos} is {:?} in the model but {:?} in the layout",
                self.feature_names[pos],
                columns[pos]
            );
        }
        Ok(())
    }

    /// Log-odds output for `x`.
    pub fn margin(&self, x: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Expected log-odds output with no feature known.
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    /// Per-feature TreeSHAP values in log-odds space.
    pub fn shap_values(&self, x: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; x.len()];
        for tree in &self.trees {
            tree_shap::accumulate(tree, x, &mut phi);
        }
        phi
    }

    fn check_width(&self, vector: &OrderedVector) -> anyhow::Result<()> {
        ensure!(
            vector.len() == self.num_feature,
            "{} received {} values, expected {}",
            self.name,
            vector.len(),
            self.num_feature
        );
        Ok(())
    }
}

fn convert_tree(raw: TreeJson, num_feature: usize) -> anyhow::Result<Tree> {
    if raw.split_type.iter().any(|&t| t != 0) {
        bail!("categorical splits are not supported");
    }
    let split_index = raw
        .split_indices
        .iter()
        .map(|&i| usize::try_from(i).map_err(|_| anyhow!("negative split index {i}")))
        .collect::<anyhow::Result<Vec<usize>>>()?;
    Tree::new(
        raw.left_children,
        raw.right_children,
        split_index,
        raw.split_conditions,
        raw.default_left,
        raw.sum_hessian,
        num_feature,
    )
}

impl Classifier for TreeEnsemble {
    fn predict_probability(&self, vector: &OrderedVector) -> anyhow::Result<f64> {
        self.check_width(vector)?;
        Ok(sigmoid(self.margin(&vector.values)))
    }
}

impl Explainer for TreeEnsemble {
    fn explain(&self, vector: &OrderedVector) -> anyhow::Result<Explanation> {
        self.check_width(vector)?;
        Ok(Explanation {
            base_value: self.expected_value,
            values: self.shap_values(&vector.values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_score_forms() {
        assert_eq!(parse_base_score("5E-1").unwrap(), 0.5);
        assert_eq!(parse_base_score("[2.5E-1]").unwrap(), 0.25);
        assert!(parse_base_score("half").is_err());
    }

    #[test]
    fn test_flags_accept_bool_and_int() {
        #[derive(Deserialize)]
        struct W {
            #[serde(deserialize_with = "flags")]
            f: Vec<bool>,
        }
        let w: W = serde_json::from_str(r#"{"f": [true, 0, 1, false]}"#).unwrap();
        assert_eq!(w.f, vec![true, false, true, false]);
    }

    #[test]
    fn test_rejects_non_model_json() {
        assert!(TreeEnsemble::from_json_str("m", r#"{"hello": 1}"#).is_err());
    }
}
