//! cabgrisk-model: Inference and explanation for the mortality models.
//!
//! The pipeline talks to models through [`Classifier`] and [`Explainer`].
//! [`TreeEnsemble`] implements both for XGBoost JSON models, with exact
//! TreeSHAP attributions; [`MockModel`] stands in for tests.

pub mod adapter;
pub mod registry;
pub mod tree;
mod tree_shap;
pub mod xgboost;

pub use adapter::{Classifier, Explainer, Explanation, MockModel};
pub use registry::{ModelHandle, ModelRegistry};
pub use xgboost::TreeEnsemble;
