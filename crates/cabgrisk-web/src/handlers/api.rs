//! JSON API: prediction and schema description.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use cabgrisk_common::{ApiError, Locale};
use cabgrisk_ranker::PredictionReport;
use cabgrisk_schema::labels::binary_captions;
use cabgrisk_schema::{FeatureId, FeatureKind};

use crate::handlers::form::LangQuery;
use crate::handlers::run_prediction;
use crate::state::SharedState;

// === API Types ===

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub locale: Option<Locale>,
    /// Feature identifier → value; numbers, strings and booleans accepted.
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceView {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FeatureView {
    pub id: FeatureId,
    pub label: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceView>,
}

#[derive(Debug, Serialize)]
pub struct LayoutView {
    pub name: String,
    pub display_name: String,
    pub features: Vec<FeatureId>,
    pub columns: Vec<String>,
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaView {
    pub locale: Locale,
    pub features: Vec<FeatureView>,
    pub models: Vec<LayoutView>,
}

fn field_text(id: &str, value: &serde_json::Value) -> Result<Option<String>, ApiError> {
    use serde_json::Value;
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(if *b { "yes" } else { "no" }.to_string())),
        _ => Err(ApiError::BadRequest(format!(
            "value for {id} must be a number, string or boolean"
        ))),
    }
}

// === API Endpoints ===

/// POST /api/predict - Run both models on one patient record
pub async fn api_predict(
    State(state): State<SharedState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionReport>, ApiError> {
    let Json(request) = payload?;
    let locale = request.locale.unwrap_or(state.config.locale.default);

    let mut fields = HashMap::with_capacity(request.values.len());
    for (id, value) in &request.values {
        if let Some(text) = field_text(id, value)? {
            fields.insert(id.clone(), text);
        }
    }

    let report = run_prediction(&state, fields, locale).await?;
    Ok(Json(report))
}

/// GET /api/schema - Feature catalog and model layouts
pub async fn api_schema(
    State(state): State<SharedState>,
    Query(query): Query<LangQuery>,
) -> Result<Json<SchemaView>, ApiError> {
    let locale = state.locale(query.lang.as_deref());
    let pipeline = &state.pipeline;
    let labels = pipeline.labels();

    let features = pipeline
        .schema()
        .features()
        .iter()
        .map(|spec| {
            let (kind, choices) = match spec.kind {
                FeatureKind::Binary => {
                    let (no, yes) = binary_captions(locale);
                    (
                        "binary",
                        vec![
                            ChoiceView { value: "No", label: no },
                            ChoiceView { value: "Yes", label: yes },
                        ],
                    )
                }
                FeatureKind::Categorical(choices) => (
                    "categorical",
                    choices
                        .iter()
                        .map(|c| ChoiceView { value: c.value, label: c.label(locale) })
                        .collect(),
                ),
                FeatureKind::Numeric => ("numeric", Vec::new()),
            };
            Ok(FeatureView {
                id: spec.id,
                label: labels.display_label(spec.id, locale)?,
                kind,
                choices,
            })
        })
        .collect::<cabgrisk_common::Result<Vec<_>>>()?;

    let models = pipeline
        .registry()
        .handles()
        .iter()
        .map(|handle| {
            Ok(LayoutView {
                name: handle.name().to_string(),
                display_name: handle.display_name.clone(),
                features: handle.subset.features().to_vec(),
                columns: handle.subset.column_names(labels)?,
                fingerprint: handle.subset.fingerprint().to_string(),
            })
        })
        .collect::<cabgrisk_common::Result<Vec<_>>>()?;

    Ok(Json(SchemaView { locale, features, models }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_text() {
        assert_eq!(field_text("Age", &json!(71)).unwrap(), Some("71".to_string()));
        assert_eq!(field_text("Age", &json!(2.5)).unwrap(), Some("2.5".to_string()));
        assert_eq!(field_text("COPD", &json!(true)).unwrap(), Some("yes".to_string()));
        assert_eq!(field_text("Sex", &json!("Male")).unwrap(), Some("Male".to_string()));
        assert_eq!(field_text("Age", &json!(null)).unwrap(), None);
        assert!(field_text("Age", &json!([1])).is_err());
    }
}
