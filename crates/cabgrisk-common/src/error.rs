use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::locale::Locale;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Unknown label {label:?} for locale {locale}")]
    UnknownLabel { label: String, locale: Locale },

    #[error("Unknown feature {feature:?} for locale {locale}")]
    UnknownFeature { feature: String, locale: Locale },

    #[error("Label {label:?} ({locale}) is shared by {first} and {second}")]
    DuplicateLabel {
        label: String,
        locale: Locale,
        first: String,
        second: String,
    },

    #[error("Feature {0} is declared more than once")]
    DuplicateFeature(String),

    #[error("Feature {feature} has no {locale} label")]
    MissingLabel { feature: String, locale: Locale },

    #[error("Invalid schema declaration for {feature}: {reason}")]
    InvalidSchema { feature: String, reason: String },

    #[error("Invalid feature subset {model}: {reason}")]
    InvalidSubset { model: String, reason: String },

    #[error("Input record has no value for {feature} required by {model}")]
    MissingFeatureValue { model: String, feature: String },

    #[error("Invalid value {value:?} for {feature}: {reason}")]
    InvalidValue {
        feature: String,
        value: String,
        reason: String,
    },

    #[error("Choice {choice:?} is not permitted for {feature}")]
    InvalidChoice { feature: String, choice: String },

    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Inference failed for {model}: {reason}")]
    InferenceFailure { model: String, reason: String },

    #[error("Explanation failed for {model}: {reason}")]
    ExplanationFailure { model: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RiskError {
    /// Errors caused by what the user submitted, as opposed to schema or model faults.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RiskError::InvalidValue { .. }
                | RiskError::InvalidChoice { .. }
                | RiskError::UnknownLabel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;

/// HTTP-facing error for the JSON API.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl From<RiskError> for ApiError {
    fn from(err: RiskError) -> Self {
        if err.is_input_error() {
            ApiError::Unprocessable(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            ApiError::Unprocessable(message)
        } else {
            ApiError::BadRequest(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_map_to_422() {
        let err = RiskError::InvalidChoice {
            feature: "Sex".to_string(),
            choice: "Other".to_string(),
        };
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_model_errors_map_to_500() {
        let err = RiskError::InferenceFailure {
            model: "xgb_mortality".to_string(),
            reason: "boom".to_string(),
        };
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_schema_faults_are_not_input_errors() {
        let err = RiskError::InvalidSchema {
            feature: "Side".to_string(),
            reason: "categorical feature declares no choices".to_string(),
        };
        assert!(!err.is_input_error());
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_value_message_names_feature() {
        let err = RiskError::MissingFeatureValue {
            model: "xgM_ALL".to_string(),
            feature: "COPD".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("COPD"));
        assert!(msg.contains("xgM_ALL"));
    }
}
