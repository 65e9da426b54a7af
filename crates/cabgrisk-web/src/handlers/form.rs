//! Form page and form submission.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::collections::HashMap;

use cabgrisk_common::ApiError;

use crate::handlers::run_prediction;
use crate::render;
use crate::state::SharedState;

#[derive(Deserialize, Default)]
pub struct LangQuery {
    pub lang: Option<String>,
}

/// GET / - Empty input form
pub async fn form_page(
    State(state): State<SharedState>,
    Query(query): Query<LangQuery>,
) -> Result<Html<String>, ApiError> {
    let locale = state.locale(query.lang.as_deref());
    let pipeline = &state.pipeline;
    let html = render::form_page(pipeline.schema(), pipeline.labels(), locale, &HashMap::new(), None)?;
    Ok(Html(html))
}

/// POST /predict - Result page, or the form again with one error message
pub async fn predict_form(
    State(state): State<SharedState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let locale = state.locale(fields.get("lang").map(String::as_str));
    let pipeline = state.pipeline.clone();

    match run_prediction(&state, fields.clone(), locale).await {
        Ok(report) => {
            let html = render::result_page(
                &report,
                pipeline.schema(),
                pipeline.labels(),
                state.config.report.probability_decimals,
            )?;
            Ok(Html(html).into_response())
        }
        Err(err) => {
            let status = if err.is_input_error() {
                tracing::debug!(error = %err, "Rejected form submission");
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                tracing::error!(error = %err, "Prediction failed");
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let html = render::form_page(
                pipeline.schema(),
                pipeline.labels(),
                locale,
                &fields,
                Some(&err.to_string()),
            )?;
            Ok((status, Html(html)).into_response())
        }
    }
}
