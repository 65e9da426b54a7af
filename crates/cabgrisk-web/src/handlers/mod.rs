//! HTTP handlers for all web routes.

pub mod api;
pub mod form;
pub mod health;

use std::collections::HashMap;

use cabgrisk_common::{Locale, Result, RiskError};
use cabgrisk_ranker::PredictionReport;

use crate::state::SharedState;

/// Run the pipeline off the async runtime. A request always runs to
/// completion once started.
pub(crate) async fn run_prediction(
    state: &SharedState,
    fields: HashMap<String, String>,
    locale: Locale,
) -> Result<PredictionReport> {
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || pipeline.predict_fields(&fields, locale))
        .await
        .map_err(|e| RiskError::Other(anyhow::anyhow!("prediction task failed: {e}")))?
}
