//! cabgrisk-web: Web front end for the CABG mortality models.
//! Provides:
//!   - Patient input form (en / zh-TW)
//!   - Result page with probabilities, ranked SHAP tables and waterfall plots
//!   - JSON prediction and schema API
//!   - Health endpoint

pub mod handlers;
pub mod render;
pub mod router;
pub mod state;
