//! cabgrisk-ranker: Ranked attribution reports and the prediction pipeline.

pub mod pipeline;
pub mod report;
pub mod waterfall;

pub use pipeline::{ModelReport, PredictionPipeline, PredictionReport};
pub use report::{rank, Attribution, RankedRow};
pub use waterfall::{waterfall, Waterfall, WaterfallStep};
