//! cabgrisk-schema: Feature schema, bilingual labels, model layouts and
//! the routing from form input to per-model feature vectors.

pub mod feature;
pub mod labels;
pub mod subsets;
pub mod coercion;
pub mod record;
pub mod vector;

pub use feature::{Choice, FeatureId, FeatureKind, FeatureSchema, FeatureSpec};
pub use labels::{LabelIndex, LabelTable};
pub use record::{InputCollector, InputRecord};
pub use subsets::{ColumnNaming, ModelFeatureSubset};
pub use vector::{OrderedVector, VectorBuilder};
