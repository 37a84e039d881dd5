/// ML algorithm core modules
pub mod feature;
pub mod model;

// Re-export commonly used types
pub use feature::{feature_vector, total_score, FEATURE_COUNT, FEATURE_NAMES};
pub use model::{ForestOptions, IsolationForest, Label};
