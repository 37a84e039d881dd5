/// Utility modules for error handling, input validation and scaling
pub mod error;
pub mod type_convert;
pub mod scaling;

// Re-export commonly used types
pub use error::AnalysisError;
pub use type_convert::{parse_numeric_cell, validate_contamination, validate_percent};
pub use scaling::{ScalerParams, StandardScaler};
