use thiserror::Error;

/// Error type for every stage of the anomaly pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Required column missing, or a cell that should be numeric is not
    #[error("SchemaError: {0}")]
    SchemaError(String),
    /// Scaler or forest used before `fit`
    #[error("NotFittedError: {0} used before fit")]
    NotFittedError(&'static str),
    /// Feature vector width does not match the fitted width
    #[error("DimensionError: expected {expected} features, got {actual}")]
    DimensionError { expected: usize, actual: usize },
    /// Invalid user input (out-of-range query, bad contamination, empty dataset)
    #[error("ValidationError: {0}")]
    ValidationError(String),
    /// Model training/prediction errors
    #[error("ModelError: {0}")]
    ModelError(String),
    /// Arrow-related errors (building or serializing a batch)
    #[error("ArrowError: {0}")]
    ArrowError(String),
    /// CSV reading or writing errors
    #[error("CsvError: {0}")]
    CsvError(String),
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::CsvError(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for AnalysisError {
    fn from(err: arrow::error::ArrowError) -> Self {
        AnalysisError::ArrowError(err.to_string())
    }
}
