use super::error::AnalysisError;

/// Lowest accepted value for attendance and score inputs
pub const MIN_PERCENT: f64 = 0.0;
/// Highest accepted value for attendance and score inputs
pub const MAX_PERCENT: f64 = 100.0;

/// Validate contamination is within (0, 0.5]
///
/// # Arguments
/// * `contamination` - Expected fraction of anomalies in the training set
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if out of range
pub fn validate_contamination(contamination: f64) -> Result<(), AnalysisError> {
    if !(contamination > 0.0 && contamination <= 0.5) {
        return Err(AnalysisError::ValidationError(format!(
            "contamination must be in (0, 0.5], got {}",
            contamination
        )));
    }
    Ok(())
}

/// Validate a percentage-style input (attendance or score) lies in [0, 100]
///
/// Values are never clamped: an out-of-range value is an error naming `field`.
pub fn validate_percent(field: &str, value: f64) -> Result<f64, AnalysisError> {
    if !value.is_finite() {
        return Err(AnalysisError::ValidationError(format!(
            "{} must be a finite number, got {}",
            field, value
        )));
    }
    if !(MIN_PERCENT..=MAX_PERCENT).contains(&value) {
        return Err(AnalysisError::ValidationError(format!(
            "{} must be within {}-{}, got {}",
            field, MIN_PERCENT, MAX_PERCENT, value
        )));
    }
    Ok(value)
}

/// Parse a raw table cell as a finite f64, reporting the column and row on failure
pub fn parse_numeric_cell(column: &str, row: usize, raw: &str) -> Result<f64, AnalysisError> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        AnalysisError::SchemaError(format!(
            "column '{}' row {}: '{}' is not numeric",
            column, row, raw
        ))
    })?;
    if !value.is_finite() {
        return Err(AnalysisError::SchemaError(format!(
            "column '{}' row {}: '{}' is not a finite number",
            column, row, raw
        )));
    }
    Ok(value)
}
