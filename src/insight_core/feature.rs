use ndarray::Array2;

use crate::dataset::columns;
use crate::utils::AnalysisError;

/// Width of every feature vector fed to the scaler and the forest
pub const FEATURE_COUNT: usize = 4;

/// Column order of the feature vector
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    columns::ATTENDANCE,
    columns::ASSIGNMENT_SCORE,
    columns::TEST_SCORE,
    columns::TOTAL_SCORE,
];

/// Composite score: mean of assignment and test score
pub fn total_score(assignment_score: f64, test_score: f64) -> f64 {
    (assignment_score + test_score) / 2.0
}

/// Project raw fields onto the model's feature space
///
/// Both the training batch and single-record queries go through here, so
/// Total_Score is always derived the same way at fit and at inference time.
pub fn feature_vector(attendance: f64, assignment_score: f64, test_score: f64) -> [f64; FEATURE_COUNT] {
    [
        attendance,
        assignment_score,
        test_score,
        total_score(assignment_score, test_score),
    ]
}

/// Stack feature vectors into a (rows x FEATURE_COUNT) matrix
pub fn feature_matrix(vectors: &[[f64; FEATURE_COUNT]]) -> Array2<f64> {
    let flat: Vec<f64> = vectors.iter().flat_map(|v| v.iter().copied()).collect();
    // Shape always matches the flattened length
    Array2::from_shape_vec((vectors.len(), FEATURE_COUNT), flat)
        .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COUNT)))
}

/// Validate feature matrix dimensions and values
///
/// # Arguments
/// * `features` - Feature matrix to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if invalid
pub fn validate_features(features: &Array2<f64>) -> Result<(), AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix cannot be empty".to_string(),
        ));
    }

    if features.ncols() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix must have at least one column".to_string(),
        ));
    }

    // Check for NaN or Inf values
    for value in features.iter() {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::ValidationError(
                "feature matrix contains NaN or Inf values".to_string(),
            ));
        }
    }

    Ok(())
}
