use ndarray::Array2;

use crate::utils::AnalysisError;

/// Per-column parameters learned by [`StandardScaler::fit`]
#[derive(Clone, Debug, PartialEq)]
pub struct ScalerParams {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

/// Standard scaling: (x - mean) / std -> zero mean, unit variance
///
/// Parameters are learned once by `fit` and reused verbatim by every
/// `transform` call, so a single record scored later lands on the same scale
/// as the training batch.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    params: Option<ScalerParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { params: None }
    }

    /// Learn per-column mean and population standard deviation
    ///
    /// # Arguments
    /// * `features` - Training feature matrix (rows=samples, cols=features)
    ///
    /// # Returns
    /// * `Ok(())` - Parameters stored
    /// * `Err(AnalysisError)` - If the matrix is empty
    pub fn fit(&mut self, features: &Array2<f64>) -> Result<(), AnalysisError> {
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(AnalysisError::ValidationError(
                "cannot fit scaler on an empty feature matrix".to_string(),
            ));
        }

        let mut means = Vec::with_capacity(features.ncols());
        let mut stds = Vec::with_capacity(features.ncols());
        for col in features.columns() {
            means.push(col.mean().unwrap_or(0.0));
            stds.push(col.std(0.0));
        }

        self.params = Some(ScalerParams { means, stds });
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<&ScalerParams> {
        self.params.as_ref()
    }

    /// Scale a single feature vector with the fitted parameters
    ///
    /// # Note
    /// Constant columns (std == 0) map to 0.0
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        let params = self
            .params
            .as_ref()
            .ok_or(AnalysisError::NotFittedError("StandardScaler"))?;

        if row.len() != params.means.len() {
            return Err(AnalysisError::DimensionError {
                expected: params.means.len(),
                actual: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(params.means.iter().zip(&params.stds))
            .map(|(&x, (&mean, &std))| {
                if std.abs() < f64::EPSILON {
                    0.0
                } else {
                    (x - mean) / std
                }
            })
            .collect())
    }

    /// Scale every row of a feature matrix with the fitted parameters
    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
        let mut scaled = features.clone();
        for mut row in scaled.rows_mut() {
            let values = self.transform_row(&row.to_vec())?;
            for (cell, value) in row.iter_mut().zip(values) {
                *cell = value;
            }
        }
        Ok(scaled)
    }

    pub fn fit_transform(&mut self, features: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
        self.fit(features)?;
        self.transform(features)
    }
}
