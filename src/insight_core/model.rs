use std::fmt;

use ndarray::Array2;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::insight_core::feature::validate_features;
use crate::utils::{validate_contamination, AnalysisError};

/// Euler–Mascheroni constant used by the harmonic-number approximation
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Subsample size cap per tree
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Per-record classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Normal,
    Anomalous,
}

impl Label {
    pub fn is_anomalous(self) -> bool {
        matches!(self, Label::Anomalous)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::Anomalous => "Anomalous",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Isolation forest configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestOptions {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Expected fraction of anomalies; fixes the decision threshold
    pub contamination: f64,
    /// Seed for the tree-construction RNG
    pub seed: u64,
    /// Subsample size per tree (`None` = min(256, n))
    pub max_samples: Option<usize>,
    /// Depth limit per tree (`None` = ceil(log2(max_samples)))
    pub max_depth: Option<usize>,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            contamination: 0.05,
            seed: 42,
            max_samples: None,
            max_depth: None,
        }
    }
}

impl ForestOptions {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.n_trees == 0 {
            return Err(AnalysisError::ValidationError(
                "n_trees must be > 0".to_string(),
            ));
        }
        if self.max_samples == Some(0) {
            return Err(AnalysisError::ValidationError(
                "max_samples must be > 0".to_string(),
            ));
        }
        validate_contamination(self.contamination)
    }
}

/// Expected path length of an unsuccessful BST search over `n` points, c(n)
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One randomized partition tree, stored as a flat node arena (root at 0)
#[derive(Clone, Debug, PartialEq)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(
        data: &Array2<f64>,
        sample: Vec<usize>,
        max_depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, sample, 0, max_depth, rng);
        tree
    }

    fn grow(
        &mut self,
        data: &Array2<f64>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            size: indices.len(),
        });

        if indices.len() <= 1 || depth >= max_depth {
            return id;
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min, max) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| {
                        let v = data[[i, feature]];
                        (lo.min(v), hi.max(v))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return id;
        }

        let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(min..max);

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[[i, feature]] <= threshold);

        let left = self.grow(data, left_idx, depth + 1, max_depth, rng);
        let right = self.grow(data, right_idx, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[id] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(size),
            }
        }
    }
}

/// State that only exists after a successful fit
#[derive(Clone, Debug, PartialEq)]
struct FittedForest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    sample_size: usize,
    threshold: f64,
}

/// Isolation forest anomaly detector
///
/// Immutable after [`IsolationForest::fit`]; every later `score`/`predict`
/// call reads the trees and the threshold fixed at fit time.
#[derive(Clone, Debug)]
pub struct IsolationForest {
    options: ForestOptions,
    fitted: Option<FittedForest>,
}

impl IsolationForest {
    pub fn new(options: ForestOptions) -> Self {
        Self {
            options,
            fitted: None,
        }
    }

    pub fn options(&self) -> &ForestOptions {
        &self.options
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Decision threshold fixed at fit time; scores strictly above it are anomalous
    pub fn threshold(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.threshold)
    }

    /// Subsample size each tree was grown on
    pub fn sample_size(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.sample_size)
    }

    /// Build the forest and label the training rows in one pass
    ///
    /// # Arguments
    /// * `features` - Normalized feature matrix (rows=samples, cols=features)
    ///
    /// # Returns
    /// * `Ok((scores, labels))` - Anomaly scores in (0, 1] and labels for every training row
    /// * `Err(AnalysisError)` - If options or features are invalid
    ///
    /// # Algorithm
    /// Each tree draws `min(max_samples, n)` rows without replacement and splits
    /// them on a random varying feature at a uniform threshold until each row is
    /// isolated or the depth limit is hit. The score is `2^(-E[h(x)] / c(ψ))`.
    /// The threshold is the `(k+1)`-th highest training score with
    /// `k = round(contamination * n)`, so exactly `k` training rows are labeled
    /// anomalous unless scores tie at the boundary.
    ///
    /// # Performance
    /// * Complexity: O(n_trees * ψ log ψ) to build, O(n_trees * log ψ) per score
    pub fn fit(&mut self, features: &Array2<f64>) -> Result<(Vec<f64>, Vec<Label>), AnalysisError> {
        self.options.validate()?;
        validate_features(features)?;

        let n_samples = features.nrows();
        let sample_size = self
            .options
            .max_samples
            .unwrap_or(DEFAULT_MAX_SAMPLES)
            .min(n_samples);
        let max_depth = self
            .options
            .max_depth
            .unwrap_or_else(|| (sample_size as f64).log2().ceil() as usize);

        debug!(
            n_samples,
            n_features = features.ncols(),
            n_trees = self.options.n_trees,
            sample_size,
            max_depth,
            "building isolation forest"
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.options.seed);
        let trees: Vec<IsolationTree> = (0..self.options.n_trees)
            .map(|_| {
                let sample = index::sample(&mut rng, n_samples, sample_size).into_vec();
                IsolationTree::build(features, sample, max_depth, &mut rng)
            })
            .collect();

        let mut fitted = FittedForest {
            trees,
            n_features: features.ncols(),
            sample_size,
            threshold: f64::INFINITY,
        };

        let scores: Vec<f64> = features
            .rows()
            .into_iter()
            .map(|row| score_with(&fitted, &row.to_vec()))
            .collect();
        fitted.threshold = contamination_threshold(&scores, self.options.contamination);

        let labels = scores.iter().map(|&s| label_for(s, fitted.threshold)).collect();
        self.fitted = Some(fitted);

        Ok((scores, labels))
    }

    /// Anomaly score in (0, 1]; higher = easier to isolate
    pub fn score(&self, row: &[f64]) -> Result<f64, AnalysisError> {
        let fitted = self.fitted_for(row)?;
        Ok(score_with(fitted, row))
    }

    /// Label a vector against the threshold fixed at fit time
    pub fn predict(&self, row: &[f64]) -> Result<Label, AnalysisError> {
        let fitted = self.fitted_for(row)?;
        Ok(label_for(score_with(fitted, row), fitted.threshold))
    }

    fn fitted_for(&self, row: &[f64]) -> Result<&FittedForest, AnalysisError> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(AnalysisError::NotFittedError("IsolationForest"))?;
        if row.len() != fitted.n_features {
            return Err(AnalysisError::DimensionError {
                expected: fitted.n_features,
                actual: row.len(),
            });
        }
        Ok(fitted)
    }
}

fn score_with(fitted: &FittedForest, row: &[f64]) -> f64 {
    let total: f64 = fitted.trees.iter().map(|t| t.path_length(row)).sum();
    let mean_path = total / fitted.trees.len() as f64;
    let norm = average_path_length(fitted.sample_size);
    if norm > 0.0 {
        2f64.powf(-mean_path / norm)
    } else {
        // Single-sample forest: nothing can be isolated
        0.5
    }
}

fn label_for(score: f64, threshold: f64) -> Label {
    if score > threshold {
        Label::Anomalous
    } else {
        Label::Normal
    }
}

/// Score that the top `round(contamination * n)` training scores exceed
fn contamination_threshold(scores: &[f64], contamination: f64) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let k = (contamination * sorted.len() as f64).round() as usize;
    if k >= sorted.len() {
        f64::NEG_INFINITY
    } else {
        sorted[k]
    }
}
