//! Student Insight Engine - anomaly detection for student performance data
//!
//! Loads a table of attendance, assignment and test scores, derives a
//! composite Total_Score, z-score normalizes the features and labels every
//! student with a seeded isolation forest. The fitted pipeline can then
//! check single records against the same scale and threshold.

pub mod arrow_handler;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod insight_core;
pub mod report;
pub mod stats;
pub mod utils;

pub use config::EngineConfig;
pub use dataset::{DataPoint, Dataset, StudentRecord};
pub use engine::{AnomalyPipeline, AnomalyReport, RecordQuery, ScoredRecord, Verdict};
pub use insight_core::{ForestOptions, Label};
pub use stats::{AnomalySummary, ScoreProfile, Statistics};
pub use utils::AnalysisError;

/// Result type used at the I/O boundary of the library
pub type Result<T> = anyhow::Result<T>;
