use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::{columns, Dataset, StudentRecord};
use crate::insight_core::feature::feature_matrix;
use crate::insight_core::{ForestOptions, IsolationForest, Label};
use crate::stats::AnomalySummary;
use crate::utils::{validate_percent, AnalysisError, StandardScaler};

/// A manually entered record to check against a fitted pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordQuery {
    pub attendance: f64,
    pub assignment_score: f64,
    pub test_score: f64,
}

impl RecordQuery {
    pub fn new(attendance: f64, assignment_score: f64, test_score: f64) -> Self {
        Self {
            attendance,
            assignment_score,
            test_score,
        }
    }

    /// Reject values outside 0-100 instead of extrapolating past the training domain
    pub fn validate(&self) -> Result<StudentRecord, AnalysisError> {
        Ok(StudentRecord {
            id: "query".to_string(),
            name: None,
            attendance: validate_percent(columns::ATTENDANCE, self.attendance)?,
            assignment_score: validate_percent(columns::ASSIGNMENT_SCORE, self.assignment_score)?,
            test_score: validate_percent(columns::TEST_SCORE, self.test_score)?,
        })
    }
}

/// Outcome of scoring one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub total_score: f64,
    pub score: f64,
    pub label: Label,
}

/// One training row with its label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    /// 1-based position in the source table
    pub row: usize,
    pub record: StudentRecord,
    pub score: f64,
    pub label: Label,
}

/// Batch result produced while fitting
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub dataset_name: String,
    pub records: Vec<ScoredRecord>,
    pub threshold: f64,
    pub summary: AnomalySummary,
}

impl AnomalyReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &ScoredRecord> {
        self.records.iter().filter(|r| r.label.is_anomalous())
    }

    pub fn labels(&self) -> Vec<Label> {
        self.records.iter().map(|r| r.label).collect()
    }
}

/// Fitted scaler + forest pair
///
/// Built only through [`AnomalyPipeline::fit`] and never mutated afterwards,
/// so batch labels and later single-record checks share one set of
/// normalization parameters and one decision threshold.
#[derive(Debug, Clone)]
pub struct AnomalyPipeline {
    scaler: StandardScaler,
    forest: IsolationForest,
}

impl AnomalyPipeline {
    /// Validate, derive, normalize and fit on a dataset, labeling every row
    ///
    /// A `SchemaError` aborts before anything is fitted.
    pub fn fit(
        dataset: &Dataset,
        options: &ForestOptions,
    ) -> Result<(Self, AnomalyReport), AnalysisError> {
        let records = dataset.student_records()?;
        Self::fit_records(&dataset.name, records, options)
    }

    /// Fit on records that were already extracted from a table
    pub fn fit_records(
        dataset_name: &str,
        records: Vec<StudentRecord>,
        options: &ForestOptions,
    ) -> Result<(Self, AnomalyReport), AnalysisError> {
        if records.is_empty() {
            return Err(AnalysisError::ValidationError(format!(
                "dataset '{}' has no rows to fit",
                dataset_name
            )));
        }

        let vectors: Vec<_> = records.iter().map(StudentRecord::features).collect();
        let raw = feature_matrix(&vectors);

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&raw)?;
        debug!(rows = scaled.nrows(), "features normalized");

        let mut forest = IsolationForest::new(options.clone());
        let (scores, labels) = forest.fit(&scaled)?;
        let threshold = forest
            .threshold()
            .ok_or(AnalysisError::NotFittedError("IsolationForest"))?;

        let summary = AnomalySummary::from_labels(&labels);
        info!(
            dataset = dataset_name,
            total = summary.total,
            anomalies = summary.anomalies,
            threshold,
            "isolation forest fitted"
        );

        let records = records
            .into_iter()
            .zip(scores.into_iter().zip(labels))
            .enumerate()
            .map(|(i, (record, (score, label)))| ScoredRecord {
                row: i + 1,
                record,
                score,
                label,
            })
            .collect();

        let report = AnomalyReport {
            dataset_name: dataset_name.to_string(),
            records,
            threshold,
            summary,
        };

        Ok((Self { scaler, forest }, report))
    }

    /// Score a record through the same derive -> normalize -> predict path as the batch
    pub fn score_record(&self, record: &StudentRecord) -> Result<Verdict, AnalysisError> {
        let scaled = self.scaler.transform_row(&record.features())?;
        Ok(Verdict {
            total_score: record.total_score(),
            score: self.forest.score(&scaled)?,
            label: self.forest.predict(&scaled)?,
        })
    }

    /// Validate and score a single manually entered record
    pub fn check(&self, query: &RecordQuery) -> Result<Verdict, AnalysisError> {
        let record = query.validate()?;
        let verdict = self.score_record(&record)?;
        debug!(?query, ?verdict, "single record checked");
        Ok(verdict)
    }

    /// Decision threshold fixed at fit time
    pub fn threshold(&self) -> f64 {
        self.forest.threshold().unwrap_or(f64::INFINITY)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }
}
