use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::insight_core::feature::{self, FEATURE_COUNT};
use crate::utils::{parse_numeric_cell, AnalysisError};

/// Column names understood by the pipeline
pub mod columns {
    pub const STUDENT_ID: &str = "Student_ID";
    pub const NAME: &str = "Name";
    pub const ATTENDANCE: &str = "Attendance";
    pub const ASSIGNMENT_SCORE: &str = "Assignment_Score";
    pub const TEST_SCORE: &str = "Test_Score";
    pub const TOTAL_SCORE: &str = "Total_Score";
    pub const ANOMALY_SCORE: &str = "Anomaly_Score";
    pub const ANOMALY: &str = "Anomaly";

    /// Columns every uploaded table must carry
    pub const REQUIRED: [&str; 3] = [ATTENDANCE, ASSIGNMENT_SCORE, TEST_SCORE];
}

/// Represents a single data point with named fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub fields: HashMap<String, String>,
}

impl DataPoint {
    /// Create a new data point
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Add a field to the data point
    pub fn add_field(&mut self, key: String, value: String) {
        self.fields.insert(key, value);
    }

    /// Get a field value
    pub fn get_field(&self, key: &str) -> Option<&String> {
        self.fields.get(key)
    }

    /// Parse a numeric field value
    pub fn get_numeric(&self, key: &str) -> Option<f64> {
        self.get_field(key)?.trim().parse().ok()
    }
}

impl Default for DataPoint {
    fn default() -> Self {
        Self::new()
    }
}

/// One student row projected onto the fields the model uses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    /// Student_ID if present, otherwise the 1-based row number
    pub id: String,
    pub name: Option<String>,
    pub attendance: f64,
    pub assignment_score: f64,
    pub test_score: f64,
}

impl StudentRecord {
    /// Extract a record from a table row, failing on missing or non-numeric cells
    pub fn from_point(point: &DataPoint, row: usize) -> Result<Self, AnalysisError> {
        let numeric = |column: &str| -> Result<f64, AnalysisError> {
            let raw = point.get_field(column).ok_or_else(|| {
                AnalysisError::SchemaError(format!("row {} is missing column '{}'", row, column))
            })?;
            parse_numeric_cell(column, row, raw)
        };

        Ok(Self {
            id: point
                .get_field(columns::STUDENT_ID)
                .cloned()
                .unwrap_or_else(|| row.to_string()),
            name: point.get_field(columns::NAME).cloned(),
            attendance: numeric(columns::ATTENDANCE)?,
            assignment_score: numeric(columns::ASSIGNMENT_SCORE)?,
            test_score: numeric(columns::TEST_SCORE)?,
        })
    }

    /// Always derived from the two source scores
    pub fn total_score(&self) -> f64 {
        feature::total_score(self.assignment_score, self.test_score)
    }

    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        feature::feature_vector(self.attendance, self.assignment_score, self.test_score)
    }
}

/// A collection of data points with an ordered header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub data: Vec<DataPoint>,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(name: String) -> Self {
        Self {
            name,
            columns: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Add a data point to the dataset, registering any unseen columns
    pub fn add_point(&mut self, point: DataPoint) {
        let mut unseen: Vec<&String> = point
            .fields
            .keys()
            .filter(|k| !self.columns.contains(*k))
            .collect();
        unseen.sort();
        let unseen: Vec<String> = unseen.into_iter().cloned().collect();
        self.columns.extend(unseen);
        self.data.push(point);
    }

    /// Get the number of data points
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Column names in table order
    pub fn get_field_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// First `n` rows, for previews
    pub fn head(&self, n: usize) -> &[DataPoint] {
        &self.data[..n.min(self.data.len())]
    }

    /// Fail fast unless every required column is present
    pub fn validate_schema(&self) -> Result<(), AnalysisError> {
        let missing: Vec<&str> = columns::REQUIRED
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect();

        if !missing.is_empty() {
            return Err(AnalysisError::SchemaError(format!(
                "dataset '{}' is missing required column(s): {}",
                self.name,
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Project every row onto a [`StudentRecord`]
    ///
    /// All-or-nothing: the first bad row aborts with a `SchemaError`.
    pub fn student_records(&self) -> Result<Vec<StudentRecord>, AnalysisError> {
        self.validate_schema()?;

        let has_supplied_total = self.has_column(columns::TOTAL_SCORE);
        if has_supplied_total {
            warn!(
                dataset = %self.name,
                "input Total_Score column ignored; recomputing from Assignment_Score and Test_Score"
            );
        }

        let mut records = Vec::with_capacity(self.data.len());
        for (i, point) in self.data.iter().enumerate() {
            let record = StudentRecord::from_point(point, i + 1)?;
            if has_supplied_total {
                if let Some(supplied) = point.get_numeric(columns::TOTAL_SCORE) {
                    if (supplied - record.total_score()).abs() > f64::EPSILON {
                        debug!(
                            row = i + 1,
                            supplied,
                            recomputed = record.total_score(),
                            "Total_Score mismatch"
                        );
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Load dataset from CSV
    pub fn from_csv(name: String, csv_data: &str) -> Result<Self, AnalysisError> {
        let mut dataset = Dataset::new(name);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(csv_data.as_bytes());

        let headers = reader.headers()?.clone();
        dataset.columns = headers.iter().map(str::to_string).collect();

        for result in reader.records() {
            let record = result?;
            let mut point = DataPoint::new();

            for (i, field) in record.iter().enumerate() {
                if let Some(header) = headers.get(i) {
                    point.add_field(header.to_string(), field.to_string());
                }
            }
            dataset.data.push(point);
        }

        Ok(dataset)
    }

    /// Load dataset from JSON array
    pub fn from_json(name: String, json_data: &str) -> Result<Self, AnalysisError> {
        let mut dataset = Dataset::new(name);
        let data: Vec<HashMap<String, serde_json::Value>> = serde_json::from_str(json_data)
            .map_err(|e| AnalysisError::SchemaError(format!("invalid JSON table: {}", e)))?;

        for item in data {
            let mut point = DataPoint::new();
            for (key, value) in item {
                let value_str = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Null => String::new(),
                    _ => value.to_string(),
                };
                point.add_field(key, value_str);
            }
            dataset.add_point(point);
        }

        Ok(dataset)
    }
}
