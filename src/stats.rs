use serde::Serialize;

use crate::dataset::{columns, Dataset, StudentRecord};
use crate::insight_core::Label;

/// Statistics computed from a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub field: String,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub sum: f64,
}

impl Statistics {
    /// Compute statistics for a numeric field in a dataset
    pub fn compute(dataset: &Dataset, field: &str) -> Option<Self> {
        let values: Vec<f64> = dataset
            .data
            .iter()
            .filter_map(|point| point.get_numeric(field))
            .collect();
        Self::from_values(field, &values)
    }

    /// Compute statistics over already-extracted values
    pub fn from_values(field: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Some(Statistics {
            field: field.to_string(),
            count,
            mean: sum / count as f64,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[count - 1],
            sum,
        })
    }
}

/// Linear-interpolated quantile of an ascending, non-empty slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Pearson correlation of two equally long series
///
/// `None` when the lengths differ, fewer than two points are given, or either
/// series is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Headline numbers for a scored dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub total: usize,
    pub anomalies: usize,
    /// Fraction labeled Normal. Not a supervised accuracy: there is no ground truth.
    pub normal_fraction: f64,
}

impl AnomalySummary {
    pub fn from_labels(labels: &[Label]) -> Self {
        let total = labels.len();
        let anomalies = labels.iter().filter(|l| l.is_anomalous()).count();
        let normal_fraction = if total == 0 {
            0.0
        } else {
            (total - anomalies) as f64 / total as f64
        };
        Self {
            total,
            anomalies,
            normal_fraction,
        }
    }
}

/// Textual stand-in for the score box plot and the attendance/total scatter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreProfile {
    pub assignment: Statistics,
    pub test: Statistics,
    pub total: Statistics,
    pub attendance_total_correlation: Option<f64>,
}

impl ScoreProfile {
    pub fn from_records(records: &[StudentRecord]) -> Option<Self> {
        let column = |f: fn(&StudentRecord) -> f64| records.iter().map(f).collect::<Vec<f64>>();
        let attendance = column(|r| r.attendance);
        let total = column(StudentRecord::total_score);

        Some(Self {
            assignment: Statistics::from_values(
                columns::ASSIGNMENT_SCORE,
                &column(|r| r.assignment_score),
            )?,
            test: Statistics::from_values(columns::TEST_SCORE, &column(|r| r.test_score))?,
            total: Statistics::from_values(columns::TOTAL_SCORE, &total)?,
            attendance_total_correlation: pearson_correlation(&attendance, &total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataPoint;

    fn create_test_dataset() -> Dataset {
        let mut dataset = Dataset::new("test".to_string());
        for value in [10.0, 20.0, 30.0, 40.0, 50.0] {
            let mut point = DataPoint::new();
            point.add_field("value".to_string(), value.to_string());
            dataset.add_point(point);
        }
        dataset
    }

    #[test]
    fn test_statistics_compute() {
        let dataset = create_test_dataset();
        let stats = Statistics::compute(&dataset, "value").unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.q1, 20.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.q3, 40.0);
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.sum, 150.0);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let stats = Statistics::from_values("x", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.q1, 1.75);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q3, 3.25);
    }

    #[test]
    fn test_statistics_empty_dataset() {
        let dataset = Dataset::new("empty".to_string());
        let stats = Statistics::compute(&dataset, "value");
        assert!(stats.is_none());
    }

    #[test]
    fn test_pearson_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let r = pearson_correlation(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let r = pearson_correlation(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);

        assert_eq!(pearson_correlation(&x, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson_correlation(&x, &[1.0]), None);
    }

    #[test]
    fn test_anomaly_summary() {
        let labels = [Label::Normal, Label::Anomalous, Label::Normal, Label::Normal];
        let summary = AnomalySummary::from_labels(&labels);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.anomalies, 1);
        assert_eq!(summary.normal_fraction, 0.75);

        assert_eq!(AnomalySummary::from_labels(&[]).normal_fraction, 0.0);
    }

    #[test]
    fn test_score_profile() {
        let rows = [(60.0, 50.0, 60.0), (80.0, 70.0, 80.0), (100.0, 90.0, 100.0)];
        let records: Vec<StudentRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, &(attendance, assignment_score, test_score))| StudentRecord {
                id: i.to_string(),
                name: None,
                attendance,
                assignment_score,
                test_score,
            })
            .collect();

        let profile = ScoreProfile::from_records(&records).unwrap();
        assert_eq!(profile.total.field, "Total_Score");
        assert_eq!(profile.total.min, 55.0);
        assert_eq!(profile.total.median, 75.0);
        assert_eq!(profile.test.max, 100.0);
        assert!((profile.attendance_total_correlation.unwrap() - 1.0).abs() < 1e-12);

        assert!(ScoreProfile::from_records(&[]).is_none());
    }
}
