//! CSV export of the scored table.
//!
//! The original columns keep their order. `Total_Score`, `Anomaly_Score` and
//! `Anomaly` are overwritten in place when the input already has them and
//! appended otherwise.

use std::io;

use crate::dataset::{columns, Dataset};
use crate::engine::AnomalyReport;
use crate::utils::AnalysisError;

const DERIVED_COLUMNS: [&str; 3] = [
    columns::TOTAL_SCORE,
    columns::ANOMALY_SCORE,
    columns::ANOMALY,
];

/// Header of the exported table
pub fn export_header(dataset: &Dataset) -> Vec<String> {
    let mut header = dataset.columns.clone();
    for derived in DERIVED_COLUMNS {
        if !dataset.has_column(derived) {
            header.push(derived.to_string());
        }
    }
    header
}

/// Write the dataset augmented with Total_Score and the anomaly label
///
/// # Arguments
/// * `dataset` - Table the report was fitted on
/// * `report` - Batch result of [`crate::AnomalyPipeline::fit`]
/// * `writer` - Destination; UTF-8, comma-separated, header row first
/// * `anomalies_only` - Skip rows labeled Normal
pub fn write_augmented_csv<W: io::Write>(
    dataset: &Dataset,
    report: &AnomalyReport,
    writer: W,
    anomalies_only: bool,
) -> Result<usize, AnalysisError> {
    if report.records.len() != dataset.len() {
        return Err(AnalysisError::ValidationError(format!(
            "report has {} rows but dataset '{}' has {}",
            report.records.len(),
            dataset.name,
            dataset.len()
        )));
    }

    let header = export_header(dataset);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&header)?;

    let mut written = 0;
    for scored in &report.records {
        if anomalies_only && !scored.label.is_anomalous() {
            continue;
        }
        let point = &dataset.data[scored.row - 1];
        let row: Vec<String> = header
            .iter()
            .map(|column| match column.as_str() {
                columns::TOTAL_SCORE => scored.record.total_score().to_string(),
                columns::ANOMALY_SCORE => format!("{:.6}", scored.score),
                columns::ANOMALY => scored.label.to_string(),
                other => point.get_field(other).cloned().unwrap_or_default(),
            })
            .collect();
        wtr.write_record(&row)?;
        written += 1;
    }

    wtr.flush()
        .map_err(|e| AnalysisError::CsvError(format!("failed to flush export: {}", e)))?;
    Ok(written)
}
