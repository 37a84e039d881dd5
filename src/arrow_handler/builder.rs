use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::engine::AnomalyReport;
use crate::utils::AnalysisError;

/// Build Arrow IPC result for anomaly detection
///
/// # Arguments
/// * `report` - Scored training rows
///
/// # Returns
/// * `Ok(Vec<u8>)` - Arrow IPC Stream format bytes with columns
///   `student_id, total_score, anomaly_score, is_anomalous`
/// * `Err(AnalysisError)` - If building fails
pub fn build_anomaly_result(report: &AnomalyReport) -> Result<Vec<u8>, AnalysisError> {
    if report.records.is_empty() {
        return Err(AnalysisError::ValidationError(
            "report has no records".to_string(),
        ));
    }

    // Define schema (order fixed)
    let schema = Arc::new(Schema::new(vec![
        Field::new("student_id", DataType::Utf8, false),
        Field::new("total_score", DataType::Float64, false),
        Field::new("anomaly_score", DataType::Float64, false),
        Field::new("is_anomalous", DataType::Boolean, false),
    ]));

    let ids: Vec<&str> = report.records.iter().map(|r| r.record.id.as_str()).collect();
    let totals: Vec<f64> = report.records.iter().map(|r| r.record.total_score()).collect();
    let scores: Vec<f64> = report.records.iter().map(|r| r.score).collect();
    let labels: Vec<bool> = report
        .records
        .iter()
        .map(|r| r.label.is_anomalous())
        .collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(ids)) as ArrayRef,
            Arc::new(Float64Array::from(totals)) as ArrayRef,
            Arc::new(Float64Array::from(scores)) as ArrayRef,
            Arc::new(BooleanArray::from(labels)) as ArrayRef,
        ],
    )
    .map_err(|e| AnalysisError::ArrowError(format!("failed to create RecordBatch: {}", e)))?;

    serialize_to_ipc(schema, batch)
}

/// Serialize RecordBatch to Arrow IPC Stream format
fn serialize_to_ipc(schema: Arc<Schema>, batch: RecordBatch) -> Result<Vec<u8>, AnalysisError> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, &schema).map_err(|e| {
            AnalysisError::ArrowError(format!("failed to create StreamWriter: {}", e))
        })?;
        writer
            .write(&batch)
            .map_err(|e| AnalysisError::ArrowError(format!("failed to write batch: {}", e)))?;
        writer
            .finish()
            .map_err(|e| AnalysisError::ArrowError(format!("failed to finish writer: {}", e)))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::StudentRecord;
    use crate::engine::ScoredRecord;
    use crate::insight_core::Label;
    use crate::stats::AnomalySummary;
    use arrow::ipc::reader::StreamReader;
    use std::io::Cursor;

    fn sample_report() -> AnomalyReport {
        let rows = [
            ("S1", 90.0, 80.0, 70.0, 0.41, Label::Normal),
            ("S2", 5.0, 10.0, 8.0, 0.78, Label::Anomalous),
        ];
        let records: Vec<ScoredRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, &(id, att, asg, test, score, label))| ScoredRecord {
                row: i + 1,
                record: StudentRecord {
                    id: id.to_string(),
                    name: None,
                    attendance: att,
                    assignment_score: asg,
                    test_score: test,
                },
                score,
                label,
            })
            .collect();
        let summary = AnomalySummary::from_labels(&[Label::Normal, Label::Anomalous]);
        AnomalyReport {
            dataset_name: "sample".to_string(),
            records,
            threshold: 0.6,
            summary,
        }
    }

    #[test]
    fn test_build_anomaly_result() {
        let result = build_anomaly_result(&sample_report()).unwrap();
        assert!(!result.is_empty());

        // Verify by parsing back
        let cursor = Cursor::new(result);
        let mut reader = StreamReader::try_new(cursor, None).unwrap();
        let schema = reader.schema();
        assert_eq!(schema.fields().len(), 4);
        assert_eq!(schema.fields()[0].name(), "student_id");
        assert_eq!(schema.fields()[1].name(), "total_score");
        assert_eq!(schema.fields()[2].name(), "anomaly_score");
        assert_eq!(schema.fields()[3].name(), "is_anomalous");

        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        let totals = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(totals.value(1), 9.0);
        let flags = batch
            .column(3)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(!flags.value(0));
        assert!(flags.value(1));
    }

    #[test]
    fn test_build_anomaly_result_empty() {
        let mut report = sample_report();
        report.records.clear();
        let result = build_anomaly_result(&report);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no records"));
    }
}
