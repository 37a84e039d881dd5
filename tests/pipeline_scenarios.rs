use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use student_insight_engine::report::write_augmented_csv;
use student_insight_engine::{
    AnalysisError, AnomalyPipeline, Dataset, ForestOptions, Label, RecordQuery,
};

/// Build a CSV table of `n` students drawn uniformly from the given ranges
fn student_csv(
    n: usize,
    seed: u64,
    attendance: (f64, f64),
    assignment: (f64, f64),
    test: (f64, f64),
) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut csv = String::from("Student_ID,Name,Attendance,Assignment_Score,Test_Score\n");
    for i in 0..n {
        csv.push_str(&format!(
            "S{:03},Student {},{:.1},{:.1},{:.1}\n",
            i,
            i,
            rng.gen_range(attendance.0..attendance.1),
            rng.gen_range(assignment.0..assignment.1),
            rng.gen_range(test.0..test.1),
        ));
    }
    csv
}

fn typical_cohort() -> Dataset {
    let csv = student_csv(100, 2024, (60.0, 100.0), (50.0, 100.0), (50.0, 100.0));
    Dataset::from_csv("cohort".to_string(), &csv).unwrap()
}

#[test]
fn far_outlier_is_labeled_anomalous() {
    let mut csv = student_csv(99, 2024, (60.0, 100.0), (50.0, 100.0), (50.0, 100.0));
    csv.push_str("S099,Outlier,5,10,8\n");
    let dataset = Dataset::from_csv("cohort".to_string(), &csv).unwrap();

    let (_, report) = AnomalyPipeline::fit(&dataset, &ForestOptions::default()).unwrap();

    let outlier = report.records.last().unwrap();
    assert_eq!(outlier.record.id, "S099");
    assert_eq!(outlier.record.total_score(), 9.0);
    assert_eq!(outlier.label, Label::Anomalous);
}

#[test]
fn anomaly_count_follows_contamination() {
    let dataset = typical_cohort();
    let (_, report) = AnomalyPipeline::fit(&dataset, &ForestOptions::default()).unwrap();

    // round(0.05 * 100)
    assert_eq!(report.summary.total, 100);
    assert_eq!(report.summary.anomalies, 5);
    assert!((report.summary.normal_fraction - 0.95).abs() < 1e-12);
}

#[test]
fn fitting_twice_gives_identical_results() {
    let dataset = typical_cohort();
    let options = ForestOptions::default();

    let (first, report_a) = AnomalyPipeline::fit(&dataset, &options).unwrap();
    let (second, report_b) = AnomalyPipeline::fit(&dataset, &options).unwrap();

    assert_eq!(report_a.labels(), report_b.labels());
    assert_eq!(report_a.threshold, report_b.threshold);

    let query = RecordQuery::new(72.0, 64.0, 58.0);
    assert_eq!(first.check(&query).unwrap(), second.check(&query).unwrap());
}

#[test]
fn typical_single_record_is_normal() {
    let csv = student_csv(200, 7, (85.0, 100.0), (80.0, 100.0), (82.0, 100.0));
    let dataset = Dataset::from_csv("honors".to_string(), &csv).unwrap();
    let (pipeline, _) = AnomalyPipeline::fit(&dataset, &ForestOptions::default()).unwrap();

    let verdict = pipeline.check(&RecordQuery::new(95.0, 90.0, 92.0)).unwrap();
    assert_eq!(verdict.total_score, 91.0);
    assert_eq!(verdict.label, Label::Normal);
}

#[test]
fn out_of_range_query_is_rejected_not_clamped() {
    let (pipeline, _) = AnomalyPipeline::fit(&typical_cohort(), &ForestOptions::default()).unwrap();

    let err = pipeline.check(&RecordQuery::new(150.0, 90.0, 92.0)).unwrap_err();
    assert!(matches!(err, AnalysisError::ValidationError(_)));
    assert!(err.to_string().contains("Attendance"));

    // The fitted pipeline is untouched by the rejected query
    assert!(pipeline.check(&RecordQuery::new(80.0, 75.0, 75.0)).is_ok());
}

#[test]
fn missing_test_score_column_produces_no_output() {
    let csv = "Student_ID,Attendance,Assignment_Score\nS1,90,80\nS2,85,70\n";
    let dataset = Dataset::from_csv("broken".to_string(), csv).unwrap();

    let err = AnomalyPipeline::fit(&dataset, &ForestOptions::default()).unwrap_err();
    match err {
        AnalysisError::SchemaError(msg) => assert!(msg.contains("Test_Score")),
        other => panic!("expected SchemaError, got {other:?}"),
    }
}

#[test]
fn supplied_total_score_is_never_trusted() {
    let csv = "Student_ID,Attendance,Assignment_Score,Test_Score,Total_Score\n\
               S1,90,80,70,10\n\
               S2,85,60,90,99\n\
               S3,70,75,65,0\n";
    let dataset = Dataset::from_csv("totals".to_string(), csv).unwrap();
    let (_, report) = AnomalyPipeline::fit(&dataset, &ForestOptions::default()).unwrap();

    let totals: Vec<f64> = report.records.iter().map(|r| r.record.total_score()).collect();
    assert_eq!(totals, vec![75.0, 75.0, 70.0]);

    let mut out = Vec::new();
    write_augmented_csv(&dataset, &report, &mut out, false).unwrap();
    let text = String::from_utf8(out).unwrap();
    let second_row: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
    assert_eq!(second_row[4], "75");
}

#[test]
fn training_mean_normalizes_to_zero() {
    let (pipeline, _) = AnomalyPipeline::fit(&typical_cohort(), &ForestOptions::default()).unwrap();
    let params = pipeline.scaler().params().unwrap();

    let scaled = pipeline.scaler().transform_row(&params.means).unwrap();
    assert_eq!(scaled, vec![0.0; 4]);
}

#[test]
fn export_writes_augmented_file() {
    let dataset = typical_cohort();
    let (_, report) = AnomalyPipeline::fit(&dataset, &ForestOptions::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anomalies.csv");
    let file = std::fs::File::create(&path).unwrap();
    let written = write_augmented_csv(&dataset, &report, file, true).unwrap();
    assert_eq!(written, report.summary.anomalies);

    let reloaded = Dataset::from_csv(
        "reloaded".to_string(),
        &std::fs::read_to_string(&path).unwrap(),
    )
    .unwrap();
    assert_eq!(reloaded.len(), written);
    assert!(reloaded.has_column("Anomaly"));
    assert!(reloaded
        .data
        .iter()
        .all(|p| p.get_field("Anomaly").map(String::as_str) == Some("Anomalous")));
}
