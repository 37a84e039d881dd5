use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use student_insight_engine::arrow_handler::build_anomaly_result;
use student_insight_engine::dataset::columns;
use student_insight_engine::report::write_augmented_csv;
use student_insight_engine::{
    AnomalyPipeline, AnomalyReport, Dataset, EngineConfig, RecordQuery, ScoreProfile, Statistics,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "student-insight-engine")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Flags unusual student performance records with an isolation forest", long_about = None)]
struct Cli {
    /// Path to a TOML engine config
    #[arg(long, global = true, env = "STUDENT_INSIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ModelOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Command-line overrides for the forest section of the config
#[derive(Args)]
struct ModelOverrides {
    /// Number of isolation trees
    #[arg(long, global = true)]
    trees: Option<usize>,

    /// Expected fraction of anomalies, in (0, 0.5]
    #[arg(long, global = true)]
    contamination: Option<f64>,

    /// Seed for tree construction
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every student in a CSV or JSON table
    Analyze {
        /// Path to the student table (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Write the augmented table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write student_id/total_score/anomaly_score/is_anomalous as an Arrow IPC stream
        #[arg(long)]
        arrow_output: Option<PathBuf>,

        /// Export only anomalous students
        #[arg(long)]
        anomalies_only: bool,
    },

    /// Fit on a table, then check one manually entered record
    Check {
        /// Path to the training table (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Attendance, 0-100
        #[arg(long)]
        attendance: f64,

        /// Assignment score, 0-100
        #[arg(long)]
        assignment_score: f64,

        /// Test score, 0-100
        #[arg(long)]
        test_score: f64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.overrides)?;

    match cli.command {
        Commands::Analyze {
            file,
            output,
            arrow_output,
            anomalies_only,
        } => {
            let dataset = load_dataset(&file)?;
            print_preview(&dataset, config.report.preview_rows);

            let (_, report) = AnomalyPipeline::fit(&dataset, &config.forest)?;
            print_report(&report);

            if let Some(path) = output {
                let out = fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                let only = anomalies_only || config.report.anomalies_only;
                let written = write_augmented_csv(&dataset, &report, out, only)?;
                info!(rows = written, path = %path.display(), "exported CSV report");
            }

            if let Some(path) = arrow_output {
                let bytes = build_anomaly_result(&report)?;
                fs::write(&path, bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "exported Arrow IPC report");
            }
        }

        Commands::Check {
            file,
            attendance,
            assignment_score,
            test_score,
        } => {
            let dataset = load_dataset(&file)?;
            let (pipeline, report) = AnomalyPipeline::fit(&dataset, &config.forest)?;
            println!(
                "Fitted on {} students ({} anomalies)",
                report.summary.total, report.summary.anomalies
            );

            let query = RecordQuery::new(attendance, assignment_score, test_score);
            let verdict = pipeline.check(&query)?;
            println!("\n=== Single Student Check ===");
            println!("Total_Score:   {:.2}", verdict.total_score);
            println!("Anomaly score: {:.4} (threshold {:.4})", verdict.score, pipeline.threshold());
            println!("Result:        {}", verdict.label);
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut EngineConfig, overrides: &ModelOverrides) -> anyhow::Result<()> {
    if let Some(trees) = overrides.trees {
        config.forest.n_trees = trees;
    }
    if let Some(contamination) = overrides.contamination {
        config.forest.contamination = contamination;
    }
    if let Some(seed) = overrides.seed {
        config.forest.seed = seed;
    }
    config.forest.validate()?;
    Ok(())
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let dataset = if is_json {
        Dataset::from_json(name, &content)?
    } else {
        Dataset::from_csv(name, &content)?
    };
    dataset.validate_schema()?;

    println!("Loaded dataset '{}' with {} records", dataset.name, dataset.len());
    Ok(dataset)
}

fn print_preview(dataset: &Dataset, rows: usize) {
    println!("\n=== Preview ===");
    println!("{}", dataset.columns.join(" | "));
    for point in dataset.head(rows) {
        let cells: Vec<&str> = dataset
            .columns
            .iter()
            .map(|c| point.get_field(c).map(String::as_str).unwrap_or(""))
            .collect();
        println!("{}", cells.join(" | "));
    }
}

fn print_report(report: &AnomalyReport) {
    let records: Vec<_> = report.records.iter().map(|r| r.record.clone()).collect();
    if let Some(profile) = ScoreProfile::from_records(&records) {
        println!("\n=== Score Distribution ===");
        for stats in [&profile.assignment, &profile.test, &profile.total] {
            print_stats(stats);
        }
        match profile.attendance_total_correlation {
            Some(r) => println!("\nAttendance vs Total_Score correlation: {:.3}", r),
            None => println!("\nAttendance vs Total_Score correlation: n/a"),
        }
    }

    println!("\n=== Anomalous Students ===");
    println!(
        "{:<12} {:>10} {:>16} {:>10} {:>11} {:>8}",
        columns::STUDENT_ID,
        columns::ATTENDANCE,
        columns::ASSIGNMENT_SCORE,
        columns::TEST_SCORE,
        columns::TOTAL_SCORE,
        "Score"
    );
    for scored in report.anomalies() {
        let r = &scored.record;
        println!(
            "{:<12} {:>10.1} {:>16.1} {:>10.1} {:>11.2} {:>8.4}",
            r.id,
            r.attendance,
            r.assignment_score,
            r.test_score,
            r.total_score(),
            scored.score
        );
    }

    let summary = &report.summary;
    println!(
        "\nTotal Students: {} | Anomalies Detected: {} | Accuracy (normal fraction): {:.1}%",
        summary.total,
        summary.anomalies,
        summary.normal_fraction * 100.0
    );
}

fn print_stats(stats: &Statistics) {
    println!(
        "{:<17} min {:>6.2}  q1 {:>6.2}  median {:>6.2}  q3 {:>6.2}  max {:>6.2}  mean {:>6.2}",
        stats.field, stats.min, stats.q1, stats.median, stats.q3, stats.max, stats.mean
    );
}
