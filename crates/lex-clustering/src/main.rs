//! CLI entry point for the clustering pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use lex_clustering::{
    ClusteringConfig, ClusteringReport, ColumnRole, Pipeline, ReportGenerator, TableInspection,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Automatic audience segmentation for survey CSV exports",
    long_about = "Groups survey respondents into clusters from their viewing, gaming and \
                  social-media habits. Columns are detected by name, the number of \
                  clusters is chosen automatically.\n\n\
                  EXAMPLES:\n  \
                  # Cluster a survey export\n  \
                  lex-clustering -i survey.csv\n\n  \
                  # Show which columns would be used\n  \
                  lex-clustering -i survey.csv --dry-run\n\n  \
                  # Machine-readable output\n  \
                  lex-clustering -i survey.csv --json | jq .clusters"
)]
struct Args {
    /// Path to the CSV file to cluster
    #[arg(short, long)]
    input: String,

    /// Output directory for reports
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Load, clean and detect columns without clustering
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_clusters.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load .env first so RUST_LOG from it reaches the filter
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let pipeline = Pipeline::builder()
        .config(ClusteringConfig::default())
        .build()?;

    if args.dry_run {
        return run_dry_run(&pipeline, &args);
    }

    run_pipeline(&pipeline, &args)
}

/// Show what the pipeline detects without clustering.
///
/// Uses `println!` on purpose: this output is the point of `--dry-run` and
/// must not depend on the log level.
fn run_dry_run(pipeline: &Pipeline, args: &Args) -> Result<()> {
    let inspection = pipeline
        .inspect_path(&args.input)
        .map_err(|e| anyhow!("Inspection failed: {}", e))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    print_inspection(&inspection, args);
    Ok(())
}

fn print_inspection(inspection: &TableInspection, args: &Args) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Column detection preview");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Encoding: {}", inspection.encoding);
    println!("  Rows read: {}", inspection.rows_read);
    println!("  Rows dropped while cleaning: {}", inspection.rows_dropped);
    println!("  Rows to cluster: {}", inspection.total_rows);
    println!();

    println!("DETECTED ROLES");
    println!("{}", "-".repeat(40));
    println!("{:<20} {:<12} {}", "Role", "Kind", "Column");
    println!("{}", "-".repeat(70));
    let roles = &inspection.column_roles;
    for role in ColumnRole::ALL {
        let column = match roles.get(role) {
            Some(c) if role == ColumnRole::Identity && roles.is_identity_synthesized() => {
                format!("{} (generated)", c)
            }
            Some(c) => c.to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:<20} {:<12} {}",
            role.as_str(),
            format!("{:?}", role.kind()).to_lowercase(),
            truncate_str(&column, 45)
        );
    }
    println!();

    let unused: Vec<&String> = inspection
        .columns
        .iter()
        .filter(|c| ColumnRole::ALL.iter().all(|r| roles.get(*r) != Some(c.as_str())))
        .collect();
    if !unused.is_empty() {
        println!("  Ignored columns: {:?}", unused);
        println!();
    }

    println!("{}", "=".repeat(80));
    if roles.feature_count() < 2 {
        println!("Fewer than 2 feature roles detected; clustering would fail");
    } else {
        println!("To cluster this file, run without --dry-run");
    }
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Run the pipeline and route its output according to the CLI flags.
///
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn run_pipeline(pipeline: &Pipeline, args: &Args) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting clustering pipeline...");
    info!("{}", "=".repeat(80));

    let result = match pipeline.process_path(&args.input) {
        Ok(result) => result,
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    let report = ReportGenerator::build_report(&args.input, &result);

    if args.emit_report {
        let input_stem = extract_file_stem(&args.input);
        let generator = ReportGenerator::new(PathBuf::from(&args.output));
        let report_path = generator.write_report_to_file(&report, &input_stem)?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the clustering result.
fn print_human_readable_summary(report: &ClusteringReport) {
    let result = &report.result;
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLUSTERING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows, {})",
        report.metadata.input_file, result.total_rows, summary.encoding
    );
    println!("Features: {}", summary.features.join(", "));
    if summary.identity_synthesized {
        println!("Identity: generated (no name column found)");
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} read, {} dropped while cleaning",
        summary.rows_read, summary.rows_dropped
    );
    println!();

    println!("Elbow Curve:");
    for (k, inertia) in result
        .elbow_curve
        .k_values
        .iter()
        .zip(&result.elbow_curve.inertias)
    {
        let marker = if *k == result.num_clusters { "  <- selected" } else { "" };
        println!("  k = {:<3} inertia = {:>12.3}{}", k, inertia, marker);
    }
    println!();

    println!("Quality:");
    println!("  Silhouette score:     {:.3}", result.metrics.silhouette_score);
    println!("  Davies-Bouldin index: {:.3}", result.metrics.davies_bouldin_index);
    println!();

    println!("Clusters ({}):", result.num_clusters);
    for (label, members) in result.clusters.iter() {
        let preview: Vec<&str> = members.iter().take(8).map(String::as_str).collect();
        let more = members.len().saturating_sub(preview.len());
        if more > 0 {
            println!(
                "  {} [{}]: {} ... (+{} more)",
                label,
                members.len(),
                preview.join(", "),
                more
            );
        } else {
            println!("  {} [{}]: {}", label, members.len(), preview.join(", "));
        }
    }
    println!();

    if result.projection.is_none() {
        println!("2-D projection unavailable for this dataset");
        println!();
    }
    println!("{}", "=".repeat(80));
}
