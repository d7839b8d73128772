use crate::error::{PipelineError, Result, ResultExt};
use crate::profiler::synthetic_identity;
use crate::types::{
    ClusterAssignment, ClusterGroups, ClusteringResult, ColumnRoleMap, ElbowCurve,
    PartitionMetrics, ProjectionPoint, RunSummary, TrialRun,
};
use crate::utils::string_cells;
use chrono::Local;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Label of a cluster in the grouped output.
pub fn cluster_label(id: usize) -> String {
    format!("Cluster {}", id)
}

/// Everything the assembler packages into a [`ClusteringResult`].
pub struct AssemblyParams<'a> {
    pub df: &'a DataFrame,
    pub roles: &'a ColumnRoleMap,
    pub assignment: &'a ClusterAssignment,
    pub metrics: PartitionMetrics,
    pub trials: &'a [TrialRun],
    pub projection: Option<Vec<ProjectionPoint>>,
    pub summary: RunSummary,
}

/// Packages the outputs of a run.
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn assemble(params: AssemblyParams<'_>) -> Result<ClusteringResult> {
        let AssemblyParams {
            df,
            roles,
            assignment,
            metrics,
            trials,
            projection,
            summary,
        } = params;

        let total_rows = df.height();
        if assignment.labels.len() != total_rows {
            return Err(PipelineError::Clustering(format!(
                "{} labels for {} rows",
                assignment.labels.len(),
                total_rows
            )));
        }

        if let Some(trial) = trials.iter().find(|t| !t.inertia.is_finite()) {
            return Err(PipelineError::Clustering(format!(
                "inertia for k = {} is not finite",
                trial.k
            )));
        }

        let identities = string_cells(df, roles.identity())
            .context("Failed to read identity column")?;
        let clusters = group_identities(&identities, &assignment.labels, assignment.k());

        Ok(ClusteringResult {
            num_clusters: assignment.k(),
            clusters,
            metrics,
            total_rows,
            projection,
            elbow_curve: ElbowCurve::from(trials),
            column_roles: roles.clone(),
            summary,
        })
    }
}

/// Group identities by cluster id, keeping row order within each group.
///
/// Rows without an identity are labelled as generated identities would be.
pub(crate) fn group_identities(
    identities: &[Option<String>],
    labels: &[usize],
    k: usize,
) -> ClusterGroups {
    let mut members: Vec<Vec<String>> = vec![Vec::new(); k];

    for (row, (identity, &label)) in identities.iter().zip(labels).enumerate() {
        let name = match identity.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => synthetic_identity(row),
        };
        members[label].push(name);
    }

    let mut groups = ClusterGroups::default();
    for (id, names) in members.into_iter().enumerate() {
        groups.push(cluster_label(id), names);
    }
    groups
}

/// Report metadata written alongside a result.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub input_file: String,
    pub tool_version: String,
}

/// A result plus metadata, as written by `--emit-report`.
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub result: ClusteringResult,
}

/// Writes clustering reports to an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn build_report(input_file: &str, result: &ClusteringResult) -> ClusteringReport {
        ClusteringReport {
            metadata: ReportMetadata {
                generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                input_file: input_file.to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            result: result.clone(),
        }
    }

    /// Write a report as `<base_name>_clusters.json` in the output directory.
    pub fn write_report_to_file(
        &self,
        report: &ClusteringReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_clusters.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
