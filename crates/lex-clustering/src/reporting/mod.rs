//! Result assembly and report output.
//!
//! [`ResultAssembler`] turns the pieces of a run into a [`ClusteringResult`].
//! [`ReportGenerator`] wraps a result with metadata for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_clustering::reporting::ReportGenerator;
//! use std::path::PathBuf;
//!
//! let report = ReportGenerator::build_report("data/survey.csv", &result);
//! let generator = ReportGenerator::new(PathBuf::from("outputs"));
//! generator.write_report_to_file(&report, "survey")?;
//! ```

mod generator;

pub use generator::{
    AssemblyParams, ClusteringReport, ReportGenerator, ReportMetadata, ResultAssembler,
    cluster_label,
};
