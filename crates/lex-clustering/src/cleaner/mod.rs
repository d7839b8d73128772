//! Schema normalization for raw survey tables.
//!
//! This module provides functionality for:
//! - Flattening multi-line headers and de-duplicating them
//! - Removing rows that carry no data
//! - Dropping a leading instruction row left over from the survey form

mod sanitizers;

use crate::error::{PipelineError, Result, ResultExt};
use crate::utils::{column_names, string_cells};
use polars::prelude::*;
use sanitizers::{clean_headers, is_blank_row, is_instruction_row};
use tracing::{debug, info};

/// A cleaned table together with how many data rows were removed.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub df: DataFrame,
    pub rows_dropped: usize,
}

/// Normalizes headers and discards non-data rows.
pub struct SchemaNormalizer {
    instruction_row_threshold: f64,
}

impl SchemaNormalizer {
    pub fn new(instruction_row_threshold: f64) -> Self {
        Self {
            instruction_row_threshold,
        }
    }

    /// Clean headers, drop blank rows and a leading instruction row.
    ///
    /// Fails with [`PipelineError::EmptyDataset`] when no rows remain.
    pub fn normalize(&self, df: DataFrame) -> Result<NormalizedTable> {
        let mut df = df;
        let rows_read = df.height();

        info!("Normalizing schema...");

        let cleaned = clean_headers(&column_names(&df));
        df.set_column_names(cleaned.iter().map(String::as_str))
            .context("Failed to rename columns")?;

        df = self.drop_blank_rows(df)?;
        let after_blank = df.height();
        if after_blank < rows_read {
            debug!("Removed {} blank rows", rows_read - after_blank);
        }

        df = self.drop_instruction_row(df)?;

        if df.height() == 0 {
            return Err(PipelineError::EmptyDataset);
        }

        let rows_dropped = rows_read - df.height();
        info!(
            "Schema normalized: {} rows kept, {} dropped",
            df.height(),
            rows_dropped
        );

        Ok(NormalizedTable { df, rows_dropped })
    }

    fn drop_blank_rows(&self, df: DataFrame) -> Result<DataFrame> {
        let columns = all_cells(&df)?;
        let keep: Vec<bool> = (0..df.height())
            .map(|i| !is_blank_row(&row_cells(&columns, i)))
            .collect();

        if keep.iter().all(|k| *k) {
            return Ok(df);
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        df.filter(&mask).context("Failed to remove blank rows")
    }

    fn drop_instruction_row(&self, df: DataFrame) -> Result<DataFrame> {
        if df.height() == 0 {
            return Ok(df);
        }

        let columns = all_cells(&df)?;
        if !is_instruction_row(&row_cells(&columns, 0), self.instruction_row_threshold) {
            return Ok(df);
        }

        debug!("Dropping leading instruction row");
        Ok(df.slice(1, df.height() - 1))
    }
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

fn all_cells(df: &DataFrame) -> Result<Vec<Vec<Option<String>>>> {
    column_names(df)
        .iter()
        .map(|name| string_cells(df, name).map_err(PipelineError::from))
        .collect()
}

fn row_cells(columns: &[Vec<Option<String>>], row: usize) -> Vec<Option<&str>> {
    columns.iter().map(|c| c[row].as_deref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df![
            "Name" => [Some(""), Some("Asha"), None, Some("Ravi")],
            "Screen Time\nin hours" => [Some("Please provide a value"), Some("4"), Some("nan"), Some("7")],
            "OTT" => [None, Some("Netflix"), Some(" "), Some("Prime")],
        ]
        .unwrap()
    }

    #[test]
    fn test_normalize_cleans_headers() {
        let table = SchemaNormalizer::default().normalize(sample_df()).unwrap();
        assert_eq!(
            column_names(&table.df),
            vec!["Name", "Screen Time in hours", "OTT"]
        );
    }

    #[test]
    fn test_normalize_drops_blank_and_instruction_rows() {
        let table = SchemaNormalizer::default().normalize(sample_df()).unwrap();
        assert_eq!(table.df.height(), 2);
        assert_eq!(table.rows_dropped, 2);

        let names = string_cells(&table.df, "Name").unwrap();
        assert_eq!(names, vec![Some("Asha".to_string()), Some("Ravi".to_string())]);
    }

    #[test]
    fn test_normalize_keeps_regular_first_row() {
        let df = df![
            "name" => ["Asha", "Ravi"],
            "ott" => ["Netflix", "Prime"],
        ]
        .unwrap();
        let table = SchemaNormalizer::default().normalize(df).unwrap();
        assert_eq!(table.df.height(), 2);
        assert_eq!(table.rows_dropped, 0);
    }

    #[test]
    fn test_normalize_keeps_sparse_first_respondent() {
        let df = df![
            "name" => ["Asha", "Ravi", "Meera", "Kabir"],
            "ott" => ["Netflix", "Prime", "Netflix", "Hotstar"],
            "genre" => [None, Some("Action"), Some("Drama"), Some("Comedy")],
            "language" => [None, Some("Hindi"), Some("Tamil"), Some("English")],
            "gaming_platform" => [None, Some("PC"), Some("Mobile"), Some("Console")],
        ]
        .unwrap();
        let table = SchemaNormalizer::default().normalize(df).unwrap();
        assert_eq!(table.df.height(), 4);
        assert_eq!(table.rows_dropped, 0);

        let names = string_cells(&table.df, "name").unwrap();
        assert_eq!(names[0], Some("Asha".to_string()));
    }

    #[test]
    fn test_normalize_empty_after_cleaning() {
        let df = df![
            "name" => [None::<&str>, Some("nan")],
            "ott" => [Some(""), None],
        ]
        .unwrap();
        let err = SchemaNormalizer::default().normalize(df).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn test_normalize_single_instruction_row_is_empty() {
        let df = df![
            "name" => [Some("provide your name")],
            "ott" => [Some("value")],
        ]
        .unwrap();
        let err = SchemaNormalizer::default().normalize(df).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }
}
