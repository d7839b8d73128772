//! Shared utilities for the clustering pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Runs of whitespace and underscores collapse to one underscore in column keys.
static NAME_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[_\s]+").expect("Invalid regex: name separators"));

// =============================================================================
// Column Name Utilities
// =============================================================================

/// Normalize a column name (or pattern) for fuzzy matching.
///
/// Lower-cases, trims and collapses every run of whitespace/underscores to a
/// single `_`.
///
/// # Example
///
/// ```rust,ignore
/// use lex_clustering::utils::normalize_column_name;
///
/// assert_eq!(normalize_column_name("  OTT  Top1 "), "ott_top1");
/// assert_eq!(normalize_column_name("binge__freq"), "binge_freq");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    NAME_SEPARATORS
        .replace_all(name.trim().to_lowercase().as_str(), "_")
        .into_owned()
}

// =============================================================================
// Cell Utilities
// =============================================================================

/// Textual markers that spreadsheet exports write for a missing cell.
///
/// Compared case-insensitively after trimming.
pub const MISSING_MARKERS: [&str; 7] = ["nan", "na", "n/a", "null", "none", "<na>", "#n/a"];

/// Try to parse a cell as a finite numeric value (f64).
///
/// Only surrounding whitespace is tolerated. Formatted text such as `"8%"`,
/// `"$10"` or the decimal comma in `"1,0"` is unparseable, as are `"nan"` and
/// `"inf"`, so those cells fall back to the column median.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether trimmed text is one of the [`MISSING_MARKERS`].
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// A cell is blank when it is null, empty after trimming, or a missing marker.
pub fn is_blank_cell(cell: Option<&str>) -> bool {
    match cell {
        None => true,
        Some(s) => s.trim().is_empty() || is_missing_marker(s),
    }
}

/// Read a column as optional strings, casting non-text columns to text.
pub fn string_cells(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let str_chunked = series.str()?;
    Ok(str_chunked
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Column names of a DataFrame as owned strings, in column order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Median of a slice; the mean of the two middle values for even lengths.
///
/// Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Squared Euclidean distance between two equally long vectors.
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance between two equally long vectors.
#[inline]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("OTT_Top1"), "ott_top1");
        assert_eq!(
            normalize_column_name("Preferred Streaming Platform"),
            "preferred_streaming_platform"
        );
        assert_eq!(normalize_column_name("  binge _ freq "), "binge_freq");
        assert_eq!(normalize_column_name("Movies/Series"), "movies/series");
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string(" 12.5 "), Some(12.5));
        assert_eq!(parse_numeric_string("-3.5"), Some(-3.5));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("often"), None);
        assert_eq!(parse_numeric_string("NaN"), None);
        assert_eq!(parse_numeric_string("inf"), None);
    }

    #[test]
    fn test_parse_numeric_string_rejects_formatted_text() {
        assert_eq!(parse_numeric_string("1,0"), None);
        assert_eq!(parse_numeric_string("8%"), None);
        assert_eq!(parse_numeric_string("$10"), None);
        assert_eq!(parse_numeric_string("1 000"), None);
        assert_eq!(parse_numeric_string("n/a"), None);
    }

    #[test]
    fn test_is_blank_cell() {
        assert!(is_blank_cell(None));
        assert!(is_blank_cell(Some("   ")));
        assert!(is_blank_cell(Some("nan")));
        assert!(is_blank_cell(Some("NaN")));
        assert!(is_blank_cell(Some(" NA ")));
        assert!(is_blank_cell(Some("N/A")));
        assert!(is_blank_cell(Some("null")));
        assert!(!is_blank_cell(Some("Netflix")));
        assert!(!is_blank_cell(Some("0")));
    }

    #[test]
    fn test_string_cells() {
        let df = df!["a" => [Some("x"), None, Some("z")]].unwrap();
        let cells = string_cells(&df, "a").unwrap();
        assert_eq!(
            cells,
            vec![Some("x".to_string()), None, Some("z".to_string())]
        );
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_distances() {
        assert_eq!(squared_distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 3), 0.123);
        assert_eq!(round_to(0.6789, 3), 0.679);
        assert_eq!(round_to(-0.5567, 2), -0.56);
    }
}
