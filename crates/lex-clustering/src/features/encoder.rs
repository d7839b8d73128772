//! Categorical and numeric feature encoding.

use crate::error::{PipelineError, Result};
use crate::types::{ColumnRole, ColumnRoleMap, FeatureMatrix};
use crate::utils::{column_names, is_blank_cell, median, parse_numeric_string, string_cells};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Placeholder for missing categorical cells, including textual markers such
/// as `nan` or `N/A`.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Maps the distinct values of one column to integer codes.
///
/// Codes follow the sorted order of the distinct values, so the mapping
/// depends only on the set of values and not on row order.
#[derive(Debug, Clone, Default)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let classes: BTreeSet<&str> = values.iter().map(AsRef::as_ref).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code of `value`, or `None` if it was not seen during fitting.
    pub fn code(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    pub fn transform<S: AsRef<str>>(&self, values: &[S]) -> Vec<Option<usize>> {
        values.iter().map(|v| self.code(v.as_ref())).collect()
    }
}

/// Builds the numeric feature matrix from detected roles.
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Encode every detected feature role into one matrix column.
    ///
    /// Categorical roles come first, then numeric roles, each in role order.
    pub fn encode(df: &DataFrame, roles: &ColumnRoleMap) -> Result<FeatureMatrix> {
        let categorical = roles.categorical();
        let numeric = roles.numeric();

        if categorical.len() + numeric.len() < 2 {
            let mapped: Vec<&str> = categorical
                .iter()
                .chain(numeric.iter())
                .map(|(_, column)| *column)
                .chain(std::iter::once(roles.identity()))
                .collect();
            return Err(PipelineError::InsufficientFeatures {
                categorical: categorical.len(),
                numeric: numeric.len(),
                detected: categorical
                    .iter()
                    .chain(numeric.iter())
                    .map(|(role, _)| role.to_string())
                    .collect(),
                unmapped: column_names(df)
                    .into_iter()
                    .filter(|c| !mapped.contains(&c.as_str()))
                    .collect(),
            });
        }

        let mut names = Vec::with_capacity(categorical.len() + numeric.len());
        let mut columns = Vec::with_capacity(categorical.len() + numeric.len());

        for (role, column) in categorical {
            columns.push(Self::encode_categorical(df, role, column)?);
            names.push(role.to_string());
        }

        for (role, column) in numeric {
            columns.push(Self::encode_numeric(df, role, column)?);
            names.push(role.to_string());
        }

        FeatureMatrix::from_columns(names, columns).ok_or_else(|| {
            PipelineError::Clustering("encoded feature columns differ in length".to_string())
        })
    }

    fn encode_categorical(df: &DataFrame, role: ColumnRole, column: &str) -> Result<Vec<f64>> {
        let values: Vec<String> = string_cells(df, column)?
            .into_iter()
            .map(|cell| {
                if is_blank_cell(cell.as_deref()) {
                    UNKNOWN_CATEGORY.to_string()
                } else {
                    cell.unwrap_or_default().trim().to_string()
                }
            })
            .collect();

        let encoder = CategoryEncoder::fit(&values);
        debug!(
            "Encoded '{}' ({}) with {} categories",
            column,
            role,
            encoder.classes().len()
        );

        // Every value was seen during fitting.
        Ok(encoder
            .transform(&values)
            .into_iter()
            .map(|code| code.unwrap_or_default() as f64)
            .collect())
    }

    fn encode_numeric(df: &DataFrame, role: ColumnRole, column: &str) -> Result<Vec<f64>> {
        let parsed: Vec<Option<f64>> = string_cells(df, column)?
            .iter()
            .map(|cell| cell.as_deref().and_then(parse_numeric_string))
            .collect();

        let observed: Vec<f64> = parsed.iter().flatten().copied().collect();
        let fill = median(&observed).ok_or_else(|| PipelineError::InsufficientData {
            role: role.to_string(),
            column: column.to_string(),
        })?;

        let missing = parsed.len() - observed.len();
        if missing > 0 {
            debug!(
                "Filled {} missing values in '{}' with median {:.4}",
                missing, column, fill
            );
        }

        Ok(parsed.into_iter().map(|v| v.unwrap_or(fill)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles_for(pairs: &[(ColumnRole, &str)]) -> ColumnRoleMap {
        let mut roles = ColumnRoleMap::new("name", false);
        for (role, column) in pairs {
            roles.insert(*role, *column);
        }
        roles
    }

    #[test]
    fn test_category_encoder_sorted_codes() {
        let encoder = CategoryEncoder::fit(&["Prime", "Netflix", "Prime", "Hotstar"]);
        assert_eq!(encoder.classes(), &["Hotstar", "Netflix", "Prime"]);
        assert_eq!(
            encoder.transform(&["Prime", "Hotstar", "Zee5"]),
            vec![Some(2), Some(0), None]
        );
    }

    #[test]
    fn test_encode_mixed_features() {
        let df = df![
            "name" => ["a", "b", "c", "d"],
            "OTT" => [Some("Prime"), Some(" Netflix "), None, Some("Prime")],
            "Screen" => [Some("4"), Some("n/a"), Some("10"), Some("2")],
        ]
        .unwrap();
        let roles = roles_for(&[(ColumnRole::Ott, "OTT"), (ColumnRole::ScreenTime, "Screen")]);

        let matrix = FeatureEncoder::encode(&df, &roles).unwrap();
        assert_eq!(matrix.feature_names(), &["ott", "screen_time"]);
        // Netflix=0, Prime=1, Unknown=2
        assert_eq!(matrix.column(0), vec![1.0, 0.0, 2.0, 1.0]);
        // median of [4, 10, 2] is 4
        assert_eq!(matrix.column(1), vec![4.0, 4.0, 10.0, 2.0]);
    }

    #[test]
    fn test_encode_requires_two_features() {
        let df = df![
            "name" => ["a", "b"],
            "OTT" => ["Prime", "Netflix"],
            "comments" => ["fine", "ok"],
        ]
        .unwrap();
        let roles = roles_for(&[(ColumnRole::Ott, "OTT")]);

        let err = FeatureEncoder::encode(&df, &roles).unwrap_err();
        match err {
            PipelineError::InsufficientFeatures {
                categorical,
                numeric,
                detected,
                unmapped,
            } => {
                assert_eq!(categorical, 1);
                assert_eq!(numeric, 0);
                assert_eq!(detected, vec!["ott".to_string()]);
                assert_eq!(unmapped, vec!["comments".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_missing_markers_as_unknown() {
        let df = df![
            "name" => ["a", "b", "c", "d", "e"],
            "OTT" => [Some("Prime"), Some("nan"), Some("NA"), Some(" N/A "), None],
            "Screen" => ["1", "2", "3", "4", "5"],
        ]
        .unwrap();
        let roles = roles_for(&[(ColumnRole::Ott, "OTT"), (ColumnRole::ScreenTime, "Screen")]);

        let matrix = FeatureEncoder::encode(&df, &roles).unwrap();
        // Prime=0, Unknown=1
        assert_eq!(matrix.column(0), vec![0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_encode_formatted_numbers_fall_back_to_median() {
        let df = df![
            "name" => ["a", "b", "c", "d", "e", "f"],
            "OTT" => ["Prime", "Netflix", "Prime", "Netflix", "Prime", "Netflix"],
            "Screen" => ["2", "1,0", "6", "8%", "4", "n/a"],
        ]
        .unwrap();
        let roles = roles_for(&[(ColumnRole::Ott, "OTT"), (ColumnRole::ScreenTime, "Screen")]);

        let matrix = FeatureEncoder::encode(&df, &roles).unwrap();
        // median of [2, 6, 4] is 4
        assert_eq!(matrix.column(1), vec![2.0, 4.0, 6.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_encode_all_missing_numeric() {
        let df = df![
            "name" => ["a", "b"],
            "OTT" => ["Prime", "Netflix"],
            "Gaming days" => [None::<&str>, Some("often")],
        ]
        .unwrap();
        let roles = roles_for(&[
            (ColumnRole::Ott, "OTT"),
            (ColumnRole::GamingDays, "Gaming days"),
        ]);

        let err = FeatureEncoder::encode(&df, &roles).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData { ref role, ref column }
                if role == "gaming_days" && column == "Gaming days"
        ));
    }
}
