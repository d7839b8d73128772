//! Column detection for loosely named survey exports.
//!
//! Maps each [`ColumnRole`] onto the column that most plausibly carries it,
//! tolerating casing, spacing and multi-line header variations.

mod role_inference;

pub(crate) use role_inference::{find_matching_column, role_patterns};

use crate::error::{Result, ResultExt};
use crate::types::{ColumnRole, ColumnRoleMap};
use crate::utils::column_names;
use polars::prelude::*;
use tracing::{debug, info};

/// Column name used for generated identities.
pub const SYNTHETIC_IDENTITY_COLUMN: &str = "name";

/// Prefix of generated identity labels (`Person_1`, `Person_2`, ...).
pub const SYNTHETIC_IDENTITY_PREFIX: &str = "Person_";

/// Label for a row without identity, numbered from 1.
pub fn synthetic_identity(row: usize) -> String {
    format!("{}{}", SYNTHETIC_IDENTITY_PREFIX, row + 1)
}

/// A table whose columns have been mapped to roles.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    pub df: DataFrame,
    pub roles: ColumnRoleMap,
}

/// Detects which columns carry which semantic role.
pub struct ColumnDetector;

impl ColumnDetector {
    /// Column matched for `role`, if any.
    pub fn find_column<'a>(role: ColumnRole, columns: &'a [String]) -> Option<&'a str> {
        find_matching_column(role_patterns(role), columns)
    }

    /// Map every role onto the table, synthesizing an identity column when
    /// none matches.
    pub fn detect(df: DataFrame) -> Result<DetectedTable> {
        let mut df = df;
        let columns = column_names(&df);

        info!("Detecting column roles across {} columns...", columns.len());

        let (identity, synthesized) = match Self::find_column(ColumnRole::Identity, &columns) {
            Some(column) => (column.to_string(), false),
            None => {
                let column = unique_column_name(SYNTHETIC_IDENTITY_COLUMN, &columns);
                let labels: Vec<String> = (0..df.height()).map(synthetic_identity).collect();
                df.with_column(Series::new(column.as_str().into(), labels))
                    .context("Failed to add identity column")?;
                info!("No identity column found, generated '{}'", column);
                (column, true)
            }
        };

        let mut roles = ColumnRoleMap::new(identity, synthesized);
        for role in ColumnRole::ALL.into_iter().skip(1) {
            match Self::find_column(role, &columns) {
                Some(column) => {
                    debug!("Role '{}' -> column '{}'", role, column);
                    roles.insert(role, column);
                }
                None => debug!("Role '{}' not present", role),
            }
        }

        info!(
            "Detected {} feature roles ({} categorical, {} numeric)",
            roles.feature_count(),
            roles.categorical().len(),
            roles.numeric().len()
        );

        Ok(DetectedTable { df, roles })
    }
}

fn unique_column_name(base: &str, taken: &[String]) -> String {
    let mut candidate = base.to_string();
    let mut suffix = 1;
    while taken.iter().any(|c| c == &candidate) {
        candidate = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::string_cells;

    #[test]
    fn test_detect_typical_survey() {
        let df = df![
            "Name" => ["Asha", "Ravi"],
            "OTT_Top1" => ["Netflix", "Prime"],
            "Movie Genre" => ["Drama", "Action"],
            "Screen Time Movies/series in hours per week" => ["4", "7"],
            "Gaming days per week" => ["1", "3"],
        ]
        .unwrap();

        let detected = ColumnDetector::detect(df).unwrap();
        let roles = &detected.roles;
        assert_eq!(roles.identity(), "Name");
        assert!(!roles.is_identity_synthesized());
        assert_eq!(roles.get(ColumnRole::Ott), Some("OTT_Top1"));
        assert_eq!(roles.get(ColumnRole::Genre), Some("Movie Genre"));
        assert_eq!(
            roles.get(ColumnRole::ScreenTime),
            Some("Screen Time Movies/series in hours per week")
        );
        assert_eq!(roles.get(ColumnRole::GamingDays), Some("Gaming days per week"));
        assert_eq!(roles.get(ColumnRole::Language), None);
        assert_eq!(detected.df.width(), 5);
    }

    #[test]
    fn test_detect_synthesizes_identity() {
        let df = df![
            "ott" => ["Netflix", "Prime", "Hotstar"],
            "genre" => ["Drama", "Action", "Comedy"],
        ]
        .unwrap();

        let detected = ColumnDetector::detect(df).unwrap();
        assert!(detected.roles.is_identity_synthesized());
        assert_eq!(detected.roles.identity(), "name");

        let labels = string_cells(&detected.df, "name").unwrap();
        assert_eq!(
            labels,
            vec![
                Some("Person_1".to_string()),
                Some("Person_2".to_string()),
                Some("Person_3".to_string())
            ]
        );
    }

    #[test]
    fn test_unique_column_name() {
        let taken = vec!["name".to_string(), "name_1".to_string()];
        assert_eq!(unique_column_name("name", &taken), "name_2");
        assert_eq!(unique_column_name("name", &[]), "name");
    }

    #[test]
    fn test_roles_may_share_a_column() {
        let df = df![
            "user" => ["a", "b"],
            "platform" => ["Netflix", "Steam"],
        ]
        .unwrap();
        let detected = ColumnDetector::detect(df).unwrap();
        assert_eq!(detected.roles.get(ColumnRole::Ott), Some("platform"));
        assert_eq!(detected.roles.get(ColumnRole::GamingPlatform), Some("platform"));
    }
}
