use crate::loader::TextEncoding;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

// ============================================================================
// Column Roles
// ============================================================================

/// How a semantic role contributes to the feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Labels rows in the output; never a feature.
    Identity,
    /// Encoded to integer codes.
    Categorical,
    /// Parsed to floats and median-imputed.
    Numeric,
}

/// The fixed set of semantic roles a column can be mapped to.
///
/// Declaration order is the order features appear in the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Identity,
    Ott,
    Genre,
    Language,
    GamingPlatform,
    SocialPlatform,
    BingeFrequency,
    ScreenTime,
    GamingDays,
}

impl ColumnRole {
    /// Every role, in detection order.
    pub const ALL: [ColumnRole; 9] = [
        ColumnRole::Identity,
        ColumnRole::Ott,
        ColumnRole::Genre,
        ColumnRole::Language,
        ColumnRole::GamingPlatform,
        ColumnRole::SocialPlatform,
        ColumnRole::BingeFrequency,
        ColumnRole::ScreenTime,
        ColumnRole::GamingDays,
    ];

    /// Roles encoded as categorical features.
    pub const CATEGORICAL: [ColumnRole; 5] = [
        ColumnRole::Ott,
        ColumnRole::Genre,
        ColumnRole::Language,
        ColumnRole::GamingPlatform,
        ColumnRole::SocialPlatform,
    ];

    /// Roles parsed as numeric features.
    pub const NUMERIC: [ColumnRole; 3] = [
        ColumnRole::BingeFrequency,
        ColumnRole::ScreenTime,
        ColumnRole::GamingDays,
    ];

    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Identity => RoleKind::Identity,
            Self::Ott
            | Self::Genre
            | Self::Language
            | Self::GamingPlatform
            | Self::SocialPlatform => RoleKind::Categorical,
            Self::BingeFrequency | Self::ScreenTime | Self::GamingDays => RoleKind::Numeric,
        }
    }

    /// Snake-case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Ott => "ott",
            Self::Genre => "genre",
            Self::Language => "language",
            Self::GamingPlatform => "gaming_platform",
            Self::SocialPlatform => "social_platform",
            Self::BingeFrequency => "binge_frequency",
            Self::ScreenTime => "screen_time",
            Self::GamingDays => "gaming_days",
        }
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from semantic roles to the columns that carry them.
///
/// The identity role is always present: when no column matches, the detector
/// synthesizes one and records that fact here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoleMap {
    identity: String,
    identity_synthesized: bool,
    features: BTreeMap<ColumnRole, String>,
}

impl ColumnRoleMap {
    pub fn new(identity: impl Into<String>, identity_synthesized: bool) -> Self {
        Self {
            identity: identity.into(),
            identity_synthesized,
            features: BTreeMap::new(),
        }
    }

    /// Record the column carrying a feature role. Identity is set at construction.
    pub fn insert(&mut self, role: ColumnRole, column: impl Into<String>) {
        debug_assert!(role != ColumnRole::Identity);
        self.features.insert(role, column.into());
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_identity_synthesized(&self) -> bool {
        self.identity_synthesized
    }

    /// Column mapped to `role`, or `None` when the role is absent.
    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        match role {
            ColumnRole::Identity => Some(&self.identity),
            _ => self.features.get(&role).map(String::as_str),
        }
    }

    /// Present categorical roles with their columns, in role order.
    pub fn categorical(&self) -> Vec<(ColumnRole, &str)> {
        self.features_of(RoleKind::Categorical)
    }

    /// Present numeric roles with their columns, in role order.
    pub fn numeric(&self) -> Vec<(ColumnRole, &str)> {
        self.features_of(RoleKind::Numeric)
    }

    /// Number of feature roles that resolved to a column.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn features_of(&self, kind: RoleKind) -> Vec<(ColumnRole, &str)> {
        self.features
            .iter()
            .filter(|(role, _)| role.kind() == kind)
            .map(|(role, column)| (*role, column.as_str()))
            .collect()
    }
}

/// Serialized as an object with one key per role; absent roles are `null`.
impl Serialize for ColumnRoleMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(ColumnRole::ALL.len()))?;
        for role in ColumnRole::ALL {
            map.serialize_entry(role.as_str(), &self.get(role))?;
        }
        map.end()
    }
}

// ============================================================================
// Feature Matrix
// ============================================================================

/// Row-major numeric matrix with named feature columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix from named columns of equal length.
    ///
    /// Returns `None` when column lengths disagree or the names do not match
    /// the column count.
    pub fn from_columns(feature_names: Vec<String>, columns: Vec<Vec<f64>>) -> Option<Self> {
        if feature_names.len() != columns.len() {
            return None;
        }
        let n_rows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != n_rows) {
            return None;
        }

        let rows = (0..n_rows)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();

        Some(Self {
            feature_names,
            rows,
        })
    }

    /// Build a matrix directly from rows.
    pub fn from_rows(feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Option<Self> {
        if rows.iter().any(|r| r.len() != feature_names.len()) {
            return None;
        }
        Some(Self {
            feature_names,
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Copy out one feature column.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }

    /// True when every cell is a finite number.
    pub fn is_finite(&self) -> bool {
        self.rows.iter().flatten().all(|v| v.is_finite())
    }
}

// ============================================================================
// Clustering Outputs
// ============================================================================

/// One trial of the k sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRun {
    pub k: usize,
    pub inertia: f64,
}

/// The elbow curve as two parallel sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElbowCurve {
    pub k_values: Vec<usize>,
    pub inertias: Vec<f64>,
}

impl From<&[TrialRun]> for ElbowCurve {
    fn from(trials: &[TrialRun]) -> Self {
        Self {
            k_values: trials.iter().map(|t| t.k).collect(),
            inertias: trials.iter().map(|t| t.inertia).collect(),
        }
    }
}

/// Final partition: one cluster id per row plus the fitted centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub labels: Vec<usize>,
    pub(crate) centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

impl ClusterAssignment {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Member count per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Partition quality scores, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionMetrics {
    /// Cohesion/separation index in [-1, 1]; higher is better.
    pub silhouette_score: f64,
    /// Dispersion index, at least 0; lower is better.
    pub davies_bouldin_index: f64,
}

/// A row placed on the 2-D projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub x: f64,
    pub y: f64,
    pub cluster_id: usize,
}

/// Identities grouped per cluster, in ascending cluster order.
///
/// Serialized as a JSON object whose key order follows cluster ids, so
/// `"Cluster 10"` comes after `"Cluster 9"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterGroups(Vec<(String, Vec<String>)>);

impl ClusterGroups {
    pub(crate) fn push(&mut self, label: String, members: Vec<String>) {
        self.0.push((label, members));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Members of the cluster with the given label (e.g. `"Cluster 0"`).
    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, members)| members.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(l, m)| (l.as_str(), m.as_slice()))
    }

    /// Total number of identities across all groups.
    pub fn total_members(&self) -> usize {
        self.0.iter().map(|(_, m)| m.len()).sum()
    }
}

impl Serialize for ClusterGroups {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, members) in &self.0 {
            map.serialize_entry(label, members)?;
        }
        map.end()
    }
}

/// Bookkeeping about one run, for display and audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// Encoding that decoded the input.
    pub encoding: TextEncoding,
    /// Data rows parsed before cleaning.
    pub rows_read: usize,
    /// Rows removed by the schema normalizer.
    pub rows_dropped: usize,
    /// Feature roles in matrix order.
    pub features: Vec<String>,
    /// Whether identities were generated because no identity column matched.
    pub identity_synthesized: bool,
}

/// What a dry run learns about a table without clustering it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInspection {
    pub encoding: TextEncoding,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub total_rows: usize,
    /// Columns after header cleaning, including a generated identity column.
    pub columns: Vec<String>,
    pub column_roles: ColumnRoleMap,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult {
    pub num_clusters: usize,
    pub clusters: ClusterGroups,
    pub metrics: PartitionMetrics,
    pub total_rows: usize,
    /// `None` when the projection could not be computed.
    pub projection: Option<Vec<ProjectionPoint>>,
    pub elbow_curve: ElbowCurve,
    pub column_roles: ColumnRoleMap,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_kinds() {
        assert_eq!(ColumnRole::Identity.kind(), RoleKind::Identity);
        assert!(ColumnRole::CATEGORICAL.iter().all(|r| r.kind() == RoleKind::Categorical));
        assert!(ColumnRole::NUMERIC.iter().all(|r| r.kind() == RoleKind::Numeric));
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&ColumnRole::GamingPlatform).unwrap();
        assert_eq!(json, "\"gaming_platform\"");
        assert_eq!(ColumnRole::GamingPlatform.as_str(), "gaming_platform");
    }

    #[test]
    fn test_role_map_orders_features_by_role() {
        let mut map = ColumnRoleMap::new("name", false);
        map.insert(ColumnRole::ScreenTime, "Screen");
        map.insert(ColumnRole::Genre, "Genre");
        map.insert(ColumnRole::Ott, "OTT");

        assert_eq!(
            map.categorical(),
            vec![(ColumnRole::Ott, "OTT"), (ColumnRole::Genre, "Genre")]
        );
        assert_eq!(map.numeric(), vec![(ColumnRole::ScreenTime, "Screen")]);
        assert_eq!(map.feature_count(), 3);
        assert_eq!(map.get(ColumnRole::Language), None);
        assert_eq!(map.get(ColumnRole::Identity), Some("name"));
    }

    #[test]
    fn test_role_map_serializes_absent_as_null() {
        let mut map = ColumnRoleMap::new("name", false);
        map.insert(ColumnRole::Ott, "OTT_Top1");
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["identity"], "name");
        assert_eq!(json["ott"], "OTT_Top1");
        assert!(json["genre"].is_null());
    }

    #[test]
    fn test_feature_matrix_from_columns() {
        let m = FeatureMatrix::from_columns(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_features(), 2);
        assert_eq!(m.row(1), &[2.0, 5.0]);
        assert_eq!(m.column(1), vec![4.0, 5.0, 6.0]);
        assert!(m.is_finite());
    }

    #[test]
    fn test_feature_matrix_rejects_ragged_columns() {
        let m = FeatureMatrix::from_columns(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![4.0]],
        );
        assert!(m.is_none());
    }

    #[test]
    fn test_cluster_groups_keep_numeric_order() {
        let mut groups = ClusterGroups::default();
        for id in [0, 1, 2, 10] {
            groups.push(format!("Cluster {}", id), vec![format!("p{}", id)]);
        }
        let json = serde_json::to_string(&groups).unwrap();
        let pos_2 = json.find("Cluster 2").unwrap();
        let pos_10 = json.find("Cluster 10").unwrap();
        assert!(pos_2 < pos_10);
        assert_eq!(groups.total_members(), 4);
        assert_eq!(groups.get("Cluster 10"), Some(&["p10".to_string()][..]));
    }

    #[test]
    fn test_cluster_sizes() {
        let assignment = ClusterAssignment {
            labels: vec![0, 1, 1, 2, 1],
            centroids: vec![vec![0.0], vec![1.0], vec![2.0]],
            inertia: 0.0,
        };
        assert_eq!(assignment.k(), 3);
        assert_eq!(assignment.cluster_sizes(), vec![1, 3, 1]);
    }
}
