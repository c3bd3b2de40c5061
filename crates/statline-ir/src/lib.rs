//! Statline Intermediate Representation (IR)
//!
//! Shared vocabulary between the catalog, the engine and the transport:
//! cell values, owned columnar tables, dataset selectors, query criteria and
//! the response shape. Everything here serializes with serde.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod catalog;
mod table;
mod types;

pub use catalog::{MemoryCatalog, SourceTable, TableCatalog};
pub use table::{fact_columns, Column, FactRow, Table, WideRow};
pub use types::*;

/// Default row bound when the caller gives none
pub const DEFAULT_LIMIT: usize = 100;
/// Hard ceiling on returned rows
pub const MAX_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum IrError {
    #[error("Unsupported dataset: {0}")]
    InvalidDataset(String),

    #[error("Column {column} has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Logical datasets a caller can query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Player,
    Team,
    ReceivingEfficiency,
    QuarterbackEfficiency,
    SnapCounts,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Player,
        DatasetKind::Team,
        DatasetKind::ReceivingEfficiency,
        DatasetKind::QuarterbackEfficiency,
        DatasetKind::SnapCounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Player => "player",
            DatasetKind::Team => "team",
            DatasetKind::ReceivingEfficiency => "receiving_efficiency",
            DatasetKind::QuarterbackEfficiency => "quarterback_efficiency",
            DatasetKind::SnapCounts => "snap_counts",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = IrError;

    /// Accepts snake_case or kebab-case, any letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| IrError::InvalidDataset(s.to_string()))
    }
}

fn default_descending() -> bool {
    true
}

/// Loose filter criteria for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCriteria {
    pub dataset: DatasetKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// Case-insensitive substring of the player name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    #[serde(default = "default_descending")]
    pub descending: bool,
}

impl QueryCriteria {
    pub fn new(dataset: DatasetKind) -> Self {
        Self {
            dataset,
            season: None,
            week: None,
            team: None,
            player: None,
            limit: None,
            sort: None,
            descending: true,
        }
    }

    pub fn season(mut self, season: i64) -> Self {
        self.season = Some(season);
        self
    }

    pub fn week(mut self, week: i64) -> Self {
        self.week = Some(week);
        self
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.sort = Some(column.into());
        self.descending = descending;
        self
    }

    /// Requested limit clamped into `[1, MAX_LIMIT]`, `DEFAULT_LIMIT` when absent.
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            None => DEFAULT_LIMIT,
            Some(limit) => limit.clamp(1, MAX_LIMIT as i64) as usize,
        }
    }

    /// Blank strings count as "no filter".
    pub fn team_filter(&self) -> Option<&str> {
        self.team.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn player_filter(&self) -> Option<&str> {
        self.player.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// SHA-256 over the canonical JSON form, for log correlation
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Criteria actually applied to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersEcho {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FiltersEcho {
    /// Echo of the requested filters, before sorting has been decided.
    pub fn requested(criteria: &QueryCriteria) -> Self {
        Self {
            season: criteria.season,
            week: criteria.week,
            team: criteria.team_filter().map(str::to_string),
            player: criteria.player_filter().map(str::to_string),
            sort: criteria.sort.clone(),
            descending: None,
            limit: None,
        }
    }
}

/// Filter vocabulary observed in one dataset's unfiltered table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub seasons: Vec<i64>,
    pub weeks: Vec<i64>,
    pub teams: Vec<String>,
}

/// Dataset name → metadata
pub type MetadataMap = BTreeMap<String, DatasetMetadata>;

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub dataset: DatasetKind,
    pub columns: Vec<String>,
    pub rows: Vec<WideRow>,
    pub filters: FiltersEcho,
    pub metadata: MetadataMap,
}

impl QueryResponse {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_parse() {
        assert_eq!("player".parse::<DatasetKind>().unwrap(), DatasetKind::Player);
        assert_eq!(
            "Receiving-Efficiency".parse::<DatasetKind>().unwrap(),
            DatasetKind::ReceivingEfficiency
        );
        assert!(matches!(
            "props".parse::<DatasetKind>(),
            Err(IrError::InvalidDataset(name)) if name == "props"
        ));
    }

    #[test]
    fn test_limit_clamp() {
        let criteria = QueryCriteria::new(DatasetKind::Player);
        assert_eq!(criteria.effective_limit(), DEFAULT_LIMIT);
        assert_eq!(criteria.clone().limit(0).effective_limit(), 1);
        assert_eq!(criteria.clone().limit(-5).effective_limit(), 1);
        assert_eq!(criteria.clone().limit(10_000).effective_limit(), MAX_LIMIT);
        assert_eq!(criteria.limit(42).effective_limit(), 42);
    }

    #[test]
    fn test_criteria_json_defaults() {
        let criteria: QueryCriteria = serde_json::from_str(r#"{"dataset":"snap_counts","week":3}"#).unwrap();
        assert_eq!(criteria.dataset, DatasetKind::SnapCounts);
        assert_eq!(criteria.week, Some(3));
        assert!(criteria.descending);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = QueryCriteria::new(DatasetKind::Team).season(2024).team("KC");
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), a.clone().week(1).fingerprint());
    }

    #[test]
    fn test_filters_echo_omits_nulls() {
        let criteria = QueryCriteria::new(DatasetKind::Player).season(2024).team("  ");
        let json = serde_json::to_value(FiltersEcho::requested(&criteria)).unwrap();
        assert_eq!(json, serde_json::json!({"season": 2024}));
    }
}
