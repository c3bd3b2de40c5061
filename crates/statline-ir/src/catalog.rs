//! Table catalog contract
//!
//! The storage layer lives outside the engine. It hands out whole source
//! tables and never fails for a missing table: absence is an empty table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::Table;

/// Raw tables the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    /// Long-format weekly player facts
    PlayerStats,
    TeamStats,
    /// Next Gen Stats receiving
    NgsReceiving,
    /// Pro Football Reference advanced receiving
    PfrReceiving,
    EspnQbr,
    SnapCounts,
}

impl SourceTable {
    pub const ALL: [SourceTable; 6] = [
        SourceTable::PlayerStats,
        SourceTable::TeamStats,
        SourceTable::NgsReceiving,
        SourceTable::PfrReceiving,
        SourceTable::EspnQbr,
        SourceTable::SnapCounts,
    ];

    /// Storage name, also the Parquet file stem.
    pub fn name(&self) -> &'static str {
        match self {
            SourceTable::PlayerStats => "player_stats",
            SourceTable::TeamStats => "team_stats",
            SourceTable::NgsReceiving => "ngs_receiving",
            SourceTable::PfrReceiving => "pfr_receiving",
            SourceTable::EspnQbr => "espn_qbr",
            SourceTable::SnapCounts => "snap_counts",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for fetching the current snapshot of a source table
pub trait TableCatalog: Send + Sync {
    /// Full current table, or an empty table if the source is absent.
    fn load(&self, source: SourceTable) -> Table;

    fn player_stats(&self) -> Table {
        self.load(SourceTable::PlayerStats)
    }

    fn team_stats(&self) -> Table {
        self.load(SourceTable::TeamStats)
    }

    fn ngs_receiving(&self) -> Table {
        self.load(SourceTable::NgsReceiving)
    }

    fn pfr_receiving(&self) -> Table {
        self.load(SourceTable::PfrReceiving)
    }

    fn espn_qbr(&self) -> Table {
        self.load(SourceTable::EspnQbr)
    }

    fn snap_counts(&self) -> Table {
        self.load(SourceTable::SnapCounts)
    }
}

/// In-memory catalog for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: HashMap<SourceTable, Table>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, source: SourceTable, table: Table) -> Self {
        self.insert(source, table);
        self
    }

    pub fn insert(&mut self, source: SourceTable, table: Table) {
        self.tables.insert(source, table);
    }
}

impl TableCatalog for MemoryCatalog {
    fn load(&self, source: SourceTable) -> Table {
        self.tables.get(&source).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_missing_table_is_empty() {
        let catalog = MemoryCatalog::new();
        let table = catalog.snap_counts();
        assert!(table.is_empty());
        assert_eq!(table.num_columns(), 0);
    }

    #[test]
    fn test_accessors_route_to_source() {
        let qbr = Table::from_rows(&["player_name"], vec![vec![Value::text("QB One")]]).unwrap();
        let catalog = MemoryCatalog::new().with_table(SourceTable::EspnQbr, qbr.clone());
        assert_eq!(catalog.espn_qbr(), qbr);
        assert!(catalog.player_stats().is_empty());
    }
}
