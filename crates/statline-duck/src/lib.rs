//! DuckDB-backed table catalog
//!
//! Each source table is one Parquet file in a data directory, read whole
//! through an in-memory DuckDB connection.

use duckdb::types::ValueRef;
use duckdb::{Connection, Result as DuckResult};
use statline_ir::{Column, SourceTable, Table, TableCatalog, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Malformed table {source_table}: {message}")]
    Malformed {
        source_table: SourceTable,
        message: String,
    },
}

/// Reads `<data_dir>/<source>.parquet` on every load.
#[derive(Debug, Clone)]
pub struct DuckCatalog {
    data_dir: PathBuf,
}

impl DuckCatalog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, source: SourceTable) -> PathBuf {
        self.data_dir.join(format!("{}.parquet", source.name()))
    }

    /// Load a source table, surfacing read failures. A missing file is an
    /// empty table, not an error.
    pub fn try_load(&self, source: SourceTable) -> Result<Table, CatalogError> {
        let path = self.path_for(source);
        if !path.exists() {
            debug!(source = %source, path = %path.display(), "Source file absent");
            return Ok(Table::empty());
        }

        let conn = Connection::open_in_memory()?;
        let table = read_parquet(&conn, source, &path)?;

        debug!(
            source = %source,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Loaded source table"
        );
        Ok(table)
    }
}

impl TableCatalog for DuckCatalog {
    fn load(&self, source: SourceTable) -> Table {
        match self.try_load(source) {
            Ok(table) => table,
            Err(e) => {
                warn!(source = %source, error = %e, "Failed to read source table");
                Table::empty()
            }
        }
    }
}

fn parquet_scan(path: &Path) -> String {
    // Escape single quotes for the SQL string literal
    let escaped = path.to_string_lossy().replace('\'', "''");
    format!("read_parquet('{}')", escaped)
}

fn column_names(conn: &Connection, scan: &str) -> DuckResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("DESCRIBE SELECT * FROM {}", scan))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<DuckResult<Vec<_>>>()?;
    Ok(names)
}

/// Read a Parquet file into a [`Table`], converting every cell.
pub fn read_parquet(conn: &Connection, source: SourceTable, path: &Path) -> Result<Table, CatalogError> {
    let scan = parquet_scan(path);
    let names = column_names(conn, &scan)?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", scan))?;
    let mut rows = stmt.query([])?;

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    while let Some(row) = rows.next()? {
        for (idx, column) in values.iter_mut().enumerate() {
            column.push(convert_value(row.get_ref(idx)?));
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    Table::from_columns(columns).map_err(|e| CatalogError::Malformed {
        source_table: source,
        message: e.to_string(),
    })
}

/// DuckDB cell → table cell. Booleans become 0/1; types with no tabular
/// meaning here (blobs, nested values, temporal types) become null.
pub fn convert_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Int(b as i64),
        ValueRef::TinyInt(i) => Value::Int(i as i64),
        ValueRef::SmallInt(i) => Value::Int(i as i64),
        ValueRef::Int(i) => Value::Int(i as i64),
        ValueRef::BigInt(i) => Value::Int(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::float(i as f64)),
        ValueRef::UTinyInt(i) => Value::Int(i as i64),
        ValueRef::USmallInt(i) => Value::Int(i as i64),
        ValueRef::UInt(i) => Value::Int(i as i64),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::float(i as f64)),
        ValueRef::Float(f) => Value::float(f as f64),
        ValueRef::Double(f) => Value::float(f),
        ValueRef::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Value::float)
            .unwrap_or(Value::Null),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("statline-duck-{}", uuid::Uuid::new_v4()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn write_parquet(dir: &Path, source: SourceTable, select: &str) {
        let conn = Connection::open_in_memory().unwrap();
        let target = dir.join(format!("{}.parquet", source.name()));
        conn.execute_batch(&format!(
            "COPY ({}) TO '{}' (FORMAT PARQUET)",
            select,
            target.to_string_lossy().replace('\'', "''")
        ))
        .unwrap();
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new();
        let catalog = DuckCatalog::new(&dir.0);
        let table = catalog.try_load(SourceTable::EspnQbr).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.num_columns(), 0);
    }

    #[test]
    fn test_reads_parquet_columns_and_types() {
        let dir = TempDir::new();
        write_parquet(
            &dir.0,
            SourceTable::SnapCounts,
            "SELECT * FROM (VALUES \
                ('A', 2024::INTEGER, 1::BIGINT, 0.85::DOUBLE, true), \
                ('B', 2024::INTEGER, 2::BIGINT, NULL::DOUBLE, false)) \
             AS t(player, season, week, offense_pct, starter)",
        );

        let catalog = DuckCatalog::new(&dir.0);
        let table = catalog.snap_counts();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column_names(),
            vec!["player", "season", "week", "offense_pct", "starter"]
        );
        assert_eq!(table.cell("player", 0), Some(&Value::text("A")));
        assert_eq!(table.cell("season", 0), Some(&Value::Int(2024)));
        assert_eq!(table.cell("offense_pct", 0), Some(&Value::Float(0.85)));
        assert_eq!(table.cell("offense_pct", 1), Some(&Value::Null));
        assert_eq!(table.cell("starter", 1), Some(&Value::Int(0)));
    }

    #[test]
    fn test_unreadable_file_logs_and_returns_empty() {
        let dir = TempDir::new();
        let catalog = DuckCatalog::new(&dir.0);
        fs::write(catalog.path_for(SourceTable::TeamStats), b"not parquet").unwrap();

        assert!(catalog.try_load(SourceTable::TeamStats).is_err());
        assert!(catalog.team_stats().is_empty());
    }

    #[test]
    fn test_path_with_quote() {
        let dir = TempDir::new();
        let nested = dir.0.join("o'brien");
        fs::create_dir_all(&nested).unwrap();
        write_parquet(&nested, SourceTable::TeamStats, "SELECT 'KC' AS posteam, 31 AS points");

        let table = DuckCatalog::new(&nested).team_stats();
        assert_eq!(table.cell("posteam", 0), Some(&Value::text("KC")));
        assert_eq!(table.cell("points", 0), Some(&Value::Int(31)));
    }
}
