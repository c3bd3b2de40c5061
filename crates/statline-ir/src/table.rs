//! Owned columnar tables
//!
//! Column sets are decided at query time, so a table is an ordered list of
//! named columns that all share one row count. Every transform returns a new
//! table; nothing is shared between stages.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

use crate::{IrError, Value, ValueKey};

/// Column names of the long-format fact table.
pub mod fact_columns {
    pub const PLAYER_NAME: &str = "player_name";
    pub const SEASON: &str = "season";
    pub const WEEK: &str = "week";
    pub const TEAM: &str = "team";
    pub const OPPONENT: &str = "opponent";
    pub const STAT_CATEGORY: &str = "stat_category";
    pub const STAT_VALUE: &str = "stat_value";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// True when every non-null cell is a number.
    pub fn is_numeric(&self) -> bool {
        self.values
            .iter()
            .all(|v| matches!(v, Value::Null | Value::Int(_) | Value::Float(_)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self, IrError> {
        let num_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != num_rows) {
            return Err(IrError::ColumnLength {
                column: bad.name.clone(),
                expected: num_rows,
                actual: bad.values.len(),
            });
        }
        Ok(Self { columns, num_rows })
    }

    /// Build a table from row-major data.
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<Value>>) -> Result<Self, IrError> {
        let mut columns: Vec<Column> = names
            .iter()
            .map(|n| Column::new(n.as_ref(), Vec::with_capacity(rows.len())))
            .collect();

        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(IrError::RowWidth {
                    row: idx,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Self::from_columns(columns)
    }

    /// Build the long-format fact table. Rows with a non-finite value are dropped.
    pub fn from_facts(facts: &[FactRow]) -> Self {
        use fact_columns::*;

        let kept: Vec<&FactRow> = facts.iter().filter(|f| f.stat_value.is_finite()).collect();
        let columns = vec![
            Column::new(PLAYER_NAME, kept.iter().map(|f| Value::text(&f.entity_key)).collect()),
            Column::new(SEASON, kept.iter().map(|f| Value::Int(f.season)).collect()),
            Column::new(WEEK, kept.iter().map(|f| Value::from(f.week)).collect()),
            Column::new(TEAM, kept.iter().map(|f| Value::from(f.team.clone())).collect()),
            Column::new(OPPONENT, kept.iter().map(|f| Value::from(f.opponent.clone())).collect()),
            Column::new(STAT_CATEGORY, kept.iter().map(|f| Value::text(&f.stat_category)).collect()),
            Column::new(STAT_VALUE, kept.iter().map(|f| Value::Float(f.stat_value)).collect()),
        ];

        Self {
            columns,
            num_rows: kept.len(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// A table without rows counts as empty even if it still carries columns.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// First column with this name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn values(&self, name: &str) -> Option<&[Value]> {
        self.column(name).map(|c| c.values.as_slice())
    }

    /// Resolve a logical field: the first candidate name present in this table.
    pub fn first_present<'c, S: AsRef<str>>(&self, candidates: &'c [S]) -> Option<&'c str> {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|name| self.has_column(name))
    }

    /// Insert or replace a column.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        let name = name.into();
        if self.columns.is_empty() {
            self.num_rows = values.len();
        }
        debug_assert_eq!(values.len(), self.num_rows, "column {name} has wrong length");

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
    }

    /// Apply `f` to every cell of a column; missing columns are ignored.
    pub fn map_column(&mut self, name: &str, f: impl Fn(&Value) -> Value) {
        if let Some(column) = self.columns.iter_mut().find(|c| c.name == name) {
            for value in column.values.iter_mut() {
                *value = f(value);
            }
        }
    }

    /// Rename every column called `from`. May produce duplicate names; see
    /// [`Table::dedupe_columns`].
    pub fn rename_column(&mut self, from: &str, to: &str) {
        for column in self.columns.iter_mut().filter(|c| c.name == from) {
            column.name = to.to_string();
        }
    }

    /// Keep the named columns that exist, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let columns: Vec<Column> = names
            .iter()
            .filter_map(|n| self.column(n.as_ref()).cloned())
            .collect();
        let num_rows = if columns.is_empty() { 0 } else { self.num_rows };
        Table { columns, num_rows }
    }

    /// Keep rows whose mask entry is true.
    pub fn filter(&self, mask: &[bool]) -> Table {
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        self.take(&indices)
    }

    /// Gather rows by index, in the order given.
    pub fn take(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Table {
            columns,
            num_rows: indices.len(),
        }
    }

    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..self.num_rows.min(n)).collect();
        self.take(&indices)
    }

    /// Drop repeated column names, keeping the first occurrence.
    pub fn dedupe_columns(mut self) -> Table {
        let mut seen = HashSet::new();
        self.columns.retain(|c| seen.insert(c.name.clone()));
        self
    }

    /// Drop rows that repeat an earlier row exactly.
    pub fn distinct_rows(&self) -> Table {
        let mut seen = HashSet::new();
        let indices: Vec<usize> = (0..self.num_rows)
            .filter(|&i| seen.insert(self.row_key(i)))
            .collect();
        self.take(&indices)
    }

    pub fn row_key(&self, row: usize) -> Vec<ValueKey> {
        self.columns.iter().map(|c| c.values[row].key()).collect()
    }

    pub fn cell(&self, column: &str, row: usize) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Convert to response rows, all sharing this table's column order.
    pub fn into_rows(self) -> Vec<WideRow> {
        let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let mut iters: Vec<_> = self.columns.into_iter().map(|c| c.values.into_iter()).collect();

        (0..self.num_rows)
            .map(|_| {
                let cells = names
                    .iter()
                    .zip(iters.iter_mut())
                    .map(|(name, values)| (name.clone(), values.next().unwrap_or(Value::Null)))
                    .collect();
                WideRow(cells)
            })
            .collect()
    }
}

/// One observation in long format
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub entity_key: String,
    pub season: i64,
    pub week: Option<i64>,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub stat_category: String,
    pub stat_value: f64,
}

impl FactRow {
    pub fn new(entity_key: impl Into<String>, season: i64, stat_category: impl Into<String>, stat_value: f64) -> Self {
        Self {
            entity_key: entity_key.into(),
            season,
            week: None,
            team: None,
            opponent: None,
            stat_category: stat_category.into(),
            stat_value,
        }
    }

    pub fn week(mut self, week: i64) -> Self {
        self.week = Some(week);
        self
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn opponent(mut self, opponent: impl Into<String>) -> Self {
        self.opponent = Some(opponent.into());
        self
    }
}

/// A response row: column name → value, in table column order.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow(pub Vec<(String, Value)>);

impl WideRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for WideRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            &["player_name", "team", "yards"],
            vec![
                vec!["A".into(), "KC".into(), Value::Int(10)],
                vec!["B".into(), "BUF".into(), Value::Int(20)],
                vec!["A".into(), "KC".into(), Value::Int(10)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let err = Table::from_rows(&["a", "b"], vec![vec![Value::Int(1)]]).unwrap_err();
        assert!(matches!(err, IrError::RowWidth { row: 0, expected: 2, actual: 1 }));
    }

    #[test]
    fn test_first_present_uses_candidate_order() {
        let table = sample();
        let candidates = ["posteam", "team", "player_name"];
        assert_eq!(table.first_present(&candidates), Some("team"));
        assert_eq!(table.first_present(&["team_abbr"]), None);
    }

    #[test]
    fn test_select_skips_missing_columns() {
        let table = sample().select(&["yards", "missing", "player_name"]);
        assert_eq!(table.column_names(), vec!["yards", "player_name"]);
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn test_dedupe_keeps_first_column() {
        let mut table = sample();
        table.rename_column("player_name", "team");
        let table = table.dedupe_columns();
        assert_eq!(table.column_names(), vec!["team", "yards"]);
        assert_eq!(table.cell("team", 1), Some(&Value::text("B")));
    }

    #[test]
    fn test_distinct_rows() {
        assert_eq!(sample().distinct_rows().num_rows(), 2);
    }

    #[test]
    fn test_from_facts_drops_non_finite_values() {
        let facts = vec![
            FactRow::new("A", 2024, "receptions", 8.0).week(1),
            FactRow::new("A", 2024, "receiving_yards", f64::NAN).week(1),
        ];
        let table = Table::from_facts(&facts);
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.cell("week", 0), Some(&Value::Int(1)));
        assert_eq!(table.cell("team", 0), Some(&Value::Null));
    }

    #[test]
    fn test_rows_keep_column_order() {
        let rows = sample().head(1).into_rows();
        let json = serde_json::to_string(&rows[0]).unwrap();
        assert_eq!(json, r#"{"player_name":"A","team":"KC","yards":10}"#);
    }
}
