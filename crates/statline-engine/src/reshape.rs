//! Long → wide pivot of fact rows

use statline_ir::{fact_columns, Column, Table, Value, ValueKey};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// How a pivot fills (group, category) combinations with no observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Counted stats: absence means a true zero
    Zero,
    /// Ratios and other non-additive stats
    Null,
}

impl FillPolicy {
    fn fill(&self) -> Value {
        match self {
            FillPolicy::Zero => Value::Float(0.0),
            FillPolicy::Null => Value::Null,
        }
    }
}

struct Group {
    first_row: usize,
    sums: HashMap<String, f64>,
}

/// Pivot `stat_category`/`stat_value` facts into one column per category.
///
/// Groups by whichever `index_candidates` exist with at least one non-null
/// value, summing repeated observations. Output rows follow ascending index
/// order (nulls last), category columns ascending by name after the index
/// columns. Facts whose value is not a finite number are dropped.
pub fn pivot_facts(table: &Table, index_candidates: &[String], fill: FillPolicy) -> Table {
    let (Some(categories), Some(values)) = (
        table.values(fact_columns::STAT_CATEGORY),
        table.values(fact_columns::STAT_VALUE),
    ) else {
        debug!("Fact table lacks stat_category/stat_value, nothing to pivot");
        return Table::empty();
    };

    let index: Vec<&str> = index_candidates
        .iter()
        .map(String::as_str)
        .filter(|c| {
            table
                .values(c)
                .is_some_and(|vals| vals.iter().any(|v| !v.is_null()))
        })
        .collect();

    let mut groups: BTreeMap<Vec<ValueKey>, Group> = BTreeMap::new();
    let mut seen_categories: BTreeSet<String> = BTreeSet::new();
    let mut dropped = 0usize;

    for row in 0..table.num_rows() {
        let (Some(category), Some(value)) = (categories[row].as_text(), values[row].as_f64()) else {
            dropped += 1;
            continue;
        };

        let key: Vec<ValueKey> = index
            .iter()
            .map(|col| table.cell(col, row).map(Value::key).unwrap_or(ValueKey::Null))
            .collect();
        let group = groups.entry(key).or_insert_with(|| Group {
            first_row: row,
            sums: HashMap::new(),
        });
        *group.sums.entry(category.to_string()).or_insert(0.0) += value;
        seen_categories.insert(category.into_owned());
    }

    let mut columns: Vec<Column> = index
        .iter()
        .map(|col| {
            let source = table.values(col).unwrap_or(&[]);
            Column::new(
                *col,
                groups.values().map(|g| source[g.first_row].clone()).collect(),
            )
        })
        .collect();

    for category in &seen_categories {
        let values = groups
            .values()
            .map(|g| {
                g.sums
                    .get(category)
                    .map(|sum| Value::float(*sum))
                    .unwrap_or_else(|| fill.fill())
            })
            .collect();
        columns.push(Column::new(category.clone(), values));
    }

    debug!(
        facts = table.num_rows(),
        dropped,
        groups = groups.len(),
        categories = seen_categories.len(),
        "Pivoted facts"
    );

    // Lengths all equal groups.len()
    Table::from_columns(columns).unwrap_or_default()
}
