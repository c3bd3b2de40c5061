//! Sort & bound stage

use statline_ir::{Table, Value};
use std::cmp::Ordering;
use tracing::debug;

/// Result of sorting and truncating a frame.
#[derive(Debug, Clone)]
pub struct SortOutcome {
    pub table: Table,
    /// Column actually sorted on, if any
    pub applied: Option<String>,
    pub descending: bool,
}

/// Order two non-null cells. Numbers (and numeric-looking text) compare
/// numerically and sort before other text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match (a.as_text(), b.as_text()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Float(f) => !f.is_finite(),
        _ => false,
    }
}

/// Compare for a sort where nulls always land last, whatever the direction.
pub fn compare_nulls_last(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (is_missing(a), is_missing(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare_values(a, b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Stable sort on one column. Missing columns leave the table untouched.
pub fn sort_by_column(table: &Table, column: &str, descending: bool) -> Table {
    let Some(values) = table.values(column) else {
        return table.clone();
    };
    let mut order: Vec<usize> = (0..table.num_rows()).collect();
    order.sort_by(|&a, &b| compare_nulls_last(&values[a], &values[b], descending));
    table.take(&order)
}

/// Sort by the requested column when it exists, otherwise by the first
/// present priority column (descending), otherwise keep input order; then
/// truncate to `limit`.
pub fn sort_and_bound(
    table: Table,
    requested: Option<&str>,
    descending: bool,
    priority: &[String],
    limit: usize,
) -> SortOutcome {
    let choice = match requested.filter(|col| table.has_column(col)) {
        Some(col) => Some((col.to_string(), descending)),
        None => table.first_present(priority).map(|col| (col.to_string(), true)),
    };

    let (sorted, applied, descending) = match choice {
        Some((column, desc)) => {
            let sorted = sort_by_column(&table, &column, desc);
            (sorted, Some(column), desc)
        }
        None => (table, None, descending),
    };

    debug!(
        sort = applied.as_deref().unwrap_or("<none>"),
        descending,
        rows = sorted.num_rows(),
        limit,
        "Sorted frame"
    );

    SortOutcome {
        table: sorted.head(limit),
        applied,
        descending,
    }
}
