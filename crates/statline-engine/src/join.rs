//! Identity-join stage
//!
//! Supplemental tables come from independent feeds that spell player names
//! differently. Both sides of every join go through [`identity_key`], and
//! joins are always left-outer on the primary table.

use statline_ir::{Table, Value, ValueKey};
use std::collections::HashMap;
use tracing::debug;

/// Join key for a player name: ASCII letters and whitespace only,
/// lower-cased, trimmed.
pub fn identity_key(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    kept.to_lowercase().trim().to_string()
}

fn value_identity_key(value: &Value) -> String {
    value.as_text().map(|t| identity_key(&t)).unwrap_or_default()
}

/// How to line up a supplemental table with the primary one.
#[derive(Debug, Clone)]
pub struct JoinSpec<'a> {
    /// Player-name column on the primary table
    pub primary_name: &'a str,
    /// Player-name column on the supplemental table
    pub supplement_name: &'a str,
    /// Extra equality columns present on both sides
    pub on: &'a [String],
    /// Supplemental columns to carry over
    pub carry: &'a [String],
    /// Appended to carried columns whose name already exists on the primary
    pub suffix: &'a str,
}

type JoinKey = (String, Vec<ValueKey>);

fn join_key(table: &Table, name_column: &str, on: &[String], row: usize) -> JoinKey {
    let name = table
        .cell(name_column, row)
        .map(value_identity_key)
        .unwrap_or_default();
    let extra = on
        .iter()
        .map(|col| table.cell(col, row).map(Value::key).unwrap_or(ValueKey::Null))
        .collect();
    (name, extra)
}

/// Left-outer join. Every primary row survives; a primary row with several
/// matches is repeated once per match, in supplemental order.
pub fn left_join(primary: &Table, supplement: &Table, plan: &JoinSpec<'_>) -> Table {
    let carry: Vec<&String> = plan
        .carry
        .iter()
        .filter(|c| supplement.has_column(c))
        .collect();

    // Identical supplemental rows would otherwise fan out the primary
    let mut projected_names: Vec<&str> = vec![plan.supplement_name];
    projected_names.extend(plan.on.iter().map(String::as_str));
    projected_names.extend(carry.iter().map(|c| c.as_str()));
    let deduped = supplement.select(&projected_names).distinct_rows();

    let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for row in 0..deduped.num_rows() {
        index
            .entry(join_key(&deduped, plan.supplement_name, plan.on, row))
            .or_default()
            .push(row);
    }

    let mut primary_rows = Vec::with_capacity(primary.num_rows());
    let mut supplement_rows: Vec<Option<usize>> = Vec::with_capacity(primary.num_rows());
    let mut matched = 0usize;
    for row in 0..primary.num_rows() {
        match index.get(&join_key(primary, plan.primary_name, plan.on, row)) {
            Some(hits) => {
                matched += 1;
                for &hit in hits {
                    primary_rows.push(row);
                    supplement_rows.push(Some(hit));
                }
            }
            None => {
                primary_rows.push(row);
                supplement_rows.push(None);
            }
        }
    }

    let mut joined = primary.take(&primary_rows);
    for name in carry {
        let Some(source) = deduped.values(name) else {
            continue;
        };
        let values = supplement_rows
            .iter()
            .map(|hit| hit.map(|i| source[i].clone()).unwrap_or(Value::Null))
            .collect();
        let output = if primary.has_column(name) {
            format!("{}{}", name, plan.suffix)
        } else {
            name.clone()
        };
        joined.set_column(output, values);
    }

    debug!(
        primary_rows = primary.num_rows(),
        matched,
        output_rows = joined.num_rows(),
        "Joined supplemental table"
    );
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_strips_punctuation_and_case() {
        assert_eq!(identity_key("O'Dell Jr."), identity_key("odell jr"));
        assert_eq!(identity_key("  A.J. Brown "), "aj brown");
        assert_eq!(identity_key("Amon-Ra St. Brown"), "amonra st brown");
    }

    #[test]
    fn test_identity_key_is_idempotent() {
        for name in ["D'Andre Swift", "Ja'Marr Chase III", "Jose\u{301} Cruz", ""] {
            let once = identity_key(name);
            assert_eq!(identity_key(&once), once);
        }
    }

    #[test]
    fn test_combining_marks_are_stripped() {
        assert_eq!(identity_key("Jose\u{301}"), "jose");
    }

    fn primary() -> Table {
        Table::from_rows(
            &["player_name", "season", "targets"],
            vec![
                vec!["Ja'Marr Chase".into(), Value::Int(2024), Value::Int(10)],
                vec!["Nobody Here".into(), Value::Int(2024), Value::Int(3)],
                vec!["Ja'Marr Chase".into(), Value::Int(2023), Value::Int(8)],
            ],
        )
        .unwrap()
    }

    fn supplement() -> Table {
        Table::from_rows(
            &["player_name", "season", "ngs_avg_separation", "targets"],
            vec![
                vec!["JaMarr Chase".into(), Value::Float(2024.0), Value::Float(3.1), Value::Int(99)],
                vec!["JaMarr Chase".into(), Value::Float(2024.0), Value::Float(3.1), Value::Int(99)],
                vec!["JaMarr Chase".into(), Value::Int(2022), Value::Float(2.5), Value::Int(50)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let on = vec!["season".to_string()];
        let carry = vec!["ngs_avg_separation".to_string(), "targets".to_string()];
        let joined = left_join(
            &primary(),
            &supplement(),
            &JoinSpec {
                primary_name: "player_name",
                supplement_name: "player_name",
                on: &on,
                carry: &carry,
                suffix: "_ngs",
            },
        );

        assert_eq!(joined.num_rows(), 3);
        assert_eq!(
            joined.column_names(),
            vec!["player_name", "season", "targets", "ngs_avg_separation", "targets_ngs"]
        );
        assert_eq!(joined.cell("ngs_avg_separation", 0), Some(&Value::Float(3.1)));
        assert_eq!(joined.cell("targets_ngs", 0), Some(&Value::Int(99)));
        assert_eq!(joined.cell("ngs_avg_separation", 1), Some(&Value::Null));
        // season differs, so no match across periods
        assert_eq!(joined.cell("ngs_avg_separation", 2), Some(&Value::Null));
    }

    #[test]
    fn test_identity_only_join_fans_out() {
        let carry = vec!["ngs_avg_separation".to_string()];
        let joined = left_join(
            &primary(),
            &supplement(),
            &JoinSpec {
                primary_name: "player_name",
                supplement_name: "player_name",
                on: &[],
                carry: &carry,
                suffix: "_ngs",
            },
        );
        // two distinct supplemental rows per Chase row, one null row for the other
        assert_eq!(joined.num_rows(), 5);
        assert_eq!(joined.cell("player_name", 2), Some(&Value::text("Nobody Here")));
        assert_eq!(joined.cell("ngs_avg_separation", 2), Some(&Value::Null));
    }
}
