//! Filter stage
//!
//! Applies season/week/team/player predicates. Each predicate resolves its
//! column through the dataset's candidate list; when no candidate is present
//! the predicate is skipped rather than failing.

use statline_ir::{QueryCriteria, Table, Value};
use statline_registry::FieldCandidates;
use tracing::debug;

/// Rows matching every provided predicate.
pub fn apply_filters(table: &Table, criteria: &QueryCriteria, fields: &FieldCandidates) -> Table {
    if table.is_empty() {
        return table.clone();
    }

    let mut mask = vec![true; table.num_rows()];

    if let Some(season) = criteria.season {
        restrict(&mut mask, table, &fields.season, "season", |v| numeric_eq(v, season));
    }
    if let Some(week) = criteria.week {
        restrict(&mut mask, table, &fields.week, "week", |v| numeric_eq(v, week));
    }
    if let Some(team) = criteria.team_filter() {
        restrict(&mut mask, table, &fields.team, "team", |v| team_eq(v, team));
    }
    if let Some(player) = criteria.player_filter() {
        let needle = player.to_lowercase();
        restrict(&mut mask, table, &fields.player, "player", |v| name_contains(v, &needle));
    }

    let filtered = table.filter(&mask);
    debug!(
        rows_in = table.num_rows(),
        rows_out = filtered.num_rows(),
        "Applied filters"
    );
    filtered
}

fn restrict(
    mask: &mut [bool],
    table: &Table,
    candidates: &[String],
    field: &str,
    predicate: impl Fn(&Value) -> bool,
) {
    let Some(column) = table.first_present(candidates) else {
        debug!(field, "No column for predicate, skipping");
        return;
    };
    if let Some(values) = table.values(column) {
        for (keep, value) in mask.iter_mut().zip(values) {
            *keep = *keep && predicate(value);
        }
    }
}

/// Exact numeric equality; non-numeric cells never match.
pub fn numeric_eq(value: &Value, expected: i64) -> bool {
    value.as_f64().is_some_and(|v| v == expected as f64)
}

/// Case-insensitive exact match on a team code.
pub fn team_eq(value: &Value, team: &str) -> bool {
    value
        .as_text()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case(team))
}

/// Case-insensitive substring match; `needle` must already be lower-cased.
pub fn name_contains(value: &Value, needle: &str) -> bool {
    value
        .as_text()
        .is_some_and(|name| name.to_lowercase().contains(needle))
}
