//! Snap-count reshape
//!
//! Snap counts are the one genuinely time-series dataset. A request for a
//! specific week gets the per-player weekly rows; anything else is folded into
//! one row per player with a `wk_N` column per observed week.

use crate::enrich::round_to;
use crate::sort::{compare_nulls_last, sort_by_column};
use statline_ir::{Column, Table, Value, ValueKey};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Fractions at or below this are proportions and get rescaled to percent.
const PROPORTION_CEILING: f64 = 1.0;

/// Interpret `value` as a percentage: anything `<= 1` is a proportion.
pub fn normalize_pct(value: f64) -> f64 {
    if value <= PROPORTION_CEILING {
        value * 100.0
    } else {
        value
    }
}

/// Fixed one-decimal percentage label, e.g. `85.0%`.
pub fn pct_label(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Combined weekly cell: snap count over rounded percentage. Either half is
/// omitted when missing; both missing is the empty string.
pub fn snap_cell(snaps: Option<f64>, pct: Option<f64>) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(snaps) = snaps {
        parts.push(format!("{}", snaps.round() as i64));
    }
    if let Some(pct) = pct {
        parts.push(format!("{:.0}%", normalize_pct(pct)));
    }
    parts.join("\n")
}

fn is_pct_column(name: &str) -> bool {
    name.ends_with("_pct")
}

/// Coerce season, week and every `*_pct` / `*_snaps` column to numbers.
pub fn coerce_numeric(mut table: Table) -> Table {
    let targets: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|name| {
            matches!(*name, "season" | "week") || is_pct_column(name) || name.ends_with("_snaps")
        })
        .map(str::to_string)
        .collect();
    for name in targets {
        table.map_column(&name, Value::to_numeric);
    }
    table
}

/// Drop rows whose week is missing or not positive.
pub fn drop_placeholder_weeks(table: &Table) -> Table {
    let Some(weeks) = table.values("week") else {
        return table.clone();
    };
    let mask: Vec<bool> = weeks
        .iter()
        .map(|w| w.as_f64().is_some_and(|w| w >= 1.0))
        .collect();
    table.filter(&mask)
}

fn normalize_column(table: &mut Table, column: &str) {
    table.map_column(column, |v| {
        v.as_f64()
            .map(|f| Value::float(normalize_pct(f)))
            .unwrap_or(Value::Null)
    });
}

fn label_column(table: &mut Table, column: &str) {
    table.map_column(column, |v| {
        v.as_f64()
            .map(|f| Value::text(pct_label(f)))
            .unwrap_or(Value::Null)
    });
}

/// Single-week presentation: the preferred columns that exist, percentages
/// normalized, ordered by offense share, then rendered as labels.
pub fn weekly(table: &Table, preferred: &[String]) -> Table {
    let mut weekly = table.select(preferred);
    if weekly.num_columns() == 0 {
        return Table::empty();
    }

    let pct_columns: Vec<String> = weekly
        .column_names()
        .into_iter()
        .filter(|name| is_pct_column(name))
        .map(str::to_string)
        .collect();
    for column in &pct_columns {
        normalize_column(&mut weekly, column);
    }

    let mut weekly = sort_by_column(&weekly, "offense_pct", true);
    for column in &pct_columns {
        label_column(&mut weekly, column);
    }
    weekly
}

/// A played week counts its snaps from zero, so a row with only a
/// percentage still shows `0`.
#[derive(Default)]
struct WeekCell {
    snaps: f64,
    pct_sum: f64,
    pct_count: usize,
}

impl WeekCell {
    fn pct(&self) -> Option<f64> {
        (self.pct_count > 0).then(|| self.pct_sum / self.pct_count as f64)
    }
}

struct PlayerSeason {
    position: Value,
    player_name: Value,
    team: Value,
    total_snaps: f64,
    pct_sum: f64,
    pct_count: usize,
    weeks: BTreeMap<i64, WeekCell>,
}

/// Multi-week presentation: one row per (position, player) across every week
/// in `table`. Without `offense_snaps` and `offense_pct` the input is
/// returned unchanged.
pub fn multiweek(table: &Table) -> Table {
    let (Some(snaps), Some(pcts)) = (table.values("offense_snaps"), table.values("offense_pct")) else {
        debug!("Snap table lacks offense_snaps/offense_pct, skipping aggregation");
        return table.clone();
    };
    let has_position = table.has_column("position");

    let mut players: BTreeMap<Vec<ValueKey>, PlayerSeason> = BTreeMap::new();
    let mut all_weeks: BTreeSet<i64> = BTreeSet::new();

    for row in 0..table.num_rows() {
        let position = table.cell("position", row).cloned().unwrap_or(Value::Null);
        let player_name = table.cell("player_name", row).cloned().unwrap_or(Value::Null);
        let mut key = Vec::with_capacity(2);
        if has_position {
            key.push(position.key());
        }
        key.push(player_name.key());

        let entry = players.entry(key).or_insert_with(|| PlayerSeason {
            position,
            player_name,
            team: Value::Null,
            total_snaps: 0.0,
            pct_sum: 0.0,
            pct_count: 0,
            weeks: BTreeMap::new(),
        });

        if entry.team.is_null() {
            if let Some(team) = table.cell("team", row).filter(|t| !t.is_null()) {
                entry.team = team.clone();
            }
        }

        let snap = snaps[row].as_f64();
        let pct = pcts[row].as_f64();
        entry.total_snaps += snap.unwrap_or(0.0);
        if let Some(pct) = pct {
            entry.pct_sum += pct;
            entry.pct_count += 1;
        }

        if let Some(week) = table.cell("week", row).and_then(Value::as_i64) {
            all_weeks.insert(week);
            let cell = entry.weeks.entry(week).or_default();
            cell.snaps += snap.unwrap_or(0.0);
            if let Some(pct) = pct {
                cell.pct_sum += pct;
                cell.pct_count += 1;
            }
        }
    }

    let groups: Vec<&PlayerSeason> = players.values().collect();
    let mut columns: Vec<Column> = Vec::new();
    if has_position {
        columns.push(Column::new(
            "position",
            groups
                .iter()
                .map(|p| if p.position.is_null() { Value::text("") } else { p.position.clone() })
                .collect(),
        ));
    }
    columns.push(Column::new(
        "player_name",
        groups.iter().map(|p| p.player_name.clone()).collect(),
    ));
    columns.push(Column::new(
        "team",
        groups
            .iter()
            .map(|p| if p.team.is_null() { Value::text("") } else { p.team.clone() })
            .collect(),
    ));
    columns.push(Column::new(
        "games_played",
        groups.iter().map(|p| Value::Int(p.weeks.len() as i64)).collect(),
    ));
    columns.push(Column::new(
        "total_offense_snaps",
        groups
            .iter()
            .map(|p| Value::Int(p.total_snaps.round() as i64))
            .collect(),
    ));
    columns.push(Column::new(
        "avg_offense_pct",
        groups
            .iter()
            .map(|p| {
                if p.pct_count == 0 {
                    return Value::Null;
                }
                let mean = p.pct_sum / p.pct_count as f64;
                Value::float(round_to(normalize_pct(mean), 1))
            })
            .collect(),
    ));
    for week in &all_weeks {
        columns.push(Column::new(
            format!("wk_{}", week),
            groups
                .iter()
                .map(|p| {
                    let text = p
                        .weeks
                        .get(week)
                        .map(|cell| snap_cell(Some(cell.snaps), cell.pct()))
                        .unwrap_or_default();
                    Value::text(text)
                })
                .collect(),
        ));
    }

    // Every column has one value per group
    let Ok(summary) = Table::from_columns(columns) else {
        return Table::empty();
    };

    let avg = summary.values("avg_offense_pct").unwrap_or(&[]);
    let total = summary.values("total_offense_snaps").unwrap_or(&[]);
    let mut order: Vec<usize> = (0..summary.num_rows()).collect();
    order.sort_by(|&a, &b| {
        compare_nulls_last(&avg[a], &avg[b], true)
            .then_with(|| compare_nulls_last(&total[a], &total[b], true))
    });
    let mut summary = summary.take(&order);
    label_column(&mut summary, "avg_offense_pct");

    debug!(
        rows_in = table.num_rows(),
        players = summary.num_rows(),
        weeks = all_weeks.len(),
        "Aggregated snap counts"
    );
    summary
}
