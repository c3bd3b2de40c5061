//! Metric enrichment stage
//!
//! Derived ratios are added only when every source column exists. A zero or
//! missing divisor yields a null cell, never infinity.

use statline_ir::{Table, Value};

/// Decimal places for per-unit ratios
pub const RATIO_DECIMALS: u32 = 3;
/// Decimal places for QBR-style scores
pub const SCORE_DECIMALS: u32 = 2;

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `numerator / denominator`, rounded; null when either side is missing or
/// the denominator is zero.
pub fn safe_ratio(numerator: &Value, denominator: &Value, decimals: u32) -> Value {
    match (numerator.as_f64(), denominator.as_f64()) {
        (Some(n), Some(d)) if d != 0.0 => Value::float(round_to(n / d, decimals)),
        _ => Value::Null,
    }
}

/// Add `output = numerator / denominator` when both inputs exist.
pub fn derive_ratio(table: &mut Table, output: &str, numerator: &str, denominator: &str, decimals: u32) -> bool {
    let (Some(num), Some(den)) = (table.values(numerator), table.values(denominator)) else {
        return false;
    };
    let values = num
        .iter()
        .zip(den)
        .map(|(n, d)| safe_ratio(n, d, decimals))
        .collect();
    table.set_column(output, values);
    true
}

/// Round a numeric column in place; non-numeric cells become null.
pub fn round_column(table: &mut Table, column: &str, decimals: u32) {
    table.map_column(column, |v| {
        v.as_f64()
            .map(|f| Value::float(round_to(f, decimals)))
            .unwrap_or(Value::Null)
    });
}

pub fn enrich_receiving(mut table: Table) -> Table {
    derive_ratio(&mut table, "yards_per_catch", "receiving_yards", "receptions", RATIO_DECIMALS);
    derive_ratio(&mut table, "yards_per_target", "receiving_yards", "targets", RATIO_DECIMALS);
    derive_ratio(&mut table, "catch_rate", "receptions", "targets", RATIO_DECIMALS);

    if table.has_column("receiving_yards") && !table.has_column("yards_after_catch") {
        let yac = table
            .column_names()
            .into_iter()
            .find(|name| name.to_lowercase().contains("yac"))
            .map(str::to_string);
        if let Some(source) = yac {
            if let Some(values) = table.values(&source).map(<[Value]>::to_vec) {
                table.set_column("yards_after_catch", values);
            }
        }
    }
    table
}

pub fn enrich_rushing(mut table: Table) -> Table {
    derive_ratio(&mut table, "yards_per_carry", "rushing_yards", "rushing_attempts", RATIO_DECIMALS);
    table
}

pub fn enrich_team(mut table: Table) -> Table {
    derive_ratio(&mut table, "yards_per_play", "total_yards", "plays_offense", RATIO_DECIMALS);
    table
}

pub fn enrich_quarterback(mut table: Table) -> Table {
    round_column(&mut table, "total_qbr", SCORE_DECIMALS);
    round_column(&mut table, "raw_qbr", SCORE_DECIMALS);
    derive_ratio(&mut table, "qbr_per_game", "total_qbr", "games", RATIO_DECIMALS);
    table
}
