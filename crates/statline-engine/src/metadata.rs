//! Metadata stage

use statline_ir::{DatasetMetadata, Table, Value};
use statline_registry::DatasetProfile;
use std::collections::BTreeSet;

fn distinct_integers(values: &[Value]) -> Vec<i64> {
    values
        .iter()
        .filter_map(Value::as_i64)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct seasons, weeks and teams observed in the unfiltered table named
/// by the profile's metadata source.
///
/// Fields resolve through the metadata candidate columns, not the query
/// fields; a field with no column reports an empty list.
pub fn collect_metadata(table: &Table, profile: &DatasetProfile) -> DatasetMetadata {
    let fields = &profile.metadata.fields;
    let column = |candidates: &[String]| table.first_present(candidates).and_then(|c| table.values(c));

    let seasons = column(&fields.season)
        .map(distinct_integers)
        .unwrap_or_default();

    let mut weeks = column(&fields.week)
        .map(distinct_integers)
        .unwrap_or_default();
    if profile.positive_weeks_only {
        weeks.retain(|w| *w > 0);
    }

    let teams = column(&fields.team)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_text())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
        .unwrap_or_default();

    DatasetMetadata {
        seasons,
        weeks,
        teams,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statline_ir::DatasetKind;
    use statline_registry::DatasetRegistry;

    #[test]
    fn test_distinct_sorted_vocabulary() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::Team).unwrap();
        let table = Table::from_rows(
            &["season", "week", "posteam"],
            vec![
                vec![Value::Int(2024), Value::Int(2), "KC".into()],
                vec![Value::text("2023"), Value::Int(1), "BUF".into()],
                vec![Value::Int(2024), Value::Int(1), Value::Null],
                vec![Value::Int(2024), Value::Float(2.0), "KC".into()],
            ],
        )
        .unwrap();

        let meta = collect_metadata(&table, profile);
        assert_eq!(meta.seasons, vec![2023, 2024]);
        assert_eq!(meta.weeks, vec![1, 2]);
        assert_eq!(meta.teams, vec!["BUF", "KC"]);
    }

    #[test]
    fn test_snap_weeks_exclude_placeholders() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::SnapCounts).unwrap();
        let table = Table::from_rows(
            &["season", "week", "recent_team"],
            vec![
                vec![Value::Int(2024), Value::Int(0), "KC".into()],
                vec![Value::Int(2024), Value::Int(3), "KC".into()],
            ],
        )
        .unwrap();
        let meta = collect_metadata(&table, profile);
        assert_eq!(meta.weeks, vec![3]);
        assert_eq!(meta.teams, vec!["KC"]);
    }

    #[test]
    fn test_quarterback_reports_observed_weeks() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::QuarterbackEfficiency).unwrap();
        let table = Table::from_rows(
            &["season", "week", "team_abbr"],
            vec![vec![Value::Int(2024), Value::Int(3), "KC".into()]],
        )
        .unwrap();
        let meta = collect_metadata(&table, profile);
        assert_eq!(meta.seasons, vec![2024]);
        assert_eq!(meta.weeks, vec![3]);
        assert_eq!(meta.teams, vec!["KC"]);
    }

    #[test]
    fn test_team_abbr_probed_for_receiving() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::ReceivingEfficiency).unwrap();
        let table = Table::from_rows(
            &["season", "week", "team_abbr"],
            vec![
                vec![Value::Int(2023), Value::Int(6), "CIN".into()],
                vec![Value::Int(2022), Value::Int(5), "BUF".into()],
            ],
        )
        .unwrap();
        let meta = collect_metadata(&table, profile);
        assert_eq!(meta.seasons, vec![2022, 2023]);
        assert_eq!(meta.weeks, vec![5, 6]);
        assert_eq!(meta.teams, vec!["BUF", "CIN"]);
    }

    #[test]
    fn test_empty_table_is_all_empty() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::Player).unwrap();
        assert_eq!(collect_metadata(&Table::empty(), profile), DatasetMetadata::default());
    }
}
