//! Column probing and renaming

use statline_ir::Table;
use statline_registry::ColumnRename;

/// Apply renames in order. A rename whose source is missing is a no-op.
pub fn apply_renames(mut table: Table, renames: &[ColumnRename]) -> Table {
    for rename in renames {
        if !table.has_column(&rename.from) {
            continue;
        }
        if rename.keep_existing && table.has_column(&rename.to) {
            continue;
        }
        table.rename_column(&rename.from, &rename.to);
    }
    table
}

/// Rename the first present candidate to `target`.
///
/// Returns false when none of the candidates exist.
pub fn canonicalize(table: &mut Table, candidates: &[String], target: &str) -> bool {
    match table.first_present(candidates) {
        Some(found) if found == target => true,
        Some(found) => {
            table.rename_column(found, target);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statline_ir::Value;

    fn table(names: &[&str]) -> Table {
        Table::from_rows(names, vec![names.iter().map(|_| Value::Int(1)).collect()]).unwrap()
    }

    #[test]
    fn test_rename_skips_missing_source() {
        let renamed = apply_renames(table(&["a"]), &[ColumnRename::new("b", "c")]);
        assert_eq!(renamed.column_names(), vec!["a"]);
    }

    #[test]
    fn test_rename_if_absent_keeps_existing_target() {
        let renamed = apply_renames(
            table(&["rank", "qbr_rank"]),
            &[ColumnRename::if_absent("rank", "qbr_rank")],
        );
        assert_eq!(renamed.column_names(), vec!["rank", "qbr_rank"]);

        let renamed = apply_renames(table(&["rank"]), &[ColumnRename::if_absent("rank", "qbr_rank")]);
        assert_eq!(renamed.column_names(), vec!["qbr_rank"]);
    }

    #[test]
    fn test_canonicalize_picks_first_candidate() {
        let mut t = table(&["player_display_name", "player"]);
        let candidates = vec!["player_name".to_string(), "player".to_string(), "player_display_name".to_string()];
        assert!(canonicalize(&mut t, &candidates, "player_name"));
        assert_eq!(t.column_names(), vec!["player_display_name", "player_name"]);
    }
}
