//! Dataset profile registry
//!
//! Each dataset kind owns a profile: which source table it reads, which column
//! names stand for each logical filter field, its default sort priorities and
//! its column policy. Candidate lists are resolved against the actual table at
//! query time, so a feed renaming `team` to `posteam` degrades gracefully.

use serde::{Deserialize, Serialize};
use statline_ir::{DatasetKind, SourceTable};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No profile registered for dataset: {0}")]
    ProfileNotFound(DatasetKind),
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Candidate column names per logical filter field, in probe order.
///
/// An empty list means the predicate does not apply to the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCandidates {
    pub season: Vec<String>,
    pub week: Vec<String>,
    pub team: Vec<String>,
    pub player: Vec<String>,
}

/// Where a dataset's filter vocabulary comes from.
///
/// Kept apart from the query fields: a dataset may ignore a predicate when
/// filtering yet still report the values its source carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSource {
    pub source: SourceTable,
    pub fields: FieldCandidates,
}

/// A column rename applied before a dataset's column policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
    /// Skip the rename when `to` already exists.
    #[serde(default)]
    pub keep_existing: bool,
}

impl ColumnRename {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            keep_existing: false,
        }
    }

    pub fn if_absent(from: &str, to: &str) -> Self {
        Self {
            keep_existing: true,
            ..Self::new(from, to)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub kind: DatasetKind,
    pub source: SourceTable,
    pub fields: FieldCandidates,
    /// Default sort candidates, first present wins
    pub sort_priority: Vec<String>,
    /// Columns kept, in this order, when the dataset narrows its output
    pub preferred_columns: Vec<String>,
    pub renames: Vec<ColumnRename>,
    /// Cap on extra numeric columns appended after the preferred ones
    pub extra_numeric_columns: usize,
    /// Drop week values <= 0 from filtering and metadata
    pub positive_weeks_only: bool,
    pub metadata: MetadataSource,
}

/// A supplemental table joined onto a dataset by player identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementProfile {
    pub source: SourceTable,
    pub renames: Vec<ColumnRename>,
    /// Player-name columns, in probe order (after renames)
    pub name_candidates: Vec<String>,
    /// Extra join columns used when both sides carry them
    pub join_candidates: Vec<String>,
    /// Columns carried onto the primary table (after renames)
    pub value_columns: Vec<String>,
    /// Restrict the supplement to the requested season before joining
    pub season_prefilter: bool,
    /// Suffix for carried columns that collide with primary columns
    pub suffix: String,
}

pub struct DatasetRegistry {
    profiles: HashMap<DatasetKind, DatasetProfile>,
    supplements: HashMap<DatasetKind, Vec<SupplementProfile>>,
    version: String,
}

impl DatasetRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
            supplements: HashMap::new(),
            version: version.into(),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        let player_fields = FieldCandidates {
            season: names(&["season"]),
            week: names(&["week"]),
            team: names(&["team", "recent_team"]),
            player: names(&["player_name"]),
        };

        self.register(DatasetProfile {
            kind: DatasetKind::Player,
            source: SourceTable::PlayerStats,
            fields: player_fields.clone(),
            sort_priority: names(&["receiving_yards", "rushing_yards", "passing_yards"]),
            // Pivot index, whichever are present
            preferred_columns: names(&["player_name", "season", "week", "team", "opponent"]),
            renames: vec![],
            extra_numeric_columns: 0,
            positive_weeks_only: false,
            metadata: MetadataSource {
                source: SourceTable::PlayerStats,
                fields: player_fields.clone(),
            },
        });

        let team_fields = FieldCandidates {
            season: names(&["season"]),
            week: names(&["week"]),
            team: names(&["team", "posteam"]),
            player: vec![],
        };

        self.register(DatasetProfile {
            kind: DatasetKind::Team,
            source: SourceTable::TeamStats,
            fields: team_fields.clone(),
            sort_priority: names(&["total_yards", "points_for"]),
            preferred_columns: names(&[
                "team",
                "posteam",
                "season",
                "week",
                "opponent",
                "total_yards",
                "passing_yards",
                "rushing_yards",
                "plays_offense",
                "points",
            ]),
            renames: vec![
                ColumnRename::new("posteam", "team"),
                ColumnRename::new("points", "points_for"),
            ],
            extra_numeric_columns: 20,
            positive_weeks_only: false,
            metadata: MetadataSource {
                source: SourceTable::TeamStats,
                fields: team_fields,
            },
        });

        self.register(DatasetProfile {
            kind: DatasetKind::ReceivingEfficiency,
            source: SourceTable::PlayerStats,
            fields: player_fields,
            sort_priority: names(&["yards_per_catch", "receiving_yards"]),
            preferred_columns: names(&[
                "player_name",
                "team",
                "season",
                "week",
                "receptions",
                "targets",
                "receiving_yards",
                "receiving_tds",
                "yards_per_catch",
                "yards_per_target",
                "catch_rate",
                "yards_after_catch",
            ]),
            renames: vec![],
            extra_numeric_columns: 0,
            positive_weeks_only: false,
            // Vocabulary follows the Next Gen feed, not the player facts
            metadata: MetadataSource {
                source: SourceTable::NgsReceiving,
                fields: FieldCandidates {
                    season: names(&["season"]),
                    week: names(&["week"]),
                    team: names(&["team", "posteam", "team_abbr"]),
                    player: vec![],
                },
            },
        });

        let qbr_fields = FieldCandidates {
            season: names(&["season"]),
            // QBR is seasonal
            week: vec![],
            team: names(&["team_abbr", "team", "abbr"]),
            player: names(&["player_name", "player", "player_display_name"]),
        };

        self.register(DatasetProfile {
            kind: DatasetKind::QuarterbackEfficiency,
            source: SourceTable::EspnQbr,
            fields: qbr_fields.clone(),
            sort_priority: names(&["total_qbr", "raw_qbr"]),
            preferred_columns: names(&[
                "player_name",
                "team",
                "season",
                "games",
                "total_qbr",
                "raw_qbr",
                "qbr_rank",
                "qb_points_added",
                "qb_total_hits",
                "qb_sacked_yards_lost",
                "qb_plays",
            ]),
            renames: vec![
                ColumnRename::new("qbr_total", "total_qbr"),
                ColumnRename::if_absent("rank", "qbr_rank"),
                ColumnRename::new("games_played", "games"),
            ],
            extra_numeric_columns: 0,
            positive_weeks_only: false,
            metadata: MetadataSource {
                source: SourceTable::EspnQbr,
                fields: FieldCandidates {
                    week: names(&["week"]),
                    ..qbr_fields
                },
            },
        });

        let snap_fields = FieldCandidates {
            season: names(&["season"]),
            week: names(&["week"]),
            team: names(&["team", "recent_team"]),
            player: names(&["player_name", "player"]),
        };

        self.register(DatasetProfile {
            kind: DatasetKind::SnapCounts,
            source: SourceTable::SnapCounts,
            fields: snap_fields.clone(),
            sort_priority: names(&["avg_offense_pct", "total_offense_snaps"]),
            preferred_columns: names(&[
                "season",
                "week",
                "team",
                "player_name",
                "position",
                "offense_snaps",
                "offense_pct",
                "defense_snaps",
                "defense_pct",
                "special_teams_snaps",
                "special_teams_pct",
            ]),
            renames: vec![
                ColumnRename::if_absent("player", "player_name"),
                ColumnRename::if_absent("recent_team", "team"),
            ],
            extra_numeric_columns: 0,
            positive_weeks_only: true,
            metadata: MetadataSource {
                source: SourceTable::SnapCounts,
                fields: snap_fields,
            },
        });

        self.register_supplement(
            DatasetKind::ReceivingEfficiency,
            SupplementProfile {
                source: SourceTable::NgsReceiving,
                renames: vec![
                    ColumnRename::if_absent("player_display_name", "player_name"),
                    ColumnRename::new("avg_cushion", "ngs_avg_cushion"),
                    ColumnRename::new("avg_separation", "ngs_avg_separation"),
                    ColumnRename::new("avg_yac", "ngs_avg_yac"),
                    ColumnRename::new("avg_intended_air_yards", "ngs_avg_air_yards"),
                ],
                name_candidates: names(&["player_name", "player_display_name"]),
                join_candidates: names(&["season", "week"]),
                value_columns: names(&[
                    "ngs_avg_cushion",
                    "ngs_avg_separation",
                    "ngs_avg_yac",
                    "ngs_avg_air_yards",
                ]),
                season_prefilter: false,
                suffix: "_ngs".to_string(),
            },
        );

        self.register_supplement(
            DatasetKind::ReceivingEfficiency,
            SupplementProfile {
                source: SourceTable::PfrReceiving,
                renames: vec![
                    ColumnRename::if_absent("player", "player_name"),
                    ColumnRename::if_absent("tm", "team"),
                    ColumnRename::new("trg", "pfr_targets"),
                    ColumnRename::new("rec", "pfr_receptions"),
                    ColumnRename::new("rec_perc", "pfr_catch_rate"),
                    ColumnRename::new("yds", "pfr_yards"),
                    ColumnRename::new("yds_per_rec", "pfr_yards_per_catch"),
                    ColumnRename::new("yac", "pfr_yards_after_catch"),
                ],
                name_candidates: names(&["player_name", "player"]),
                join_candidates: names(&["season"]),
                value_columns: names(&[
                    "pfr_targets",
                    "pfr_receptions",
                    "pfr_catch_rate",
                    "pfr_yards",
                    "pfr_yards_per_catch",
                    "pfr_yards_after_catch",
                ]),
                season_prefilter: true,
                suffix: "_pfr".to_string(),
            },
        );
    }

    pub fn register(&mut self, profile: DatasetProfile) {
        self.profiles.insert(profile.kind, profile);
    }

    /// Supplements are joined in registration order.
    pub fn register_supplement(&mut self, kind: DatasetKind, supplement: SupplementProfile) {
        self.supplements
            .entry(kind)
            .or_insert_with(Vec::new)
            .push(supplement);
    }

    pub fn lookup(&self, kind: DatasetKind) -> Result<&DatasetProfile, RegistryError> {
        self.profiles
            .get(&kind)
            .ok_or(RegistryError::ProfileNotFound(kind))
    }

    pub fn supplements(&self, kind: DatasetKind) -> &[SupplementProfile] {
        self.supplements
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::new("0.1.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dataset_has_a_profile() {
        let registry = DatasetRegistry::default();
        for kind in DatasetKind::ALL {
            let profile = registry.lookup(kind).unwrap();
            assert_eq!(profile.kind, kind);
            assert!(!profile.sort_priority.is_empty());
        }
    }

    #[test]
    fn test_player_sort_priority() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::Player).unwrap();
        assert_eq!(
            profile.sort_priority,
            vec!["receiving_yards", "rushing_yards", "passing_yards"]
        );
    }

    #[test]
    fn test_quarterback_ignores_week() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::QuarterbackEfficiency).unwrap();
        assert!(profile.fields.week.is_empty());
        assert_eq!(profile.fields.team[0], "team_abbr");
        assert_eq!(profile.metadata.fields.week, vec!["week"]);
    }

    #[test]
    fn test_receiving_metadata_reads_next_gen() {
        let registry = DatasetRegistry::default();
        let profile = registry.lookup(DatasetKind::ReceivingEfficiency).unwrap();
        assert_eq!(profile.source, SourceTable::PlayerStats);
        assert_eq!(profile.metadata.source, SourceTable::NgsReceiving);
        assert_eq!(profile.metadata.fields.team, vec!["team", "posteam", "team_abbr"]);
    }

    #[test]
    fn test_supplements_in_join_order() {
        let registry = DatasetRegistry::default();
        let sources: Vec<SourceTable> = registry
            .supplements(DatasetKind::ReceivingEfficiency)
            .iter()
            .map(|s| s.source)
            .collect();
        assert_eq!(sources, vec![SourceTable::NgsReceiving, SourceTable::PfrReceiving]);
        assert!(registry.supplements(DatasetKind::Team).is_empty());
    }

    #[test]
    fn test_custom_profile_replaces_builtin() {
        let mut registry = DatasetRegistry::default();
        let mut profile = registry.lookup(DatasetKind::Team).unwrap().clone();
        profile.sort_priority = vec!["points_for".to_string()];
        registry.register(profile);
        assert_eq!(
            registry.lookup(DatasetKind::Team).unwrap().sort_priority,
            vec!["points_for"]
        );
    }
}
