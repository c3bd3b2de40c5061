//! Per-dataset query pipelines

use crate::enrich::{enrich_quarterback, enrich_receiving, enrich_rushing, enrich_team};
use crate::filter::{apply_filters, numeric_eq};
use crate::join::{left_join, JoinSpec};
use crate::metadata::collect_metadata;
use crate::reshape::{pivot_facts, FillPolicy};
use crate::schema::{apply_renames, canonicalize};
use crate::snaps;
use crate::sort::sort_and_bound;
use crate::EngineError;
use statline_ir::{
    fact_columns, DatasetKind, FiltersEcho, MetadataMap, QueryCriteria, QueryResponse, Table,
    TableCatalog,
};
use statline_registry::{DatasetProfile, DatasetRegistry, SupplementProfile};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Composes the stages for each dataset kind over a table catalog.
///
/// Stateless between calls: every query re-reads its source tables.
#[derive(Clone)]
pub struct StatsEngine {
    catalog: Arc<dyn TableCatalog>,
    registry: Arc<DatasetRegistry>,
}

impl StatsEngine {
    pub fn new(catalog: Arc<dyn TableCatalog>, registry: Arc<DatasetRegistry>) -> Self {
        Self { catalog, registry }
    }

    pub fn catalog(&self) -> &Arc<dyn TableCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    /// Run one query end to end.
    pub fn query(&self, criteria: &QueryCriteria) -> Result<QueryResponse, EngineError> {
        let span = debug_span!(
            "stats_query",
            dataset = %criteria.dataset,
            fingerprint = %criteria.fingerprint()
        );
        let _enter = span.enter();

        let profile = self.registry.lookup(criteria.dataset)?;
        let base = self.catalog.load(profile.source);

        let vocabulary = if profile.metadata.source == profile.source {
            collect_metadata(&base, profile)
        } else {
            collect_metadata(&self.catalog.load(profile.metadata.source), profile)
        };
        let mut metadata = MetadataMap::new();
        metadata.insert(criteria.dataset.to_string(), vocabulary);

        let frame = if base.is_empty() {
            Table::empty()
        } else {
            self.run_pipeline(profile, &base, criteria)?
        };

        if frame.is_empty() {
            debug!("Query produced no rows");
            return Ok(QueryResponse {
                dataset: criteria.dataset,
                columns: vec![],
                rows: vec![],
                filters: FiltersEcho::requested(criteria),
                metadata,
            });
        }

        let limit = criteria.effective_limit();
        let outcome = sort_and_bound(
            frame,
            criteria.sort.as_deref(),
            criteria.descending,
            &profile.sort_priority,
            limit,
        );

        let filters = FiltersEcho {
            descending: outcome.applied.as_ref().map(|_| outcome.descending),
            sort: outcome.applied,
            limit: Some(limit),
            ..FiltersEcho::requested(criteria)
        };

        let columns = outcome
            .table
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let rows = outcome.table.into_rows();
        debug!(rows = rows.len(), "Prepared stats response");

        Ok(QueryResponse {
            dataset: criteria.dataset,
            columns,
            rows,
            filters,
            metadata,
        })
    }

    /// Filter vocabulary for one dataset, or every dataset when `None`.
    pub fn metadata(&self, dataset: Option<DatasetKind>) -> Result<MetadataMap, EngineError> {
        let kinds = match dataset {
            Some(kind) => vec![kind],
            None => DatasetKind::ALL.to_vec(),
        };

        let mut metadata = MetadataMap::new();
        for kind in kinds {
            let profile = self.registry.lookup(kind)?;
            let base = self.catalog.load(profile.metadata.source);
            metadata.insert(kind.to_string(), collect_metadata(&base, profile));
        }
        Ok(metadata)
    }

    fn run_pipeline(
        &self,
        profile: &DatasetProfile,
        base: &Table,
        criteria: &QueryCriteria,
    ) -> Result<Table, EngineError> {
        let frame = match profile.kind {
            DatasetKind::Player => self.player_frame(profile, base, criteria),
            DatasetKind::Team => self.team_frame(profile, base, criteria),
            DatasetKind::ReceivingEfficiency => self.receiving_frame(profile, base, criteria)?,
            DatasetKind::QuarterbackEfficiency => self.quarterback_frame(profile, base, criteria),
            DatasetKind::SnapCounts => self.snap_frame(profile, base, criteria),
        };
        Ok(frame)
    }

    /// Long facts → one wide row per player/period, with derived ratios.
    fn player_frame(&self, profile: &DatasetProfile, base: &Table, criteria: &QueryCriteria) -> Table {
        let filtered = apply_filters(base, criteria, &profile.fields);
        if filtered.is_empty() {
            return Table::empty();
        }
        let wide = pivot_facts(&filtered, &profile.preferred_columns, FillPolicy::Zero);
        enrich_rushing(enrich_receiving(wide))
    }

    fn team_frame(&self, profile: &DatasetProfile, base: &Table, criteria: &QueryCriteria) -> Table {
        let filtered = apply_filters(base, criteria, &profile.fields);
        if filtered.is_empty() {
            return Table::empty();
        }

        let mut keep: Vec<&str> = profile
            .preferred_columns
            .iter()
            .map(String::as_str)
            .filter(|c| filtered.has_column(c))
            .collect();
        let extras: Vec<&str> = filtered
            .columns()
            .iter()
            .filter(|c| !keep.contains(&c.name.as_str()) && c.is_numeric())
            .map(|c| c.name.as_str())
            .take(profile.extra_numeric_columns)
            .collect();
        keep.extend(extras);

        let subset = enrich_team(filtered.select(&keep));
        apply_renames(subset, &profile.renames).dedupe_columns()
    }

    /// Player metrics narrowed to receiving, then joined with each
    /// supplemental source in registration order.
    fn receiving_frame(
        &self,
        profile: &DatasetProfile,
        base: &Table,
        criteria: &QueryCriteria,
    ) -> Result<Table, EngineError> {
        let player_profile = self.registry.lookup(DatasetKind::Player)?;
        let player = self.player_frame(player_profile, base, criteria);
        if player.is_empty() {
            return Ok(Table::empty());
        }
        let mut efficiency = player.select(&profile.preferred_columns);

        for supplement in self.registry.supplements(profile.kind) {
            efficiency = self.attach_supplement(efficiency, supplement, criteria);
        }
        Ok(efficiency.dedupe_columns())
    }

    fn attach_supplement(&self, primary: Table, supplement: &SupplementProfile, criteria: &QueryCriteria) -> Table {
        let raw = self.catalog.load(supplement.source);
        if raw.is_empty() {
            debug!(source = %supplement.source, "Supplemental table empty, skipping");
            return primary;
        }

        let mut table = apply_renames(raw, &supplement.renames);
        if let (true, Some(season)) = (supplement.season_prefilter, criteria.season) {
            if let Some(seasons) = table.values(fact_columns::SEASON) {
                let mask: Vec<bool> = seasons.iter().map(|v| numeric_eq(v, season)).collect();
                table = table.filter(&mask);
            }
        }

        let Some(supplement_name) = table.first_present(&supplement.name_candidates) else {
            debug!(source = %supplement.source, "Supplemental table has no player column, skipping");
            return primary;
        };
        if !primary.has_column(fact_columns::PLAYER_NAME) {
            return primary;
        }

        let on: Vec<String> = supplement
            .join_candidates
            .iter()
            .filter(|c| table.has_column(c) && primary.has_column(c))
            .cloned()
            .collect();

        left_join(
            &primary,
            &table,
            &JoinSpec {
                primary_name: fact_columns::PLAYER_NAME,
                supplement_name,
                on: &on,
                carry: &supplement.value_columns,
                suffix: &supplement.suffix,
            },
        )
    }

    fn quarterback_frame(&self, profile: &DatasetProfile, base: &Table, criteria: &QueryCriteria) -> Table {
        let mut frame = apply_filters(base, criteria, &profile.fields);
        if frame.is_empty() {
            return Table::empty();
        }

        canonicalize(&mut frame, &profile.fields.player, fact_columns::PLAYER_NAME);
        canonicalize(&mut frame, &profile.fields.team, fact_columns::TEAM);
        let frame = apply_renames(frame, &profile.renames);

        let subset = if frame.first_present(&profile.preferred_columns).is_some() {
            frame.select(&profile.preferred_columns)
        } else {
            frame
        };
        enrich_quarterback(subset).dedupe_columns()
    }

    fn snap_frame(&self, profile: &DatasetProfile, base: &Table, criteria: &QueryCriteria) -> Table {
        let frame = snaps::coerce_numeric(apply_renames(base.clone(), &profile.renames));
        let filtered = apply_filters(&frame, criteria, &profile.fields);
        let filtered = if profile.positive_weeks_only {
            snaps::drop_placeholder_weeks(&filtered)
        } else {
            filtered
        };
        if filtered.is_empty() {
            return Table::empty();
        }

        match criteria.week {
            Some(_) => snaps::weekly(&filtered, &profile.preferred_columns),
            None => snaps::multiweek(&filtered),
        }
    }
}
