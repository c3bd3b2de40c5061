//! HTTP API
//!
//! - `GET  /health`
//! - `GET  /api/stats`           query one dataset
//! - `GET  /api/stats/metadata`  filter vocabulary for one or all datasets
//! - `POST /api/stats/refresh`   swap in a fresh engine generation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statline_engine::{EngineError, EngineHandle};
use statline_ir::{DatasetKind, IrError, MetadataMap, QueryCriteria, QueryResponse};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info_span, Level};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub handle: Arc<EngineHandle>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidRequest(#[from] IrError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Query-string form of [`QueryCriteria`]
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub dataset: String,
    pub season: Option<i64>,
    pub week: Option<i64>,
    pub team: Option<String>,
    pub player: Option<String>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub descending: Option<bool>,
}

impl StatsParams {
    pub fn into_criteria(self) -> Result<QueryCriteria, IrError> {
        let dataset: DatasetKind = self.dataset.parse()?;
        Ok(QueryCriteria {
            dataset,
            season: self.season,
            week: self.week,
            team: self.team,
            player: self.player,
            limit: self.limit,
            sort: self.sort.filter(|s| !s.trim().is_empty()),
            descending: self.descending.unwrap_or(true),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetadataParams {
    pub dataset: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/stats/metadata", get(metadata))
        .route("/api/stats/refresh", post(refresh))
        .with_state(state)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    let criteria = params.into_criteria()?;
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let handle = Arc::clone(&state.handle);
    let dataset = criteria.dataset;
    let response = tokio::task::spawn_blocking(move || {
        let _span = info_span!("stats_request", %request_id).entered();
        let generation = handle.snapshot();
        generation.engine.query(&criteria)
    })
    .await??;

    crate::log_event!(
        level: Level::INFO,
        event: "stats_query",
        request_id: request_id,
        dataset: dataset,
        rows: response.row_count(),
        duration_ms: started.elapsed().as_millis()
    );
    Ok(Json(response))
}

pub async fn metadata(
    State(state): State<AppState>,
    Query(params): Query<MetadataParams>,
) -> Result<Json<MetadataMap>, ApiError> {
    let dataset = params
        .dataset
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::parse::<DatasetKind>)
        .transpose()?;
    let request_id = Uuid::new_v4();

    let handle = Arc::clone(&state.handle);
    let metadata = tokio::task::spawn_blocking(move || {
        let _span = info_span!("metadata_request", %request_id).entered();
        handle.snapshot().engine.metadata(dataset)
    })
    .await??;

    Ok(Json(metadata))
}

pub async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let generation = state.handle.refresh();
    crate::log_event!(level: Level::INFO, event: "engine_refreshed", generation: generation.id);
    Json(RefreshResponse {
        generation: generation.id,
        created_at: generation.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use statline_ir::{FactRow, MemoryCatalog, SourceTable, Table, Value};
    use statline_registry::DatasetRegistry;

    fn state() -> AppState {
        let facts = Table::from_facts(&[
            FactRow::new("A", 2024, "receiving_yards", 80.0).week(1).team("KC"),
            FactRow::new("A", 2024, "receptions", 8.0).week(1).team("KC"),
            FactRow::new("B", 2023, "receiving_yards", 20.0).week(2).team("BUF"),
        ]);
        let catalog = MemoryCatalog::new().with_table(SourceTable::PlayerStats, facts);
        AppState {
            handle: Arc::new(EngineHandle::new(
                Arc::new(catalog),
                Arc::new(DatasetRegistry::default()),
            )),
        }
    }

    fn params(dataset: &str) -> StatsParams {
        StatsParams {
            dataset: dataset.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_stats_query() {
        let mut p = params("player");
        p.season = Some(2024);
        let Json(response) = stats(State(state()), Query(p)).await.unwrap();

        assert_eq!(response.row_count(), 1);
        assert_eq!(response.rows[0].get("yards_per_catch"), Some(&Value::Float(10.0)));
        assert_eq!(response.metadata["player"].seasons, vec![2023, 2024]);
        assert_eq!(response.filters.limit, Some(100));
    }

    #[tokio::test]
    async fn test_invalid_dataset_is_bad_request() {
        let err = stats(State(state()), Query(params("fantasy"))).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(IrError::InvalidDataset(_))));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_kebab_case_dataset_accepted() {
        let result = stats(State(state()), Query(params("receiving-efficiency"))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_metadata_all_and_single() {
        let Json(all) = metadata(State(state()), Query(MetadataParams::default()))
            .await
            .unwrap();
        assert_eq!(all.len(), DatasetKind::ALL.len());
        assert_eq!(all["player"].teams, vec!["BUF", "KC"]);

        let Json(one) = metadata(
            State(state()),
            Query(MetadataParams {
                dataset: Some("snap_counts".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(one.len(), 1);
        assert!(one["snap_counts"].seasons.is_empty());

        let err = metadata(
            State(state()),
            Query(MetadataParams {
                dataset: Some("bogus".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_swaps_generation() {
        let state = state();
        let Json(first) = refresh(State(state.clone())).await;
        let Json(second) = refresh(State(state.clone())).await;
        assert_eq!(first.generation, 2);
        assert_eq!(second.generation, 3);
        assert!(second.created_at >= first.created_at);
        assert_eq!(state.handle.generation(), 3);
        assert_eq!(state.handle.snapshot().created_at, second.created_at);
    }
}
