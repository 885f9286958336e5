//! JSON HTTP API over the live catalog.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=<term>&limit=<n>` | Substring search |
//! | `GET`  | `/category/{name}` | Records of one category |
//! | `GET`  | `/stats` | Document and category counts |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Every query reads the current snapshot without waiting on a refresh. A
//! background task rebuilds the catalog whenever its freshness window has
//! passed.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest::{Catalog, SnapshotStatus};
use crate::models::Record;
use crate::stats::CatalogStats;

#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    default_limit: usize,
}

/// Starts the HTTP server.
///
/// Performs an initial refresh, spawns the background refresher, then binds
/// to `[server].bind` and serves until shutdown.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let catalog = Arc::new(Catalog::from_config(config).await?);
    let snapshot = catalog.refresh(Utc::now()).await;
    if !snapshot.is_ready() {
        tracing::warn!("starting with an unavailable catalog; will retry on the next check");
    }

    spawn_refresher(
        catalog.clone(),
        Duration::from_secs(config.server.refresh_check_secs),
    );

    let app = router(catalog, config.search.limit);

    println!("altnav server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically rebuild the catalog once its snapshot has expired.
pub fn spawn_refresher(catalog: Arc<Catalog>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(snapshot) = catalog.refresh_if_stale(Utc::now()).await {
                tracing::debug!(records = snapshot.index.size(), "background refresh done");
            }
        }
    })
}

/// Routes for the API, with permissive CORS.
pub fn router(catalog: Arc<Catalog>, default_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", get(handle_search))
        .route("/category/{name}", get(handle_category))
        .route("/stats", get(handle_stats))
        .layer(cors)
        .with_state(AppState {
            catalog,
            default_limit,
        })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search, GET /category/{name} ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Response body shared by `/search` and `/category/{name}`.
#[derive(Serialize)]
struct ResultsResponse {
    /// `"ready"` or `"unavailable"`.
    status: SnapshotStatus,
    /// Matches before `limit` was applied.
    total: usize,
    results: Vec<Record>,
}

fn results_response(status: SnapshotStatus, mut results: Vec<Record>, limit: usize) -> ResultsResponse {
    let total = results.len();
    results.truncate(limit);
    ResultsResponse {
        status,
        total,
        results,
    }
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ResultsResponse>, AppError> {
    let term = params.q.unwrap_or_default();
    if term.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let limit = params.limit.unwrap_or(state.default_limit);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }

    let snapshot = state.catalog.snapshot();
    let results = snapshot.index.query(&term);
    Ok(Json(results_response(snapshot.status, results, limit)))
}

async fn handle_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ResultsResponse>, AppError> {
    let limit = params.limit.unwrap_or(state.default_limit);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }
    let snapshot = state.catalog.snapshot();
    let results = snapshot.index.query_by_category(&name);
    Ok(Json(results_response(snapshot.status, results, limit)))
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Json<CatalogStats> {
    Json(CatalogStats::from_snapshot(&state.catalog.snapshot()))
}
