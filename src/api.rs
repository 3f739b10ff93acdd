// 🌐 JSON API - read-only card catalog over HTTP (feature `server`)
//
// Handlers read the shared catalog under a short-lived lock. A stale catalog
// is refreshed on a blocking thread before the request is answered; while one
// refresh runs, other requests are served from the current snapshot.

use crate::card::CardRecord;
use crate::catalog::Catalog;
use crate::compare::{compare_cards, Comparison};
use crate::db::{record_fetch, save_snapshot, FetchEvent};
use crate::region::known_regions;
use crate::source::{load_cards, FeedSource, SnapshotOrigin};
use crate::view::ViewRequest;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

// ============================================================================
// State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Mutex<Catalog>>,
    source: Arc<dyn FeedSource>,
    /// Refreshed snapshots are stored here when set
    db: Option<Arc<Mutex<Connection>>>,
    refreshing: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(catalog: Catalog, source: Arc<dyn FeedSource>) -> Self {
        AppState {
            catalog: Arc::new(Mutex::new(catalog)),
            source,
            db: None,
            refreshing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_database(mut self, conn: Connection) -> Self {
        self.db = Some(Arc::new(Mutex::new(conn)));
        self
    }

    /// A panicked handler never leaves the catalog half-replaced, so a
    /// poisoned lock still guards a consistent snapshot
    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocking: fetch, swap the snapshot in, persist it
    fn refresh(&self) {
        let snapshot = load_cards(self.source.as_ref());

        if let Some(db) = &self.db {
            let conn = db.lock().unwrap_or_else(PoisonError::into_inner);
            let event = FetchEvent::from_snapshot(&snapshot, &self.source.describe(), "server");
            if let Err(e) = save_snapshot(&conn, &snapshot).and_then(|_| record_fetch(&conn, &event)) {
                error!(error = %e, "Failed to store refreshed snapshot");
            }
        }

        self.catalog().replace(snapshot);
    }
}

/// Clears the in-progress flag when dropped, even if the refresh panics
struct RefreshRelease(Arc<AtomicBool>);

impl Drop for RefreshRelease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Revalidate before answering when the catalog's window has passed
async fn ensure_fresh(state: &AppState) {
    let stale = state.catalog().is_stale(Utc::now());
    if !stale {
        return;
    }

    if state
        .refreshing
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return;
    }

    // The flag is released by the blocking task itself, so a request that
    // goes away mid-refresh cannot leave it set
    let worker = state.clone();
    let release = RefreshRelease(state.refreshing.clone());
    let result = tokio::task::spawn_blocking(move || {
        let _release = release;
        worker.refresh();
    })
    .await;

    if let Err(e) = result {
        warn!(error = %e, "Catalog refresh task failed");
    }
}

// ============================================================================
// Responses
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

#[derive(Serialize)]
struct CardsResponse {
    total: usize,
    count: usize,
    sort: &'static str,
    origin: SnapshotOrigin,
    fetched_at: DateTime<Utc>,
    cards: Vec<CardRecord>,
}

#[derive(Serialize)]
struct SnapshotResponse {
    origin: SnapshotOrigin,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    digest: String,
    card_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompareQuery {
    ids: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/cards - Filtered and sorted card list
async fn list_cards(
    State(state): State<AppState>,
    Query(request): Query<ViewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (filters, sort) = request
        .into_view()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    ensure_fresh(&state).await;
    let catalog = state.catalog();
    let cards = catalog.view(&filters, sort);

    Ok(Json(ApiResponse::ok(CardsResponse {
        total: catalog.cards().len(),
        count: cards.len(),
        sort: sort.code(),
        origin: catalog.snapshot().origin,
        fetched_at: catalog.snapshot().fetched_at,
        cards,
    })))
}

/// GET /api/cards/:id - One card
async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_fresh(&state).await;
    let catalog = state.catalog();

    match catalog.get(&id) {
        Some(card) => Ok(Json(ApiResponse::ok(card.clone()))),
        None => Err(ApiError::NotFound(format!("No card with id {:?}", id))),
    }
}

/// GET /api/compare?ids=a,b - Side-by-side rows
async fn compare(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ApiResponse<Comparison>>, ApiError> {
    let ids: Vec<&str> = query
        .ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(ApiError::BadRequest("ids must name at least one card".to_string()));
    }

    ensure_fresh(&state).await;
    let catalog = state.catalog();

    Ok(Json(ApiResponse::ok(compare_cards(catalog.cards(), &ids))))
}

/// GET /api/regions - Region names the alias table knows
async fn list_regions() -> impl IntoResponse {
    Json(ApiResponse::ok(known_regions()))
}

/// GET /api/snapshot - Provenance of the current record set
async fn snapshot_info(State(state): State<AppState>) -> impl IntoResponse {
    ensure_fresh(&state).await;
    let catalog = state.catalog();
    let snapshot = catalog.snapshot();

    Json(ApiResponse::ok(SnapshotResponse {
        origin: snapshot.origin,
        fetched_at: snapshot.fetched_at,
        expires_at: catalog.expires_at(),
        digest: snapshot.digest.clone(),
        card_count: snapshot.cards.len(),
        fallback_reason: snapshot.fallback_reason.clone(),
    }))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cards", get(list_cards))
        .route("/cards/:id", get(get_card))
        .route("/compare", get(compare))
        .route("/regions", get(list_regions))
        .route("/snapshot", get(snapshot_info))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
