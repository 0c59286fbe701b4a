// Whitelist Backend
// Reconciled, paginated whitelist views built from the registry's event log

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod indexer;
pub mod models;
pub mod sink;
pub mod whitelist;

use axum::{
    routing::{get, post},
    Router,
};
use database::DbPool;
use indexer::IndexerStatus;
use sink::SubmissionSink;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use whitelist::{EventSource, ListLength};

pub use error::{Result, WhitelistError};

/// Application state shared across handlers
pub struct AppState {
    pub db: Option<DbPool>,
    pub events: Arc<dyn EventSource>,
    pub sink: Arc<dyn SubmissionSink>,
    pub operator_address: String,
    pub list_length: ListLength,
    /// `None` when the indexer is disabled.
    pub indexer: Option<Arc<IndexerStatus>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    // Setup CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/whitelist/view", post(handlers::view_whitelist))
        .route("/api/whitelist/csv", post(handlers::upload_csv))
        .route("/api/whitelist/csv/submit", post(handlers::submit_csv))
        .route("/api/whitelist/submit", post(handlers::submit_entries))
        .route("/api/whitelist/edit", post(handlers::edit_investors))
        .route("/api/whitelist/remove", post(handlers::remove_investors))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
