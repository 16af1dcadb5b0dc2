//! Axum router: maps all URL paths to handlers.

use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{
    api::{api_entities, api_trials},
    entities::entities_page,
    export::{entities_csv, export_page, trials_csv},
    fetch::fetch_submit,
    heatmaps::heatmaps_page,
    studies::studies_page,
    trial_nlp::trial_nlp_page,
};
use crate::sse::sse_handler;
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",          get(|| async { Redirect::to("/studies") }))
        .route("/fetch",     post(fetch_submit))
        .route("/studies",   get(studies_page))
        .route("/heatmaps",  get(heatmaps_page))
        .route("/trial-nlp", get(trial_nlp_page))
        .route("/entities",  get(entities_page))
        .route("/export",    get(export_page))

        // Downloads
        .route("/export/trials.csv",   get(trials_csv))
        .route("/export/entities.csv", get(entities_csv))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // API endpoints
        .route("/api/trials",   get(api_trials))
        .route("/api/entities", get(api_entities))

        // Static files
        .nest_service("/static", ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
