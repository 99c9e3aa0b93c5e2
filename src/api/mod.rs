//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Editing surface
        .route("/sections", get(list_sections_handler).post(add_section_handler))
        .route("/sections/reorder", post(reorder_sections_handler))
        .route("/sections/:index", put(edit_section_handler).delete(delete_section_handler))
        .route("/sections/:index/move", post(move_section_handler))
        // Interactive countdown
        .route("/timer", get(timer_status_handler))
        .route("/timer/start", post(start_timer_handler))
        .route("/timer/pause", post(pause_timer_handler))
        .route("/timer/reset", post(reset_timer_handler))
        // Sharing and the audience display
        .route("/api/create-token", post(create_token_handler))
        .route("/share", post(share_handler))
        .route("/display", get(display_handler))
        .route("/display/stream", get(display_stream_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
