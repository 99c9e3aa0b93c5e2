//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream, StreamExt};
use tracing::{error, info, warn};

use crate::{
    display::DisplayFrame,
    error::{ConfigError, EncodeError},
    schedule::Section,
    state::{AppState, TimerSnapshot},
};
use super::responses::{
    ApiResponse, CreateTokenRequest, DisplayQuery, ErrorResponse, HealthResponse, MoveRequest,
    ReorderRequest, SectionInput, StatusResponse, TokenResponse,
};

type ApiResult = Result<Json<ApiResponse>, StatusCode>;
type TokenResult = Result<Json<TokenResponse>, (StatusCode, Json<ErrorResponse>)>;

/// Build the response for a list mutation
fn list_response(
    state: &AppState,
    result: Result<(Vec<Section>, bool), String>,
    applied: &str,
) -> ApiResult {
    let (sections, changed) = result.map_err(|e| {
        error!("Failed to update section list: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let timer = timer_snapshot(state)?;

    if changed {
        Ok(Json(ApiResponse::applied(applied.to_string(), sections, timer)))
    } else {
        Ok(Json(ApiResponse::unchanged(
            "Request did not change the section list".to_string(),
            sections,
            timer,
        )))
    }
}

/// Build the response for a timer control
fn timer_response(state: &AppState, result: Result<TimerSnapshot, String>, message: &str) -> ApiResult {
    let timer = result.map_err(|e| {
        error!("Timer operation failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let sections = sections(state)?;
    Ok(Json(ApiResponse::applied(message.to_string(), sections, timer)))
}

fn timer_snapshot(state: &AppState) -> Result<TimerSnapshot, StatusCode> {
    state.get_timer_state().map_err(|e| {
        error!("Failed to get timer state: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn sections(state: &AppState) -> Result<Vec<Section>, StatusCode> {
    state.get_sections().map_err(|e| {
        error!("Failed to get section list: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle GET /sections - Return the section list with the timer state
pub async fn list_sections_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let sections = sections(&state)?;
    let timer = timer_snapshot(&state)?;
    Ok(Json(ApiResponse::unchanged("Current section list".to_string(), sections, timer)))
}

/// Handle POST /sections - Append a section
pub async fn add_section_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SectionInput>,
) -> ApiResult {
    let result = state.add_section(&input.name, input.duration);
    list_response(&state, result, "Section added")
}

/// Handle PUT /sections/:index - Replace a section
pub async fn edit_section_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(input): Json<SectionInput>,
) -> ApiResult {
    let result = state.edit_section(index, &input.name, input.duration);
    list_response(&state, result, "Section updated")
}

/// Handle DELETE /sections/:index - Remove a section
pub async fn delete_section_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult {
    let result = state.delete_section(index);
    list_response(&state, result, "Section deleted")
}

/// Handle POST /sections/:index/move - Move a section one step up or down
pub async fn move_section_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(request): Json<MoveRequest>,
) -> ApiResult {
    let result = state.move_section(index, request.direction);
    list_response(&state, result, "Section moved")
}

/// Handle POST /sections/reorder - Drag-and-drop move
pub async fn reorder_sections_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult {
    let result = state.reorder_sections(request.from, request.to);
    list_response(&state, result, "Sections reordered")
}

/// Handle GET /timer - Current countdown state
pub async fn timer_status_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerSnapshot>, StatusCode> {
    timer_snapshot(&state).map(Json)
}

/// Handle POST /timer/start - Start or resume the countdown
pub async fn start_timer_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let result = state.start_timer();
    timer_response(&state, result, "Timer started")
}

/// Handle POST /timer/pause - Pause the countdown
pub async fn pause_timer_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let result = state.pause_timer();
    timer_response(&state, result, "Timer paused")
}

/// Handle POST /timer/reset - Return the countdown to the start
pub async fn reset_timer_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let result = state.reset_timer();
    timer_response(&state, result, "Timer reset")
}

fn token_response(state: &AppState, sections: &[Section]) -> TokenResult {
    match state.create_share_link(sections) {
        Ok(link) => Ok(Json(TokenResponse {
            token: link.token,
            url: link.url,
        })),
        Err(e @ EncodeError::Config(ConfigError::MissingSecret)) => {
            error!("Cannot create share token: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("JWT secret not set")),
            ))
        }
        Err(e @ EncodeError::Serialize { .. }) => {
            error!("Cannot create share token: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to encode token")),
            ))
        }
    }
}

/// Handle POST /api/create-token - Sign a submitted section list
pub async fn create_token_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTokenRequest>,
) -> TokenResult {
    for (index, section) in request.sections.iter().enumerate() {
        if let Err(e) = section.validate() {
            warn!("Rejecting token request, section {} invalid: {}", index, e);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("Section {}: {}", index, e))),
            ));
        }
    }
    token_response(&state, &request.sections)
}

/// Handle POST /share - Sign the editor's current section list
pub async fn share_handler(State(state): State<Arc<AppState>>) -> TokenResult {
    let sections = state.get_sections().map_err(|e| {
        error!("Failed to get section list: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Section list unavailable")),
        )
    })?;
    token_response(&state, &sections)
}

/// Handle GET /display?token= - First frame of a shared schedule
pub async fn display_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DisplayQuery>,
) -> Json<DisplayFrame> {
    let renderer = state.open_display(query.token.as_deref());
    Json(renderer.frame())
}

/// Handle GET /display/stream?token= - One frame per tick until the schedule ends
pub async fn display_stream_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DisplayQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let renderer = state.open_display(query.token.as_deref());
    let first = renderer.frame();
    let updates = renderer.subscribe();
    info!("Display stream opened (schedule present: {})", updates.is_some());

    // The renderer rides along in the stream state so its countdown lives as
    // long as the client stays connected
    let following = stream::unfold(updates.map(|rx| (renderer, rx)), |next| async move {
        let (renderer, mut rx) = next?;
        rx.changed().await.ok()?;
        let frame = DisplayFrame::from_snapshot(&rx.borrow_and_update());
        let next = if frame.is_finished() { None } else { Some((renderer, rx)) };
        Some((frame, next))
    });

    let frames = stream::iter(std::iter::once(first)).chain(following);
    Sse::new(frames.map(|frame| Event::default().json_data(frame))).keep_alive(KeepAlive::default())
}

/// Handle GET /status - Return current editor status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let sections = sections(&state)?;
    let timer = timer_snapshot(&state)?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        sections,
        timer,
        share_enabled: state.codec.has_secret(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
