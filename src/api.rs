// src/api.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::engine::{EngagementOutcome, HoneypotEngine, InboundMessage};
use crate::error::ErrorBody;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HoneypotEngine>,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(engine: Arc<HoneypotEngine>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            engine,
            api_key: api_key.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/honeypot/message", post(honeypot_message))
        .route("/session/{id}", get(debug_session))
        .route("/analytics", get(analytics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error",
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|k| k == &*state.api_key)
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let generator = state.engine.replier_name();
    Json(json!({
        "status": "healthy",
        "activeSessions": state.engine.store().len(),
        "llmConfigured": generator != "scripted",
        "replyGenerator": generator,
    }))
}

async fn honeypot_message(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&state, &headers) {
        tracing::warn!(target: "honeypot", "rejected request: bad or missing api key");
        return error_response(StatusCode::UNAUTHORIZED, "invalid API key");
    }

    let inbound: InboundMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(target: "honeypot", "malformed body: {e}");
            return error_response(StatusCode::BAD_REQUEST, "request body must be a JSON object");
        }
    };

    match state.engine.process(inbound).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) if e.is_client_error() => e.into_response(),
        Err(e) => {
            // stay in character
            tracing::error!(target: "honeypot", "turn failed, serving decoy: {e:#}");
            Json(EngagementOutcome::decoy()).into_response()
        }
    }
}

async fn debug_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid API key");
    }
    match state.engine.session(&id) {
        Some(session) => Json(session).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "session not found"),
    }
}

async fn analytics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid API key");
    }
    Json(state.engine.analytics()).into_response()
}
