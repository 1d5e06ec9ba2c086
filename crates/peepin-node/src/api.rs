//! HTTP API for Peepin.

use crate::error::{Error, Result};
use crate::models::UserProfile;
use crate::nearby::{NearbyEntry, NearbyParams, SubmitAck};
use crate::node::NodeState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use peepin_proximity::{now_millis, LocationUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<NodeState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (at root and under /api for the web client)
        .route("/health", get(health))
        .route("/api/health", get(api_health))
        // Auth
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        // Location sharing
        .route("/api/location", post(post_location))
        .route("/api/nearby", get(get_nearby))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// --- Auth endpoints ---

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    handle: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserProfile,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let handle = req.handle.trim().trim_start_matches('@');
    if handle.is_empty() || req.password.is_empty() {
        return Err(Error::InvalidInput("handle and password are required".into()));
    }

    let invalid = || Error::Unauthorized("invalid credentials".into());
    let user = state
        .storage
        .get_user_by_handle(handle)?
        .ok_or_else(invalid)?;
    if !state.storage.verify_password(&user.id, &req.password)? {
        tracing::warn!("Failed login for {}", user.id);
        return Err(invalid());
    }

    tracing::info!("Issued token for {}", user.id);
    Ok(Json(LoginResponse {
        token: state.tokens.issue(&user.id),
        user,
    }))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<UserProfile>> {
    let user_id = state.tokens.authenticate(&headers)?;
    let user = state
        .storage
        .get_user(&user_id)?
        .ok_or_else(|| Error::NotFound("user not found".into()))?;
    Ok(Json(user))
}

// --- Location endpoints ---

async fn post_location(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<LocationUpdate>,
) -> Result<Json<SubmitAck>> {
    let user_id = state.tokens.authenticate(&headers)?;
    let ack = state.nearby.submit_location(&user_id, &update, now_millis())?;
    Ok(Json(ack))
}

async fn get_nearby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<NearbyEntry>>> {
    let user_id = state.tokens.authenticate(&headers)?;
    let entries = state.nearby.nearby(&user_id, &params, now_millis())?;
    tracing::debug!("{} nearby users for {}", entries.len(), user_id);
    Ok(Json(entries))
}
