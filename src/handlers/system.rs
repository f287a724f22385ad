// ---------------------------------------------------------------------------
// handlers/system.rs — health and readiness
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub app: String,
    pub uptime_seconds: u64,
    pub upstream_url: String,
    /// Whether a credential is currently stored (not whether it is accepted —
    /// use /auth/validate for that).
    pub authenticated: bool,
}

#[utoipa::path(get, path = "/api/health", tag = "health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_ready() { "ok" } else { "starting" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        app: "anytype-gateway".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        upstream_url: state.settings.api_url.clone(),
        authenticated: state.anytype.session().is_authenticated().await,
    })
}

/// Lightweight readiness probe — no locks, no upstream call.
#[utoipa::path(get, path = "/api/health/ready", tag = "health",
    responses(
        (status = 200, description = "Service ready", body = Value),
        (status = 503, description = "Service not ready", body = Value)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> axum::response::Response {
    use axum::http::StatusCode;

    let ready = state.is_ready();
    let uptime = state.start_time.elapsed().as_secs();
    let body = json!({ "ready": ready, "uptime_seconds": uptime });

    if ready {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
