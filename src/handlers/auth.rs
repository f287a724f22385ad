// ---------------------------------------------------------------------------
// handlers/auth.rs — pairing flow, credential validation, logout
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

use crate::anytype::ApiError;
use crate::models::{DisplayCodeResponse, TokenResponse};
use crate::state::AppState;

use super::AckResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenExchangeBody {
    /// Challenge to exchange. Omitted = the most recently issued one.
    #[serde(default)]
    pub challenge_id: Option<String>,
    /// Code displayed in the Anytype window.
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Step 1 of pairing: ask the upstream app to display a code.
#[utoipa::path(post, path = "/auth/display-code", tag = "auth",
    responses((status = 200, description = "Challenge issued", body = DisplayCodeResponse))
)]
pub async fn display_code(
    State(state): State<AppState>,
) -> Result<Json<DisplayCodeResponse>, ApiError> {
    Ok(Json(state.anytype.create_challenge().await?))
}

/// Step 2 of pairing: exchange the displayed code for a bearer credential.
/// Both front ends are authorized once this succeeds.
#[utoipa::path(post, path = "/auth/token", tag = "auth",
    request_body = TokenExchangeBody,
    responses(
        (status = 200, description = "Credential minted", body = TokenResponse),
        (status = 400, description = "Wrong or expired code"),
    )
)]
pub async fn exchange_token(
    State(state): State<AppState>,
    Json(body): Json<TokenExchangeBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .anytype
        .exchange_code(body.challenge_id.as_deref(), &body.code)
        .await?;
    Ok(Json(token))
}

/// Confirm the stored credential is still accepted upstream.
#[utoipa::path(get, path = "/auth/validate", tag = "auth",
    responses(
        (status = 200, description = "Validation result", body = ValidateResponse),
        (status = 401, description = "No credential stored"),
    )
)]
pub async fn validate(State(state): State<AppState>) -> Result<Json<ValidateResponse>, ApiError> {
    let valid = state.anytype.validate().await?;
    Ok(Json(ValidateResponse { valid }))
}

/// Drop the stored credential.
#[utoipa::path(post, path = "/auth/logout", tag = "auth",
    responses((status = 200, description = "Credential cleared", body = AckResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Json<AckResponse> {
    state.anytype.logout().await;
    AckResponse::ok()
}
