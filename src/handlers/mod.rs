// ---------------------------------------------------------------------------
// handlers/ — the REST front-end adapter.
// Sub-modules per resource group; mod.rs re-exports all public items so
// routing in lib.rs uses `crate::handlers::*` paths.
// ---------------------------------------------------------------------------

pub(crate) mod auth;
pub(crate) mod meta;
pub(crate) mod objects;
pub(crate) mod spaces;
pub(crate) mod system;

pub use auth::{TokenExchangeBody, ValidateResponse, display_code, exchange_token, logout, validate};
pub use meta::{list_templates, list_types};
pub use objects::{
    CreateObjectBody, GlobalSearchBody, SearchBody, create_object, delete_object, export_object,
    get_object, global_search, list_objects, search_objects,
};
pub use spaces::{create_space, list_members, list_spaces};
pub use system::{HealthResponse, health, readiness};

// ── utoipa __path_* re-exports ───────────────────────────────────────────────
// #[utoipa::path] generates private __path_* structs; the OpenApi derive in
// lib.rs expects them under `handlers::`.
pub use auth::{__path_display_code, __path_exchange_token, __path_logout, __path_validate};
pub use meta::{__path_list_templates, __path_list_types};
pub use objects::{
    __path_create_object, __path_delete_object, __path_export_object, __path_get_object,
    __path_global_search, __path_list_objects, __path_search_objects,
};
pub use spaces::{__path_create_space, __path_list_members, __path_list_spaces};
pub use system::{__path_health, __path_readiness};

use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::anytype::ApiError;
use crate::anytype::endpoints::{DEFAULT_PAGE_SIZE, Page};

// ---------------------------------------------------------------------------
// Error rendering
// ---------------------------------------------------------------------------

/// HTTP status for each façade error kind. The mapping is total and stable —
/// the REST adapter never substitutes a different kind than the façade produced.
fn status_for(error: &ApiError) -> StatusCode {
    match error {
        ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ApiError::UpstreamError(_)
        | ApiError::UpstreamUnreachable(_)
        | ApiError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        ApiError::MalformedRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = status_for(&self);
        let request_id = Uuid::new_v4().to_string();

        // Full detail server-side; sanitized envelope to the client.
        tracing::error!(
            request_id = %request_id,
            code = self.kind(),
            "API error ({}): {}",
            status.as_u16(),
            self
        );

        let retry_after = match &self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        };

        let body = json!({
            "error": {
                "code": self.kind(),
                "message": self.to_string(),
                "request_id": request_id,
                "retry_after": retry_after,
            }
        });
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared request/response types
// ---------------------------------------------------------------------------

/// Pagination query parameters shared by every list endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Items per page (1–100, default 50).
    pub limit: Option<u32>,
    /// Items to skip.
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::clamped(
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            self.offset.unwrap_or(0),
        )
    }
}

/// Empty success marker for delete-style endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    pub ok: bool,
}

impl AckResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_fixed_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::RateLimited { message: "x".into(), retry_after: None },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (ApiError::UpstreamError("x".into()), StatusCode::BAD_GATEWAY),
            (ApiError::UpstreamUnreachable("x".into()), StatusCode::BAD_GATEWAY),
            (ApiError::InvalidResponse("x".into()), StatusCode::BAD_GATEWAY),
            (
                ApiError::MalformedRequest("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(status_for(&error), expected, "{}", error.kind());
        }
    }

    #[test]
    fn page_query_defaults_and_clamps() {
        let query = PageQuery { limit: None, offset: None };
        assert_eq!(query.page(), Page { limit: 50, offset: 0 });

        let query = PageQuery { limit: Some(10_000), offset: Some(200) };
        assert_eq!(query.page(), Page { limit: 100, offset: 200 });
    }
}
