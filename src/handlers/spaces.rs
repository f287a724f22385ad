// ---------------------------------------------------------------------------
// handlers/spaces.rs — space listing/creation and membership
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::anytype::ApiError;
use crate::models::{CreateSpaceRequest, Member, Paginated, Space};
use crate::state::AppState;

use super::PageQuery;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MembersQuery {
    pub space_id: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[utoipa::path(post, path = "/space/create", tag = "spaces",
    request_body = CreateSpaceRequest,
    responses((status = 200, description = "Created space", body = Space))
)]
pub async fn create_space(
    State(state): State<AppState>,
    Json(request): Json<CreateSpaceRequest>,
) -> Result<Json<Space>, ApiError> {
    Ok(Json(state.anytype.create_space(&request).await?))
}

#[utoipa::path(get, path = "/space/list", tag = "spaces",
    params(PageQuery),
    responses((status = 200, description = "Page of spaces", body = Value))
)]
pub async fn list_spaces(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<Space>>, ApiError> {
    Ok(Json(state.anytype.list_spaces(&query.page()).await?))
}

#[utoipa::path(get, path = "/space/members", tag = "spaces",
    params(MembersQuery),
    responses((status = 200, description = "Page of members", body = Value))
)]
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<MembersQuery>,
) -> Result<Json<Paginated<Member>>, ApiError> {
    let page = PageQuery { limit: query.limit, offset: query.offset }.page();
    Ok(Json(state.anytype.list_members(&query.space_id, &page).await?))
}
