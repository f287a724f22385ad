// ---------------------------------------------------------------------------
// handlers/meta.rs — object types and templates
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::anytype::ApiError;
use crate::models::{ObjectType, Paginated, Template};
use crate::state::AppState;

use super::PageQuery;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TypesQuery {
    pub space_id: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TemplatesQuery {
    pub space_id: String,
    pub type_id: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[utoipa::path(get, path = "/type/list", tag = "types",
    params(TypesQuery),
    responses((status = 200, description = "Page of object types", body = Value))
)]
pub async fn list_types(
    State(state): State<AppState>,
    Query(query): Query<TypesQuery>,
) -> Result<Json<Paginated<ObjectType>>, ApiError> {
    let page = PageQuery { limit: query.limit, offset: query.offset }.page();
    Ok(Json(state.anytype.list_types(&query.space_id, &page).await?))
}

#[utoipa::path(get, path = "/template/list", tag = "types",
    params(TemplatesQuery),
    responses((status = 200, description = "Page of templates for a type", body = Value))
)]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplatesQuery>,
) -> Result<Json<Paginated<Template>>, ApiError> {
    let page = PageQuery { limit: query.limit, offset: query.offset }.page();
    Ok(Json(
        state
            .anytype
            .list_templates(&query.space_id, &query.type_id, &page)
            .await?,
    ))
}
