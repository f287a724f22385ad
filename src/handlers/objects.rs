// ---------------------------------------------------------------------------
// handlers/objects.rs — object CRUD, search, export
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::anytype::ApiError;
use crate::anytype::endpoints::Page;
use crate::models::{
    AnytypeObject, CreateObjectRequest, DeleteObjectRequest, ExportFormat, Icon,
    ObjectExportResponse, Paginated, SearchQuery, SortOptions,
};
use crate::state::AppState;

use super::{AckResponse, PageQuery};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateObjectBody {
    pub space_id: String,
    pub name: String,
    /// Unique key of the object type, e.g. `ot-note`.
    pub type_key: String,
    /// Markdown content for the object body.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub source: Option<String>,
    /// Empty string and absent both mean "no template".
    #[serde(default)]
    pub template_id: Option<String>,
}

impl CreateObjectBody {
    fn into_parts(self) -> (String, CreateObjectRequest) {
        let request = CreateObjectRequest {
            name: self.name,
            type_key: self.type_key,
            body: self.body,
            description: self.description,
            icon: self.icon,
            source: self.source,
            template_id: self.template_id,
        };
        (self.space_id, request)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchBody {
    pub space_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub sort: Option<SortOptions>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GlobalSearchBody {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub sort: Option<SortOptions>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

fn search_query(
    query: String,
    types: Option<Vec<String>>,
    sort: Option<SortOptions>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> SearchQuery {
    let page = Page::clamped(
        limit.unwrap_or(crate::anytype::endpoints::DEFAULT_PAGE_SIZE),
        offset.unwrap_or(0),
    );
    SearchQuery {
        query,
        types,
        sort,
        limit: page.limit,
        offset: page.offset,
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListObjectsQuery {
    pub space_id: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportQuery {
    /// Export format; only `markdown` is supported.
    #[serde(default)]
    pub format: Option<ExportFormat>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[utoipa::path(post, path = "/object/create", tag = "objects",
    request_body = CreateObjectBody,
    responses((status = 200, description = "Created object", body = AnytypeObject))
)]
pub async fn create_object(
    State(state): State<AppState>,
    Json(body): Json<CreateObjectBody>,
) -> Result<Json<AnytypeObject>, ApiError> {
    let (space_id, request) = body.into_parts();
    Ok(Json(state.anytype.create_object(&space_id, &request).await?))
}

#[utoipa::path(get, path = "/object/get/{space_id}/{object_id}", tag = "objects",
    params(
        ("space_id" = String, Path, description = "Space containing the object"),
        ("object_id" = String, Path, description = "Object to fetch"),
    ),
    responses(
        (status = 200, description = "Object details", body = AnytypeObject),
        (status = 404, description = "No such object"),
    )
)]
pub async fn get_object(
    State(state): State<AppState>,
    Path((space_id, object_id)): Path<(String, String)>,
) -> Result<Json<AnytypeObject>, ApiError> {
    Ok(Json(state.anytype.get_object(&space_id, &object_id).await?))
}

#[utoipa::path(get, path = "/object/list", tag = "objects",
    params(ListObjectsQuery),
    responses((status = 200, description = "Page of objects", body = Value))
)]
pub async fn list_objects(
    State(state): State<AppState>,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Json<Paginated<AnytypeObject>>, ApiError> {
    let page = PageQuery { limit: query.limit, offset: query.offset }.page();
    Ok(Json(state.anytype.list_objects(&query.space_id, &page).await?))
}

#[utoipa::path(post, path = "/object/delete", tag = "objects",
    request_body = DeleteObjectRequest,
    responses((status = 200, description = "Object archived", body = AckResponse))
)]
pub async fn delete_object(
    State(state): State<AppState>,
    Json(request): Json<DeleteObjectRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    state
        .anytype
        .delete_object(&request.space_id, &request.object_id)
        .await?;
    Ok(AckResponse::ok())
}

#[utoipa::path(post, path = "/object/search", tag = "search",
    request_body = SearchBody,
    responses((status = 200, description = "Page of matching objects", body = Value))
)]
pub async fn search_objects(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Paginated<AnytypeObject>>, ApiError> {
    let query = search_query(body.query, body.types, body.sort, body.limit, body.offset);
    Ok(Json(state.anytype.search_objects(&body.space_id, &query).await?))
}

#[utoipa::path(post, path = "/object/search/global", tag = "search",
    request_body = GlobalSearchBody,
    responses((status = 200, description = "Page of matching objects across all spaces", body = Value))
)]
pub async fn global_search(
    State(state): State<AppState>,
    Json(body): Json<GlobalSearchBody>,
) -> Result<Json<Paginated<AnytypeObject>>, ApiError> {
    let query = search_query(body.query, body.types, body.sort, body.limit, body.offset);
    Ok(Json(state.anytype.global_search(&query).await?))
}

#[utoipa::path(post, path = "/object/export/{space_id}/{object_id}", tag = "objects",
    params(
        ("space_id" = String, Path, description = "Space containing the object"),
        ("object_id" = String, Path, description = "Object to export"),
        ExportQuery,
    ),
    responses((status = 200, description = "Exported object", body = ObjectExportResponse))
)]
pub async fn export_object(
    State(state): State<AppState>,
    Path((space_id, object_id)): Path<(String, String)>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ObjectExportResponse>, ApiError> {
    let format = query.format.unwrap_or_default();
    Ok(Json(
        state.anytype.export_object(&space_id, &object_id, format).await?,
    ))
}
