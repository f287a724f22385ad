pub mod anytype;
pub mod config;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod session;
pub mod state;

use axum::Router;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::readiness,
        handlers::display_code,
        handlers::exchange_token,
        handlers::validate,
        handlers::logout,
        handlers::create_space,
        handlers::list_spaces,
        handlers::list_members,
        handlers::create_object,
        handlers::get_object,
        handlers::list_objects,
        handlers::delete_object,
        handlers::search_objects,
        handlers::global_search,
        handlers::export_object,
        handlers::list_types,
        handlers::list_templates,
    ),
    components(schemas(
        models::Icon,
        models::Pagination,
        models::Space,
        models::AnytypeObject,
        models::ObjectType,
        models::Template,
        models::Member,
        models::SortDirection,
        models::SortProperty,
        models::SortOptions,
        models::SearchQuery,
        models::CreateSpaceRequest,
        models::CreateObjectRequest,
        models::DeleteObjectRequest,
        models::ExportFormat,
        models::DisplayCodeResponse,
        models::TokenResponse,
        models::ObjectExportResponse,
        handlers::TokenExchangeBody,
        handlers::ValidateResponse,
        handlers::CreateObjectBody,
        handlers::SearchBody,
        handlers::GlobalSearchBody,
        handlers::HealthResponse,
        handlers::AckResponse,
    )),
    tags(
        (name = "auth", description = "Pairing flow and credential lifecycle"),
        (name = "spaces", description = "Space listing, creation, membership"),
        (name = "objects", description = "Object CRUD and export"),
        (name = "search", description = "Scoped and global search"),
        (name = "types", description = "Object types and templates"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::readiness))
        // Auth — display-code and token are the two public routes
        .route("/auth/display-code", post(handlers::display_code))
        .route("/auth/token", post(handlers::exchange_token))
        .route("/auth/validate", get(handlers::validate))
        .route("/auth/logout", post(handlers::logout))
        // Spaces
        .route("/space/create", post(handlers::create_space))
        .route("/space/list", get(handlers::list_spaces))
        .route("/space/members", get(handlers::list_members))
        // Objects
        .route("/object/create", post(handlers::create_object))
        .route(
            "/object/get/{space_id}/{object_id}",
            get(handlers::get_object),
        )
        .route("/object/list", get(handlers::list_objects))
        .route("/object/delete", post(handlers::delete_object))
        .route("/object/search", post(handlers::search_objects))
        .route("/object/search/global", post(handlers::global_search))
        .route(
            "/object/export/{space_id}/{object_id}",
            post(handlers::export_object),
        )
        // Types & templates
        .route("/type/list", get(handlers::list_types))
        .route("/template/list", get(handlers::list_templates))
        // MCP tool surface — same façade, same session store
        .route("/mcp", post(mcp::mcp_handler))
        // OpenAPI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Shared state
        .with_state(state)
}
