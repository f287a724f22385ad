//! MCP Server — exposes the Anytype façade operations as tools.
//!
//! External MCP clients discover and call the tools via JSON-RPC 2.0 over
//! HTTP POST at `/mcp`.
//!
//! Supported methods:
//! - `initialize` — server info + capabilities
//! - `notifications/initialized` — client ack (no-op)
//! - `tools/list` — list all available tools
//! - `tools/call` — execute a tool
//! - `ping` — health check
//!
//! A façade error never becomes a JSON-RPC fault: it is returned as a
//! structured `isError` result carrying the error kind, so the invoking agent
//! can inspect it and react.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::anytype::ApiError;
use crate::anytype::endpoints::Page;
use crate::models::{
    CreateObjectRequest, CreateSpaceRequest, ExportFormat, Icon, SearchQuery, SortOptions,
};
use crate::state::AppState;

/// MCP JSON-RPC 2.0 endpoint handler.
pub async fn mcp_handler(
    State(state): State<AppState>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    tracing::debug!(method = %method, "MCP server: incoming request");

    let result = match method {
        "initialize" => handle_initialize(&id),
        "notifications/initialized" => {
            // Client acknowledgment — no response needed for notifications
            return (StatusCode::OK, Json(json!({})));
        }
        "ping" => handle_ping(&id),
        "tools/list" => handle_tools_list(&id),
        "tools/call" => handle_tools_call(&state, &request, &id).await,
        _ => json_rpc_error(id, -32601, &format!("Method not found: {}", method)),
    };

    (StatusCode::OK, Json(result))
}

// ── initialize ──────────────────────────────────────────────────────────────

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": "anytype-gateway",
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Gateway to a local Anytype application: pairing-based authentication, spaces, objects, search, types and templates."
        }
    })
}

// ── ping ────────────────────────────────────────────────────────────────────

fn handle_ping(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {}
    })
}

// ── tools/list ──────────────────────────────────────────────────────────────

fn handle_tools_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": build_tool_list()
        }
    })
}

// ── tools/call ──────────────────────────────────────────────────────────────

async fn handle_tools_call(state: &AppState, request: &Value, id: &Value) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    if tool_name.is_empty() {
        return json_rpc_error(id.clone(), -32602, "Missing 'name' in params");
    }

    tracing::info!(tool = %tool_name, "MCP server: tools/call");

    match execute_tool(state, tool_name, arguments).await {
        Ok(output) => {
            let text = serde_json::to_string_pretty(&output)
                .unwrap_or_else(|_| output.to_string());
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": text }],
                    "isError": false
                }
            })
        }
        Err(e) => {
            // Structured failure: the agent gets the machine-readable kind,
            // never an uncatchable fault.
            let failure = json!({ "code": e.kind(), "message": e.to_string() });
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": failure.to_string() }],
                    "isError": true
                }
            })
        }
    }
}

// ── Tool argument shapes ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ExchangeCodeArgs {
    #[serde(default)]
    challenge_id: Option<String>,
    code: String,
}

#[derive(Deserialize)]
struct CreateSpaceArgs {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct PageArgs {
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct SpacePageArgs {
    space_id: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct ObjectRefArgs {
    space_id: String,
    object_id: String,
}

#[derive(Deserialize)]
struct ExportArgs {
    space_id: String,
    object_id: String,
    #[serde(default)]
    format: Option<ExportFormat>,
}

#[derive(Deserialize)]
struct CreateObjectArgs {
    space_id: String,
    name: String,
    object_type_unique_key: String,
    /// Empty string means "no template".
    #[serde(default)]
    template_id: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Bare emoji, lifted into the structured icon form.
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct SearchArgs {
    space_id: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default)]
    sort: Option<SortOptions>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct GlobalSearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    types: Option<Vec<String>>,
    #[serde(default)]
    sort: Option<SortOptions>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct TemplatesArgs {
    space_id: String,
    type_id: String,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

fn parse<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ApiError> {
    serde_json::from_value(arguments)
        .map_err(|e| ApiError::MalformedRequest(format!("invalid tool arguments: {e}")))
}

fn page_of(limit: Option<u32>, offset: Option<u32>) -> Page {
    Page::clamped(
        limit.unwrap_or(crate::anytype::endpoints::DEFAULT_PAGE_SIZE),
        offset.unwrap_or(0),
    )
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("unserializable result: {e}")))
}

// ── Tool dispatch ───────────────────────────────────────────────────────────

/// Route a tool invocation to the façade operation of the same name.
async fn execute_tool(state: &AppState, name: &str, arguments: Value) -> Result<Value, ApiError> {
    let anytype = &state.anytype;

    match name {
        "request_display_code" => to_value(anytype.create_challenge().await?),
        "exchange_code" => {
            let args: ExchangeCodeArgs = parse(arguments)?;
            to_value(
                anytype
                    .exchange_code(args.challenge_id.as_deref(), &args.code)
                    .await?,
            )
        }
        "validate_token" => {
            let valid = anytype.validate().await?;
            Ok(json!({ "valid": valid }))
        }
        "logout" => {
            anytype.logout().await;
            Ok(json!({ "ok": true }))
        }
        "create_space" => {
            let args: CreateSpaceArgs = parse(arguments)?;
            let request = CreateSpaceRequest {
                name: args.name,
                description: args.description,
            };
            to_value(anytype.create_space(&request).await?)
        }
        "list_spaces" => {
            let args: PageArgs = parse(arguments)?;
            to_value(anytype.list_spaces(&page_of(args.limit, args.offset)).await?)
        }
        "get_space_members" => {
            let args: SpacePageArgs = parse(arguments)?;
            to_value(
                anytype
                    .list_members(&args.space_id, &page_of(args.limit, args.offset))
                    .await?,
            )
        }
        "create_object" => {
            let args: CreateObjectArgs = parse(arguments)?;
            let request = CreateObjectRequest {
                name: args.name,
                type_key: args.object_type_unique_key,
                body: args.body,
                description: args.description,
                icon: args.icon.map(Icon::emoji),
                source: args.source,
                template_id: args.template_id,
            };
            to_value(anytype.create_object(&args.space_id, &request).await?)
        }
        "get_object" => {
            let args: ObjectRefArgs = parse(arguments)?;
            to_value(anytype.get_object(&args.space_id, &args.object_id).await?)
        }
        "list_objects" => {
            let args: SpacePageArgs = parse(arguments)?;
            to_value(
                anytype
                    .list_objects(&args.space_id, &page_of(args.limit, args.offset))
                    .await?,
            )
        }
        "delete_object" => {
            let args: ObjectRefArgs = parse(arguments)?;
            anytype.delete_object(&args.space_id, &args.object_id).await?;
            Ok(json!({ "ok": true }))
        }
        "export_object" => {
            let args: ExportArgs = parse(arguments)?;
            to_value(
                anytype
                    .export_object(
                        &args.space_id,
                        &args.object_id,
                        args.format.unwrap_or_default(),
                    )
                    .await?,
            )
        }
        "search_objects" => {
            let args: SearchArgs = parse(arguments)?;
            let page = page_of(args.limit, args.offset);
            let query = SearchQuery {
                query: args.query,
                types: args.types,
                sort: args.sort,
                limit: page.limit,
                offset: page.offset,
            };
            to_value(anytype.search_objects(&args.space_id, &query).await?)
        }
        "global_search" => {
            let args: GlobalSearchArgs = parse(arguments)?;
            let page = page_of(args.limit, args.offset);
            let query = SearchQuery {
                query: args.query,
                types: args.types,
                sort: args.sort,
                limit: page.limit,
                offset: page.offset,
            };
            to_value(anytype.global_search(&query).await?)
        }
        "list_types" => {
            let args: SpacePageArgs = parse(arguments)?;
            to_value(
                anytype
                    .list_types(&args.space_id, &page_of(args.limit, args.offset))
                    .await?,
            )
        }
        "list_templates" => {
            let args: TemplatesArgs = parse(arguments)?;
            to_value(
                anytype
                    .list_templates(
                        &args.space_id,
                        &args.type_id,
                        &page_of(args.limit, args.offset),
                    )
                    .await?,
            )
        }
        other => Err(ApiError::MalformedRequest(format!("unknown tool '{other}'"))),
    }
}

// ── Tool list ───────────────────────────────────────────────────────────────

/// One tool per façade operation. Schemas mirror the argument structs above.
fn build_tool_list() -> Vec<Value> {
    let page_props = json!({
        "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
        "offset": { "type": "integer", "description": "Items to skip" }
    });

    vec![
        mcp_tool("request_display_code", "Start pairing: ask the Anytype app to display a 4-digit code.", json!({
            "type": "object",
            "properties": {}
        })),
        mcp_tool("exchange_code", "Finish pairing: exchange the displayed code for a bearer credential.", json!({
            "type": "object",
            "properties": {
                "challenge_id": { "type": "string", "description": "Challenge to exchange; defaults to the most recently issued one" },
                "code": { "type": "string", "description": "Code displayed in the Anytype window" }
            },
            "required": ["code"]
        })),
        mcp_tool("validate_token", "Check whether the stored credential is still accepted by the Anytype app.", json!({
            "type": "object",
            "properties": {}
        })),
        mcp_tool("logout", "Drop the stored credential.", json!({
            "type": "object",
            "properties": {}
        })),
        mcp_tool("create_space", "Create a new space.", json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Name of the space" },
                "description": { "type": "string", "description": "Optional description" }
            },
            "required": ["name"]
        })),
        mcp_tool("list_spaces", "List all spaces.", json!({
            "type": "object",
            "properties": page_props
        })),
        mcp_tool("get_space_members", "List the members of a space.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space to inspect" },
                "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
                "offset": { "type": "integer", "description": "Items to skip" }
            },
            "required": ["space_id"]
        })),
        mcp_tool("create_object", "Create a new object in a space. Markdown is supported in the body.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space to create the object in" },
                "name": { "type": "string", "description": "Name of the object" },
                "object_type_unique_key": { "type": "string", "description": "Unique key of the object type, e.g. 'ot-note'" },
                "template_id": { "type": "string", "description": "Template to instantiate. Use \"\" (empty string) for no template." },
                "body": { "type": "string", "description": "Content for the object body, Markdown supported" },
                "description": { "type": "string", "description": "Description of the object" },
                "icon": { "type": "string", "description": "Emoji icon for the object" },
                "source": { "type": "string", "description": "Source URL for the object" }
            },
            "required": ["space_id", "name", "object_type_unique_key"]
        })),
        mcp_tool("get_object", "Fetch the full details of one object.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space containing the object" },
                "object_id": { "type": "string", "description": "Object to fetch" }
            },
            "required": ["space_id", "object_id"]
        })),
        mcp_tool("list_objects", "List the objects in a space.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space to list" },
                "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
                "offset": { "type": "integer", "description": "Items to skip" }
            },
            "required": ["space_id"]
        })),
        mcp_tool("delete_object", "Archive an object.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space containing the object" },
                "object_id": { "type": "string", "description": "Object to archive" }
            },
            "required": ["space_id", "object_id"]
        })),
        mcp_tool("export_object", "Export an object as Markdown.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space containing the object" },
                "object_id": { "type": "string", "description": "Object to export" },
                "format": { "type": "string", "enum": ["markdown"], "description": "Export format" }
            },
            "required": ["space_id", "object_id"]
        })),
        mcp_tool("search_objects", "Search for objects within one space.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space to search" },
                "query": { "type": "string", "description": "Free-text query" },
                "types": { "type": "array", "items": { "type": "string" }, "description": "Restrict to these type keys" },
                "sort": {
                    "type": "object",
                    "description": "Sort criteria",
                    "properties": {
                        "property": { "type": "string", "enum": ["created_date", "last_modified_date", "last_opened_date", "name"] },
                        "direction": { "type": "string", "enum": ["asc", "desc"] }
                    }
                },
                "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
                "offset": { "type": "integer", "description": "Items to skip" }
            },
            "required": ["space_id"]
        })),
        mcp_tool("global_search", "Search for objects across all spaces.", json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text query" },
                "types": { "type": "array", "items": { "type": "string" }, "description": "Restrict to these type keys" },
                "sort": {
                    "type": "object",
                    "description": "Sort criteria",
                    "properties": {
                        "property": { "type": "string", "enum": ["created_date", "last_modified_date", "last_opened_date", "name"] },
                        "direction": { "type": "string", "enum": ["asc", "desc"] }
                    }
                },
                "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
                "offset": { "type": "integer", "description": "Items to skip" }
            }
        })),
        mcp_tool("list_types", "List the object types available in a space.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space to inspect" },
                "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
                "offset": { "type": "integer", "description": "Items to skip" }
            },
            "required": ["space_id"]
        })),
        mcp_tool("list_templates", "List the templates available for an object type.", json!({
            "type": "object",
            "properties": {
                "space_id": { "type": "string", "description": "Space to inspect" },
                "type_id": { "type": "string", "description": "Object type whose templates to list" },
                "limit": { "type": "integer", "description": "Items per page (1-100, default 50)" },
                "offset": { "type": "integer", "description": "Items to skip" }
            },
            "required": ["space_id", "type_id"]
        })),
    ]
}

/// Helper to build a single MCP tool object.
fn mcp_tool(name: &str, description: &str, input_schema: Value) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": input_schema,
    })
}

// ── JSON-RPC error helper ───────────────────────────────────────────────────

fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dispatched_tool_is_listed() {
        let listed: Vec<String> = build_tool_list()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        let dispatched = [
            "request_display_code",
            "exchange_code",
            "validate_token",
            "logout",
            "create_space",
            "list_spaces",
            "get_space_members",
            "create_object",
            "get_object",
            "list_objects",
            "delete_object",
            "export_object",
            "search_objects",
            "global_search",
            "list_types",
            "list_templates",
        ];
        assert_eq!(listed.len(), dispatched.len());
        for name in dispatched {
            assert!(listed.contains(&name.to_string()), "missing tool {name}");
        }
    }

    #[test]
    fn create_object_schema_declares_required_params() {
        let tools = build_tool_list();
        let create = tools
            .iter()
            .find(|t| t["name"] == "create_object")
            .expect("create_object tool");
        let required: Vec<&str> = create["inputSchema"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["space_id", "name", "object_type_unique_key"]);
        assert!(create["inputSchema"]["properties"]["template_id"].is_object());
    }
}
