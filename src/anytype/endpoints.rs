//! Request builder — turns a logical operation plus typed parameters into a
//! transport-ready [`RequestDescriptor`].
//!
//! Invariants:
//! - required path parameters must be non-empty; a missing one fails with
//!   `MalformedRequest` before any request exists
//! - only the two pairing operations go out without a bearer token
//! - optional body fields that are absent are never serialized as `null`
//! - same operation + same parameters + same credential ⇒ same descriptor

use http::Method;
use serde_json::{Value, json};

use crate::anytype::error::ApiError;
use crate::models::{CreateObjectRequest, CreateSpaceRequest, ExportFormat, SearchQuery};

/// Version prefix of the upstream API.
pub const BASE_PATH: &str = "/v1";

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination window sent as query parameters on list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_SIZE, offset: 0 }
    }
}

impl Page {
    /// Clamp the limit to the upstream maximum. Offset is passed through —
    /// the upstream may clamp it.
    pub fn clamped(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset,
        }
    }
}

/// A fully built outbound request: everything the transport needs, nothing it
/// has to decide.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path below the configured base URL, starting with [`BASE_PATH`].
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub requires_auth: bool,
    /// Bearer token, attached by the façade after the auth precondition check.
    pub bearer: Option<String>,
}

impl RequestDescriptor {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            requires_auth: true,
            body: None,
            bearer: None,
        }
    }

    fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    fn with_page(self, page: &Page) -> Self {
        self.with_query("limit", page.limit).with_query("offset", page.offset)
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Reject missing path parameters before an invalid path can be constructed.
fn path_param(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::MalformedRequest(format!(
            "required parameter '{name}' is empty"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub fn display_code(app_name: &str) -> Result<RequestDescriptor, ApiError> {
    path_param("app_name", app_name)?;
    Ok(
        RequestDescriptor::new(Method::POST, format!("{BASE_PATH}/auth/display_code"))
            .public()
            .with_query("app_name", app_name),
    )
}

pub fn token_exchange(challenge_id: &str, code: &str) -> Result<RequestDescriptor, ApiError> {
    path_param("challenge_id", challenge_id)?;
    path_param("code", code)?;
    Ok(RequestDescriptor::new(Method::POST, format!("{BASE_PATH}/auth/token"))
        .public()
        .with_query("challenge_id", challenge_id)
        .with_query("code", code))
}

// ---------------------------------------------------------------------------
// Spaces
// ---------------------------------------------------------------------------

pub fn list_spaces(page: &Page) -> Result<RequestDescriptor, ApiError> {
    Ok(RequestDescriptor::new(Method::GET, format!("{BASE_PATH}/spaces")).with_page(page))
}

pub fn create_space(request: &CreateSpaceRequest) -> Result<RequestDescriptor, ApiError> {
    path_param("name", &request.name)?;
    let body = serde_json::to_value(request)
        .map_err(|e| ApiError::MalformedRequest(format!("unserializable space request: {e}")))?;
    Ok(RequestDescriptor::new(Method::POST, format!("{BASE_PATH}/spaces")).with_body(body))
}

pub fn list_members(space_id: &str, page: &Page) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    Ok(
        RequestDescriptor::new(Method::GET, format!("{BASE_PATH}/spaces/{space_id}/members"))
            .with_page(page),
    )
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

pub fn create_object(
    space_id: &str,
    request: &CreateObjectRequest,
) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    path_param("name", &request.name)?;
    path_param("type_key", &request.type_key)?;

    // Absent and "" both mean "no template"; neither reaches the wire, so the
    // two spellings produce identical bodies.
    let mut normalized = request.clone();
    normalized.template_id = normalized.template_id.filter(|t| !t.is_empty());

    let body = serde_json::to_value(&normalized)
        .map_err(|e| ApiError::MalformedRequest(format!("unserializable object request: {e}")))?;
    Ok(
        RequestDescriptor::new(Method::POST, format!("{BASE_PATH}/spaces/{space_id}/objects"))
            .with_body(body),
    )
}

pub fn get_object(space_id: &str, object_id: &str) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    path_param("object_id", object_id)?;
    Ok(RequestDescriptor::new(
        Method::GET,
        format!("{BASE_PATH}/spaces/{space_id}/objects/{object_id}"),
    ))
}

pub fn list_objects(space_id: &str, page: &Page) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    Ok(
        RequestDescriptor::new(Method::GET, format!("{BASE_PATH}/spaces/{space_id}/objects"))
            .with_page(page),
    )
}

pub fn delete_object(space_id: &str, object_id: &str) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    path_param("object_id", object_id)?;
    Ok(RequestDescriptor::new(
        Method::DELETE,
        format!("{BASE_PATH}/spaces/{space_id}/objects/{object_id}"),
    ))
}

pub fn export_object(
    space_id: &str,
    object_id: &str,
    format: ExportFormat,
) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    path_param("object_id", object_id)?;
    Ok(RequestDescriptor::new(
        Method::POST,
        format!(
            "{BASE_PATH}/spaces/{space_id}/objects/{object_id}/export/{}",
            format.as_str()
        ),
    ))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

fn search_body(query: &SearchQuery) -> Value {
    // limit/offset travel as query parameters; everything else is the body.
    let mut body = json!({ "query": query.query });
    if let Some(types) = &query.types {
        body["types"] = json!(types);
    }
    if let Some(sort) = &query.sort {
        body["sort"] = json!(sort);
    }
    body
}

pub fn search_objects(space_id: &str, query: &SearchQuery) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    Ok(
        RequestDescriptor::new(Method::POST, format!("{BASE_PATH}/spaces/{space_id}/search"))
            .with_query("limit", query.limit)
            .with_query("offset", query.offset)
            .with_body(search_body(query)),
    )
}

pub fn global_search(query: &SearchQuery) -> Result<RequestDescriptor, ApiError> {
    Ok(RequestDescriptor::new(Method::POST, format!("{BASE_PATH}/search"))
        .with_query("limit", query.limit)
        .with_query("offset", query.offset)
        .with_body(search_body(query)))
}

// ---------------------------------------------------------------------------
// Types & templates
// ---------------------------------------------------------------------------

pub fn list_types(space_id: &str, page: &Page) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    Ok(
        RequestDescriptor::new(Method::GET, format!("{BASE_PATH}/spaces/{space_id}/types"))
            .with_page(page),
    )
}

pub fn list_templates(
    space_id: &str,
    type_id: &str,
    page: &Page,
) -> Result<RequestDescriptor, ApiError> {
    path_param("space_id", space_id)?;
    path_param("type_id", type_id)?;
    Ok(RequestDescriptor::new(
        Method::GET,
        format!("{BASE_PATH}/spaces/{space_id}/types/{type_id}/templates"),
    )
    .with_page(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_space_id_is_malformed() {
        let err = get_object("", "obj-1").unwrap_err();
        assert!(matches!(err, ApiError::MalformedRequest(_)));
        let err = list_members("  ", &Page::default()).unwrap_err();
        assert!(matches!(err, ApiError::MalformedRequest(_)));
    }

    #[test]
    fn auth_operations_are_public() {
        assert!(!display_code("app").unwrap().requires_auth);
        assert!(!token_exchange("ch", "1234").unwrap().requires_auth);
        assert!(list_spaces(&Page::default()).unwrap().requires_auth);
    }

    #[test]
    fn builder_is_deterministic() {
        let q = SearchQuery { query: "notes".into(), ..Default::default() };
        assert_eq!(search_objects("sp", &q).unwrap(), search_objects("sp", &q).unwrap());
    }

    #[test]
    fn absent_and_empty_template_produce_identical_bodies() {
        let absent = CreateObjectRequest {
            name: "n".into(),
            type_key: "ot-note".into(),
            ..Default::default()
        };
        let empty = CreateObjectRequest {
            template_id: Some(String::new()),
            ..absent.clone()
        };
        let a = create_object("sp", &absent).unwrap();
        let b = create_object("sp", &empty).unwrap();
        assert_eq!(a.body, b.body);
        assert!(!a.body.unwrap().as_object().unwrap().contains_key("template_id"));
    }

    #[test]
    fn real_template_id_is_kept() {
        let req = CreateObjectRequest {
            name: "n".into(),
            type_key: "ot-note".into(),
            template_id: Some("tpl-1".into()),
            ..Default::default()
        };
        let body = create_object("sp", &req).unwrap().body.unwrap();
        assert_eq!(body["template_id"], "tpl-1");
    }

    #[test]
    fn optional_fields_are_omitted_not_null() {
        let req = CreateObjectRequest {
            name: "n".into(),
            type_key: "ot-note".into(),
            ..Default::default()
        };
        let body = create_object("sp", &req).unwrap().body.unwrap();
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["name", "type_key"]);
    }

    #[test]
    fn page_clamps_limit_only() {
        let page = Page::clamped(1000, 99999);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset, 99999);
        assert_eq!(Page::clamped(0, 0).limit, 1);
    }

    #[test]
    fn export_path_carries_format() {
        let desc = export_object("sp", "obj", ExportFormat::Markdown).unwrap();
        assert_eq!(desc.path, "/v1/spaces/sp/objects/obj/export/markdown");
    }
}
