//! Response normalizer — turns a [`RawResponse`] into a typed [`Payload`] or
//! an [`ApiError`].
//!
//! The upstream wraps results in per-operation envelopes: lists under `data`
//! (with optional `pagination`), single entities under a named key (`object`,
//! `space`, `member`, `type`, `template`), and a handful of flat auth/export
//! bodies. Each known shape is matched explicitly; anything else is
//! `InvalidResponse` — a response that parses but doesn't match is never
//! coerced to an empty result, because that would be indistinguishable from
//! "legitimately zero items".

use serde_json::Value;

use crate::anytype::error::ApiError;
use crate::anytype::transport::RawResponse;
use crate::models::Pagination;

/// Expected result shape for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{"data": [...], "pagination": {...}}` or a bare JSON array.
    List,
    /// A single entity under the given envelope key, e.g. `{"object": {...}}`.
    Entity(&'static str),
    /// Flat body handed to the caller as-is (auth and export responses).
    Raw,
    /// Success marker only — the body, if any, is discarded.
    Empty,
}

/// Normalized result of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    List {
        data: Vec<Value>,
        pagination: Option<Pagination>,
    },
    Entity(Value),
    Empty,
}

pub fn normalize(shape: Shape, response: &RawResponse) -> Result<Payload, ApiError> {
    check_status(response)?;

    if response.body.trim().is_empty() {
        return match shape {
            Shape::Empty => Ok(Payload::Empty),
            _ => Err(ApiError::InvalidResponse("empty body".into())),
        };
    }

    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::InvalidResponse(format!("body is not valid JSON: {e}")))?;

    // Some endpoints report failure inside a 2xx envelope.
    if let Some(error) = value.get("error")
        && !error.is_null()
    {
        return Err(ApiError::UpstreamError(error_message(&value)));
    }

    match shape {
        Shape::Empty => Ok(Payload::Empty),
        Shape::Raw => Ok(Payload::Entity(value)),
        Shape::Entity(key) => normalize_entity(key, value),
        Shape::List => normalize_list(value),
    }
}

fn normalize_entity(key: &str, value: Value) -> Result<Payload, ApiError> {
    match value {
        Value::Object(mut map) => {
            if let Some(entity @ Value::Object(_)) = map.remove(key) {
                return Ok(Payload::Entity(entity));
            }
            if let Some(entity @ Value::Object(_)) = map.remove("data") {
                return Ok(Payload::Entity(entity));
            }
            Err(ApiError::InvalidResponse(format!(
                "expected an entity under '{key}', got keys [{}]",
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            )))
        }
        other => Err(ApiError::InvalidResponse(format!(
            "expected an object envelope, got {}",
            type_name(&other)
        ))),
    }
}

fn normalize_list(value: Value) -> Result<Payload, ApiError> {
    match value {
        // Unwrapped list — observed from older upstream builds.
        Value::Array(data) => Ok(Payload::List {
            data,
            pagination: None,
        }),
        Value::Object(mut map) => {
            let data = match map.remove("data") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(ApiError::InvalidResponse(format!(
                        "'data' is {}, expected an array",
                        type_name(&other)
                    )));
                }
                None => {
                    return Err(ApiError::InvalidResponse(
                        "list envelope is missing 'data'".into(),
                    ));
                }
            };
            let pagination = match map.remove("pagination") {
                None | Some(Value::Null) => None,
                Some(meta) => Some(serde_json::from_value::<Pagination>(meta).map_err(|e| {
                    ApiError::InvalidResponse(format!("unreadable pagination metadata: {e}"))
                })?),
            };
            Ok(Payload::List { data, pagination })
        }
        other => Err(ApiError::InvalidResponse(format!(
            "expected a list envelope, got {}",
            type_name(&other)
        ))),
    }
}

/// Map the HTTP status onto the error taxonomy. 2xx passes through to body
/// validation; everything else is a definitive upstream answer.
fn check_status(response: &RawResponse) -> Result<(), ApiError> {
    let status = response.status;
    if status.is_success() {
        return Ok(());
    }

    let message = body_error_message(&response.body)
        .unwrap_or_else(|| format!("upstream answered {status}"));

    Err(match status.as_u16() {
        401 | 403 => ApiError::Unauthorized(message),
        404 => ApiError::NotFound(message),
        429 => ApiError::RateLimited {
            message,
            retry_after: response.retry_after,
        },
        400..=499 => ApiError::InvalidRequest(message),
        500..=599 => ApiError::UpstreamError(message),
        _ => ApiError::InvalidResponse(format!("unexpected status {status}")),
    })
}

/// Best-effort extraction of the upstream error message from a failure body.
fn body_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if value.get("error").is_some() || value.get("message").is_some() {
        Some(error_message(&value))
    } else {
        None
    }
}

fn error_message(value: &Value) -> String {
    match value.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(o)) => o
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("upstream reported an error")
            .to_string(),
        _ => value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("upstream reported an error")
            .to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
