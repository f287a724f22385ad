//! Error taxonomy for the Anytype client core.
//!
//! Every failure in the request builder, transport, or response normalizer is
//! mapped into exactly one of these variants before it reaches the façade —
//! callers never see a raw reqwest or serde error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable credential, or the upstream rejected the one we sent (401/403).
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The upstream answered 404 for the addressed entity.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream rejected the request as invalid (4xx other than 401/403/404/429).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream answered 429. `retry_after` is a hint in seconds when the
    /// upstream sent one; treat it as advisory.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// The upstream answered 5xx or reported an error inside a 2xx envelope.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// The upstream could not be reached: connection failure or timeout.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The upstream answered 2xx but the body does not match the expected
    /// envelope shape for the operation.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built — a required parameter was missing or empty.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl ApiError {
    /// Stable machine-readable kind string, shared by both front ends.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::UpstreamError(_) => "UPSTREAM_ERROR",
            ApiError::UpstreamUnreachable(_) => "UPSTREAM_UNREACHABLE",
            ApiError::InvalidResponse(_) => "INVALID_RESPONSE",
            ApiError::MalformedRequest(_) => "MALFORMED_REQUEST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(ApiError::Unauthorized(String::new()).kind(), "UNAUTHORIZED");
        assert_eq!(ApiError::NotFound(String::new()).kind(), "NOT_FOUND");
        assert_eq!(
            ApiError::RateLimited { message: String::new(), retry_after: Some(30) }.kind(),
            "RATE_LIMITED"
        );
        assert_eq!(
            ApiError::MalformedRequest(String::new()).kind(),
            "MALFORMED_REQUEST"
        );
    }
}
