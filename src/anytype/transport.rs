//! Transport — executes one [`RequestDescriptor`] against the upstream
//! application and hands back the raw response.
//!
//! The retry policy lives in [`dispatch`], above the single-attempt
//! [`Transport`] trait: a connection-level failure of an idempotent (GET)
//! request is retried exactly once; an HTTP status is a definitive answer and
//! is never retried here. Timeouts fail immediately — the wait is already
//! bounded. Nothing in this module touches the session store.

use async_trait::async_trait;
use http::{Method, StatusCode};

use crate::anytype::endpoints::RequestDescriptor;
use crate::anytype::error::ApiError;

/// Raw upstream response: status plus the unparsed body text.
/// `retry_after` is the Retry-After header in seconds, when the upstream sent one.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    pub retry_after: Option<u64>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }
}

/// A failure below the HTTP layer — the request never got a status code.
#[derive(Debug, Clone)]
pub enum TransportFailure {
    /// The bounded wait elapsed.
    Timeout(String),
    /// Connect refused, connection reset, DNS failure and friends.
    Connection(String),
}

impl From<TransportFailure> for ApiError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::Timeout(msg) => {
                ApiError::UpstreamUnreachable(format!("request timed out: {msg}"))
            }
            TransportFailure::Connection(msg) => {
                ApiError::UpstreamUnreachable(format!("connection failed: {msg}"))
            }
        }
    }
}

/// One network attempt. Implementations must not retry internally.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportFailure>;
}

/// Execute a descriptor with the client-core retry policy.
pub async fn dispatch(
    transport: &dyn Transport,
    request: &RequestDescriptor,
) -> Result<RawResponse, ApiError> {
    match transport.send(request).await {
        Ok(response) => Ok(response),
        Err(TransportFailure::Connection(msg)) if request.method == Method::GET => {
            tracing::debug!(path = %request.path, error = %msg, "connection failed, retrying once");
            transport.send(request).await.map_err(ApiError::from)
        }
        Err(failure) => Err(failure.into()),
    }
}

// ---------------------------------------------------------------------------
// reqwest-backed transport
// ---------------------------------------------------------------------------

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, request: &RequestDescriptor) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url_for(request))
            .header(http::header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(http::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await.map_err(classify)?;

        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}

fn classify(error: reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Timeout(error.to_string())
    } else {
        TransportFailure::Connection(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::anytype::endpoints::{self, Page};

    /// Scripted transport: pops one canned outcome per attempt.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<RawResponse, TransportFailure>>>,
        attempts: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse, TransportFailure>>) -> Self {
            Self {
                script: Mutex::new(script),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _: &RequestDescriptor) -> Result<RawResponse, TransportFailure> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0)
        }
    }

    fn ok_response() -> RawResponse {
        RawResponse::new(StatusCode::OK, r#"{"data": []}"#)
    }

    fn reset() -> TransportFailure {
        TransportFailure::Connection("connection reset by peer".into())
    }

    #[tokio::test]
    async fn get_retries_connection_failure_once() {
        let transport = ScriptedTransport::new(vec![Err(reset()), Ok(ok_response())]);
        let request = endpoints::list_spaces(&Page::default()).unwrap();
        let response = dispatch(&transport, &request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn two_connection_failures_surface_unreachable() {
        let transport = ScriptedTransport::new(vec![Err(reset()), Err(reset())]);
        let request = endpoints::list_spaces(&Page::default()).unwrap();
        let err = dispatch(&transport, &request).await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnreachable(_)));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let transport =
            ScriptedTransport::new(vec![Err(TransportFailure::Timeout("30s elapsed".into()))]);
        let request = endpoints::list_spaces(&Page::default()).unwrap();
        let err = dispatch(&transport, &request).await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnreachable(_)));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn post_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(reset())]);
        let request = endpoints::global_search(&Default::default()).unwrap();
        let err = dispatch(&transport, &request).await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnreachable(_)));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn http_status_is_never_retried() {
        let transport = ScriptedTransport::new(vec![Ok(RawResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "{}",
        ))]);
        let request = endpoints::list_spaces(&Page::default()).unwrap();
        // dispatch returns the response — status handling is the normalizer's job
        let response = dispatch(&transport, &request).await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    }
}
