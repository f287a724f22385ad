// ---------------------------------------------------------------------------
// Router-level tests: REST adapter end-to-end against a mock upstream.
// ---------------------------------------------------------------------------

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use anytype_gateway::config::Settings;
use anytype_gateway::state::AppState;

/// Build a gateway state pointed at the given upstream, optionally seeded
/// with a configured API key.
fn test_state(upstream: &str, api_key: Option<&str>) -> AppState {
    AppState::new(Settings {
        api_url: upstream.trim_end_matches('/').to_string(),
        api_key: api_key.map(str::to_string),
        session_token: None,
        app_key: None,
        app_name: "gateway-tests".to_string(),
        port: 0,
    })
}

fn app(state: AppState) -> axum::Router {
    anytype_gateway::create_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
//  Health
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn health_returns_200_with_fields() {
    let state = test_state("http://localhost:31009", None);
    let response = app(state).oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    // mark_ready() has not run, so status is "starting"
    assert_eq!(json["status"], "starting");
    assert_eq!(json["app"], "anytype-gateway");
    assert_eq!(json["authenticated"], false);
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn readiness_flips_after_mark_ready() {
    let state = test_state("http://localhost:31009", None);
    let response = app(state.clone()).oneshot(get("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.mark_ready();
    let response = app(state).oneshot(get("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ═══════════════════════════════════════════════════════════════════════════
//  Auth precondition at the REST boundary
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn protected_route_without_credential_is_401_and_no_upstream_call() {
    let server = MockServer::start().await;
    let state = test_state(&server.uri(), None);

    let response = app(state).oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    assert!(json["error"]["request_id"].is_string());

    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "the upstream must not be contacted"
    );
}

#[tokio::test]
async fn pairing_flow_mints_credential_and_authorizes_protected_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/display_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "challenge_id": "ch-1",
            "code": "4812"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "api_key": "key-9" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "sp-1", "name": "Home" }],
            "pagination": { "has_more": false, "total": 1 }
        })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), None);
    let router = app(state);

    let response = router
        .clone()
        .oneshot(post_json("/auth/display-code", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["challenge_id"], "ch-1");

    let response = router
        .clone()
        .oneshot(post_json("/auth/token", json!({ "code": "4812" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["api_key"], "key-9");

    // The same shared store now authorizes protected routes.
    let response = router.oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["id"], "sp-1");
    assert_eq!(json["pagination"]["has_more"], false);
}

#[tokio::test]
async fn upstream_401_is_mapped_and_second_call_skips_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "token expired" }
        })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("stale-key"));
    let router = app(state);

    let response = router.clone().oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router.oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        server.received_requests().await.unwrap().len(),
        1,
        "the rejected credential must not be replayed"
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  Error mapping
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn upstream_404_maps_to_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces/sp-1/objects/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "message": "object not found" }
        })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state)
        .oneshot(get("/object/get/sp-1/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("object not found")
    );
}

#[tokio::test]
async fn upstream_500_maps_to_502() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state).oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn malformed_envelope_maps_to_502_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces/sp-1/objects/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "id": "obj-1" }
        })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state).oneshot(get("/object/get/sp-1/obj-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_RESPONSE");
}

#[tokio::test]
async fn upstream_429_maps_to_429_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "15")
                .set_body_json(json!({ "error": { "message": "slow down" } })),
        )
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state).oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "RATE_LIMITED");
    assert_eq!(json["error"]["retry_after"], 15);
}

#[tokio::test]
async fn unreachable_upstream_maps_to_502() {
    // Nothing listens on this port.
    let state = test_state("http://127.0.0.1:9", Some("key"));
    let response = app(state).oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "UPSTREAM_UNREACHABLE"
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  Request construction through the REST surface
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_object_with_empty_template_omits_the_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/sp-1/objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": { "id": "obj-1", "name": "Note" }
        })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state)
        .oneshot(post_json(
            "/object/create",
            json!({
                "space_id": "sp-1",
                "name": "Note",
                "type_key": "ot-note",
                "template_id": "",
                "body": "# Hello"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], "obj-1");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(
        !sent.as_object().unwrap().contains_key("template_id"),
        "empty template_id must be stripped, got {sent}"
    );
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer key"
    );
}

#[tokio::test]
async fn export_returns_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/sp-1/objects/obj-1/export/markdown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "markdown": "# Title" })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state)
        .oneshot(post_json("/object/export/sp-1/obj-1", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["markdown"], "# Title");
}

#[tokio::test]
async fn delete_object_returns_ack() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/spaces/sp-1/objects/obj-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": { "id": "obj-1", "archived": true }
        })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state)
        .oneshot(post_json(
            "/object/delete",
            json!({ "space_id": "sp-1", "object_id": "obj-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], true);
}

#[tokio::test]
async fn validate_reports_valid_with_accepted_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let state = test_state(&server.uri(), Some("key"));
    let response = app(state).oneshot(get("/auth/validate")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["valid"], true);
}

#[tokio::test]
async fn logout_drops_the_credential() {
    let server = MockServer::start().await;
    let state = test_state(&server.uri(), Some("key"));
    let router = app(state);

    let response = router
        .clone()
        .oneshot(post_json("/auth/logout", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/space/list")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(server.received_requests().await.unwrap().is_empty());
}
