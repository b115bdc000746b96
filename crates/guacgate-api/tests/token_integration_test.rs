//! Integration tests for token issuance and asset routing

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use guacgate_api::{build_router, models::*, AppState};
use guacgate_proto::{CipherKey, ConnectionConfig, Credentials, GatewayConfig, TokenCodec};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "node-secret-123";
const KEY: &str = "MySuperSecretKeyForParamsToken12";

fn gateway_config(connection: serde_json::Value) -> GatewayConfig {
    let credentials = Credentials::from_json(
        &json!({
            "authtoken": SECRET,
            "guac_key": KEY,
            "username": "svc-desktop",
            "password": "p@ss"
        })
        .to_string(),
    )
    .unwrap();
    let connection = ConnectionConfig::from_json(&connection.to_string()).unwrap();
    GatewayConfig::new(credentials, connection)
}

/// Public dir with an entry document and one script
fn public_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>client</html>").unwrap();
    std::fs::create_dir(dir.path().join("js")).unwrap();
    std::fs::write(dir.path().join("js").join("client.js"), "console.log(1);").unwrap();
    dir
}

fn create_test_app(connection: serde_json::Value) -> (Router, Arc<AppState>, TempDir) {
    let public = public_dir();
    let state = Arc::new(AppState::new(gateway_config(connection), public.path()));
    (build_router(state.clone()), state, public)
}

fn codec() -> TokenCodec {
    TokenCodec::new(CipherKey::from_bytes(KEY.as_bytes()).unwrap())
}

fn token_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_get_token_success() {
    let (app, _state, _public) = create_test_app(json!({
        "type": "rdp",
        "defaultWidth": 1024,
        "settings": {"hostname": "10.0.0.5", "port": "3389"}
    }));

    let response = app
        .oneshot(token_request(
            "/node/c1n04/5901/getToken",
            json!({"authtoken": SECRET, "height": 600}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let data: TokenResponse = serde_json::from_slice(&body).unwrap();
    let descriptor = codec().open(&data.token).unwrap();

    assert_eq!(descriptor.protocol_type, "rdp");
    assert_eq!(descriptor.width(), Some(1024));
    assert_eq!(descriptor.height(), Some(600));
    assert_eq!(descriptor.settings["hostname"], "10.0.0.5");
    assert!(descriptor.username().is_none());
    assert!(descriptor.password().is_none());
}

#[tokio::test]
async fn test_get_token_embeds_credentials() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp", "useCredentials": true}));

    let response = app
        .oneshot(token_request(
            "/node/c1n04/5901/getToken",
            json!({"authtoken": SECRET, "width": 800, "height": 600}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data: TokenResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let descriptor = codec().open(&data.token).unwrap();

    assert_eq!(descriptor.username(), Some("svc-desktop"));
    assert_eq!(descriptor.password(), Some("p@ss"));
    assert_eq!(descriptor.width(), Some(800));
}

#[tokio::test]
async fn test_get_token_wrong_secret() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let response = app
        .oneshot(token_request(
            "/node/c1n04/5901/getToken",
            json!({"authtoken": "guess"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_bytes(response).await;
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.code.as_deref(), Some("INVALID_AUTHTOKEN"));
    assert!(!error.error.contains("guess"));

    let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(raw.get("token").is_none());
}

#[tokio::test]
async fn test_get_token_missing_secret() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let response = app
        .clone()
        .oneshot(token_request(
            "/node/c1n04/5901/getToken",
            json!({"width": 800}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // No body at all
    let response = app
        .oneshot(
            Request::builder()
                .uri("/node/c1n04/5901/getToken")
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_token_query_string_secret_is_ignored() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let uri = format!("/node/c1n04/5901/getToken?authtoken={}", SECRET);
    let response = app
        .clone()
        .oneshot(token_request(&uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // GET variant is not served
    let response = app
        .oneshot(
            Request::builder()
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_get_token_checks_secret_before_other_fields() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    for body in [
        json!({"authtoken": 12345}),
        json!({"authtoken": ["s"]}),
        json!({"authtoken": "guess", "width": "tall"}),
        json!({"height": [1]}),
        json!([SECRET]),
    ] {
        let response = app
            .clone()
            .oneshot(token_request("/node/h/1/getToken", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "body {}", body);
    }
}

#[tokio::test]
async fn test_get_token_bad_dimension_after_auth() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let response = app
        .oneshot(token_request(
            "/node/h/1/getToken",
            json!({"authtoken": SECRET, "width": "tall"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(error.code.as_deref(), Some("INVALID_REQUEST"));
}

#[tokio::test]
async fn test_get_token_malformed_body() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/node/c1n04/5901/getToken")
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from("{\"authtoken\":"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_token_requires_node_route() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let response = app
        .clone()
        .oneshot(token_request(
            "/node/c1n04/vnc/getToken",
            json!({"authtoken": SECRET}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Without a prefix the request falls through to static assets
    let response = app
        .oneshot(token_request("/getToken", json!({"authtoken": SECRET})))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert!(serde_json::from_slice::<TokenResponse>(&body_bytes(response).await).is_err());
}

#[tokio::test]
async fn test_tokens_use_fresh_ivs() {
    let (app, _state, _public) = create_test_app(json!({"type": "vnc"}));

    let mut tokens = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(token_request(
                "/node/c1n04/5901/getToken",
                json!({"authtoken": SECRET}),
            ))
            .await
            .unwrap();
        let data: TokenResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        tokens.push(guacgate_proto::EncryptedToken::parse(&data.token).unwrap());
    }

    assert_ne!(tokens[0].iv, tokens[1].iv);
}

#[tokio::test]
async fn test_node_index_document() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/node/c1n04/5901/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<html>client</html>");

    // The root document needs a node prefix
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_assets_under_prefix_and_root() {
    let (app, _state, _public) = create_test_app(json!({"type": "rdp"}));

    for uri in [
        "/js/client.js",
        "/node/c1n04/5901/js/client.js",
        "/node/other-host/22/js/client.js",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri {}", uri);
        assert_eq!(body_bytes(response).await, b"console.log(1);");
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/node/c1n04/5901/js/missing.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sustained_traffic_does_not_accumulate_handlers() {
    let (app, state, _public) = create_test_app(json!({"type": "rdp"}));
    let baseline = Arc::strong_count(&state);

    for i in 0..200 {
        let uri = format!("/node/host-{}/{}/js/client.js", i % 7, 5900 + i);
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Handlers only borrow the state built at startup
    assert_eq!(Arc::strong_count(&state), baseline);
}
