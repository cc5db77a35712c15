//! HTTP surface: health endpoints, Vonage webhooks and outbound call control.

mod fixtures;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{body_json, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use callbridge_gateway::ServerConfig;
use callbridge_gateway::routes::create_app;
use callbridge_gateway::state::AppState;
use callbridge_gateway::vonage::ApplicationClaims;
use fixtures::{CONNECT_API_KEY, VONAGE_PUBLIC_KEY, test_config, vonage_config};

fn app(config: ServerConfig) -> Router {
    create_app(AppState::new(config).unwrap())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn connect_request(api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/connect")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_and_health_endpoints() {
    let (status, headers, body) = send(app(test_config()), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["message"].is_string());
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");

    for uri in ["/_/health", "/_/metrics"] {
        let (status, _, body) = send(app(test_config()), get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }
}

#[tokio::test]
async fn test_event_webhook_acknowledges() {
    let request = Request::builder()
        .method("POST")
        .uri("/event")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"status": "answered", "uuid": "call-1"}).to_string(),
        ))
        .unwrap();
    let (status, _, body) = send(app(test_config()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (status, _, _) = send(app(test_config()), get("/event")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_answer_returns_ncco() {
    let request = Request::builder()
        .method("POST")
        .uri("/answer")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app(test_config()), request).await;
    assert_eq!(status, StatusCode::OK);

    let ncco: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ncco[0]["action"], "talk");
    assert_eq!(ncco[0]["language"], "ja-JP");
    assert_eq!(ncco[1]["action"], "connect");
    assert_eq!(
        ncco[1]["endpoint"][0],
        json!({
            "type": "websocket",
            "uri": "wss://bridge.example.com/media-stream",
            "content-type": "audio/l16;rate=16000"
        })
    );
}

#[tokio::test]
async fn test_connect_requires_api_key() {
    let config = vonage_config("http://127.0.0.1:9");

    let (status, _, _) = send(
        app(config.clone()),
        connect_request(None, json!({"to": "819012345678"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        app(config),
        connect_request(Some("wrong-key"), json!({"to": "819012345678"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_connect_validates_body() {
    let config = vonage_config("http://127.0.0.1:9");

    let (status, _, body) = send(
        app(config.clone()),
        connect_request(Some(CONNECT_API_KEY), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("`to`"));

    let mut no_from = config;
    no_from.vonage.outbound_from = None;
    let (status, _, _) = send(
        app(no_from),
        connect_request(Some(CONNECT_API_KEY), json!({"to": "819012345678"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_connect_places_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/calls"))
        .and(header_regex("authorization", "^Bearer [A-Za-z0-9_-]+\\.[A-Za-z0-9_-]+\\.[A-Za-z0-9_-]+$"))
        .and(body_json(json!({
            "to": [{"type": "phone", "number": "819012345678"}],
            "from": {"type": "phone", "number": "81312345678"},
            "answer_url": ["https://bridge.example.com/answer"],
            "answer_method": "POST",
            "event_url": ["https://bridge.example.com/event"],
            "event_method": "POST"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "uuid": "63f61863-4a51-4f6b-86e1-46edebcf9356",
            "status": "started",
            "direction": "outbound"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _, body) = send(
        app(vonage_config(&server.uri())),
        connect_request(Some(CONNECT_API_KEY), json!({"to": "819012345678"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "started");

    // The bearer token is an application JWT signed with the configured key
    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0].headers["authorization"].to_str().unwrap();
    let token = authorization.strip_prefix("Bearer ").unwrap();
    let key = DecodingKey::from_rsa_pem(VONAGE_PUBLIC_KEY.as_bytes()).unwrap();
    let claims = decode::<ApplicationClaims>(token, &key, &Validation::new(Algorithm::RS256))
        .unwrap()
        .claims;
    assert_eq!(claims.application_id, "app-0001");
}

#[tokio::test]
async fn test_connect_relays_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/calls"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "title": "Unauthorized",
            "detail": "You did not provide correct credentials."
        })))
        .mount(&server)
        .await;

    let (status, _, body) = send(
        app(vonage_config(&server.uri())),
        connect_request(
            Some(CONNECT_API_KEY),
            json!({"to": "819012345678", "from": "81300000000"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["details"]["title"], "Unauthorized");
}

#[tokio::test]
async fn test_connect_unreachable_api_is_bad_gateway() {
    // Nothing listens on the discard port
    let (status, _, _) = send(
        app(vonage_config("http://127.0.0.1:9")),
        connect_request(Some(CONNECT_API_KEY), json!({"to": "819012345678"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_connect_without_vonage_application_fails() {
    // No keys configured: the route is open, but no token can be signed
    let (status, _, _) = send(
        app(test_config()),
        connect_request(None, json!({"to": "819012345678", "from": "81300000000"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
