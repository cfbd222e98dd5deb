//! Delivery routes exercised in-process.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tokio::sync::mpsc;
use tower::ServiceExt;

use common::*;
use streamserver::api::AppState;
use streamserver::api::routes::health::HealthResponse;
use streamserver::api::routes::{INFO_TEXT, create_router};
use streamserver::monitor::Snapshot;
use streamserver::scheduler::{MonitorState, RefreshRequest, SharedState, refresh_channel};

const REDIRECT_URI: &str = "http://localhost:8181/oauth-callback";

struct Harness {
    router: Router,
    state: SharedState,
    requests: mpsc::Receiver<RefreshRequest>,
    gateway: Arc<StubGateway>,
}

fn harness(state: MonitorState) -> Harness {
    let gateway = Arc::new(StubGateway::new());
    let state = state.into_shared();
    let (handle, requests) = refresh_channel();
    let app = AppState::new(
        state.clone(),
        handle,
        gateway.clone(),
        REDIRECT_URI,
        Duration::from_secs(300),
    );
    Harness {
        router: create_router(app),
        state,
        requests,
        gateway,
    }
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn snapshot_request() -> Request<Body> {
    Request::builder()
        .uri("/stream-data")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("x-real-ip", "10.0.0.1")
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn root_returns_info_text() {
    let h = harness(authorized_state());

    let response = h.router.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, INFO_TEXT);
}

#[tokio::test]
async fn auth_redirects_when_not_authorized() {
    let h = harness(unauthorized_state());

    let response = h.router.oneshot(get("/auth")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let target = url::Url::parse(&location(&response)).unwrap();
    assert_eq!(target.host_str(), Some("id.twitch.tv"));
    let query: Vec<(String, String)> = target.query_pairs().into_owned().collect();
    assert!(query.contains(&("client_id".into(), "client-id".into())));
    assert!(query.contains(&("redirect_uri".into(), REDIRECT_URI.into())));
    assert!(query.contains(&("scope".into(), "user:read:follows".into())));
    assert!(query.contains(&("response_type".into(), "code".into())));
}

#[tokio::test]
async fn auth_redirects_when_token_expires_within_interval() {
    let mut state = authorized_state();
    state.credential.user_token = Some(streamserver::credentials::Token::new(
        "user",
        chrono::Utc::now() + chrono::Duration::seconds(60),
    ));
    let h = harness(state);

    let response = h.router.oneshot(get("/auth")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn auth_welcomes_authorized_account() {
    let h = harness(authorized_state());

    let response = h.router.oneshot(get("/auth")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Welcome to streamserver.");
}

#[tokio::test]
async fn stream_data_requires_binary_content_type() {
    let h = harness(authorized_state());

    let response = h.router.oneshot(get("/stream-data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, INFO_TEXT);
}

#[tokio::test]
async fn stream_data_redirects_without_user_token() {
    let h = harness(unauthorized_state());

    let response = h.router.oneshot(snapshot_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth");
}

#[tokio::test]
async fn stream_data_serves_encoded_snapshot() {
    let mut state = authorized_state();
    state.snapshot.replace_primary(vec![twitch("Alice").with_viewer_count(12)]);
    state.snapshot.replace_secondary(vec![strims("carol")]);
    state.snapshot.mark_fetched(chrono::Utc::now());
    let expected = state.snapshot.clone();
    let h = harness(state);

    let response = h.router.oneshot(snapshot_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    let decoded: Snapshot = bincode::deserialize(&body_bytes(response).await).unwrap();
    assert_eq!(decoded, expected);
}

#[tokio::test]
async fn forced_refresh_is_handed_to_the_orchestrator() {
    let Harness {
        router,
        mut requests,
        ..
    } = harness(authorized_state());
    let receiver = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        let refresh_follows = request.refresh_follows;
        assert!(request.acknowledge());
        refresh_follows
    });

    let response = router
        .oneshot(post("/stream-data?follows=true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(receiver.await.unwrap());
}

#[tokio::test]
async fn forced_refresh_defaults_to_cached_follows() {
    let Harness {
        router,
        mut requests,
        ..
    } = harness(authorized_state());
    let receiver = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        let refresh_follows = request.refresh_follows;
        request.acknowledge();
        refresh_follows
    });

    let response = router.oneshot(post("/stream-data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(!receiver.await.unwrap());
}

#[tokio::test]
async fn forced_refresh_redirects_without_user_token() {
    let h = harness(unauthorized_state());

    let response = h.router.oneshot(post("/stream-data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth");
}

#[tokio::test]
async fn forced_refresh_after_shutdown_is_unavailable() {
    let Harness {
        router, requests, ..
    } = harness(authorized_state());
    drop(requests);

    let response = router.oneshot(post("/stream-data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn callback_without_code_is_bad_request() {
    let h = harness(unauthorized_state());

    let response = h.router.oneshot(get("/oauth-callback")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Access token not found");
}

#[tokio::test]
async fn callback_exchanges_code_and_requests_refresh() {
    let Harness {
        router,
        state,
        mut requests,
        gateway,
    } = harness(unauthorized_state());

    let response = router
        .oneshot(get("/oauth-callback?code=abc123&scope=user%3Aread%3Afollows"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "Authentication successful! You can now close this page."
    );

    // The exchange runs in the background and ends with a refresh request.
    let request = tokio::time::timeout(Duration::from_secs(5), requests.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(request.acknowledge());

    let state = state.lock().await;
    assert_eq!(
        state.credential.user_token.as_ref().unwrap().access_token,
        "user-exchanged"
    );
    assert_eq!(StubGateway::count(&gateway.calls.exchange), 1);
}

#[tokio::test]
async fn failed_exchange_leaves_account_unauthorized() {
    let Harness {
        router,
        state,
        mut requests,
        gateway,
    } = harness(unauthorized_state());
    *gateway.exchange.lock().unwrap() = Reply::Unauthorized;

    let response = router
        .oneshot(get("/oauth-callback?code=bad"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = tokio::time::timeout(Duration::from_millis(200), requests.recv()).await;
    assert!(received.is_err());
    assert!(state.lock().await.credential.user_token.is_none());
}

#[tokio::test]
async fn health_reports_state() {
    let mut state = authorized_state();
    state.snapshot.mark_fetched(chrono::Utc::now());
    let h = harness(state);

    let response = h.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.user_authorized);
    assert!(health.last_fetched.is_some());
}
