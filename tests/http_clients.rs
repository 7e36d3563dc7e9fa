// tests/http_clients.rs
//
// Raindrop and WordPress clients against a throwaway local axum server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use linkpost_sync::error::Upstream;
use linkpost_sync::publish::wordpress::WordPressClient;
use linkpost_sync::publish::{NewPost, PostFormat, PostStatus, Publisher};
use linkpost_sync::retry::RetryPolicy;
use linkpost_sync::source::raindrop::RaindropClient;
use linkpost_sync::source::BookmarkSource;
use linkpost_sync::SyncError;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_delays(Duration::from_millis(1), Duration::from_millis(5))
}

// ---------- WordPress ----------

#[derive(Clone, Default)]
struct WpMock {
    calls: Arc<AtomicUsize>,
    fail_first: usize,
    fail_status: u16,
}

fn created_post(body: &Value) -> Value {
    json!({
        "id": 101,
        "link": "https://blog.example.com/?p=101",
        "title": { "rendered": body["title"] },
        "status": body["status"],
        "format": body["format"],
    })
}

async fn wp_create(State(mock): State<WpMock>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let n = mock.calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !auth.starts_with("Basic ") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"code": "rest_not_logged_in", "message": "No auth"})));
    }
    if n < mock.fail_first {
        let status = StatusCode::from_u16(mock.fail_status).unwrap();
        return (
            status,
            Json(json!({"code": "rest_invalid_param", "message": "Invalid parameter(s): title"})),
        );
    }
    (StatusCode::CREATED, Json(created_post(&body)))
}

async fn wp_client(mock: WpMock) -> WordPressClient {
    let router = Router::new()
        .route("/wp-json/wp/v2/posts", post(wp_create))
        .with_state(mock);
    let base = serve(router).await;
    WordPressClient::new(&format!("{base}/wp-json/wp/v2"), "admin", "app pass")
        .unwrap()
        .with_retry(fast_retry())
}

#[tokio::test]
async fn wordpress_retries_server_errors_then_succeeds() {
    let mock = WpMock {
        fail_first: 1,
        fail_status: 500,
        ..Default::default()
    };
    let client = wp_client(mock.clone()).await;

    let post = client.publish(&NewPost::link("Hello", "<p>x</p>")).await.unwrap();

    assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
    assert_eq!(post.id, 101);
    assert_eq!(post.title.rendered, "Hello");
    assert_eq!(post.status.as_deref(), Some(PostStatus::Publish.as_str()));
    assert_eq!(post.format.as_deref(), Some(PostFormat::Link.as_str()));
}

#[tokio::test]
async fn wordpress_client_errors_are_not_retried() {
    let mock = WpMock {
        fail_first: usize::MAX,
        fail_status: 400,
        ..Default::default()
    };
    let client = wp_client(mock.clone()).await;

    let err = client.publish(&NewPost::link("Hello", "x")).await.unwrap_err();

    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "Invalid parameter(s): title");
    assert!(matches!(err, SyncError::Publish { code: Some(ref c), .. } if c == "rest_invalid_param"));
}

#[tokio::test]
async fn wordpress_gives_up_after_max_retries() {
    let mock = WpMock {
        fail_first: usize::MAX,
        fail_status: 503,
        ..Default::default()
    };
    let client = wp_client(mock.clone()).await.with_retry(fast_retry().with_max_retries(2));

    let err = client.publish(&NewPost::link("Hello", "x")).await.unwrap_err();

    assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn wordpress_drafts_are_sent_as_drafts() {
    let client = wp_client(WpMock::default()).await;
    let post = client
        .publish(&NewPost::link("Draft", "x").as_draft())
        .await
        .unwrap();
    assert_eq!(post.status.as_deref(), Some("draft"));
}

#[tokio::test]
async fn wordpress_incomplete_success_body_is_rejected() {
    let router = Router::new().route(
        "/wp-json/wp/v2/posts",
        post(|| async { (StatusCode::CREATED, Json(json!({"id": 0, "title": {"rendered": "t"}}))) }),
    );
    let base = serve(router).await;
    let client = WordPressClient::new(&format!("{base}/wp-json/wp/v2/posts/"), "u", "p")
        .unwrap()
        .with_retry(fast_retry());

    let err = client.publish(&NewPost::link("t", "x")).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Publish { upstream: Upstream::Response, code: Some(ref c), .. } if c == "invalid_response"
    ));
}

#[tokio::test]
async fn wordpress_scheduled_status_counts_as_created() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let router = Router::new().route(
        "/wp-json/wp/v2/posts",
        post(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            async {
                (
                    StatusCode::CREATED,
                    Json(json!({"id": 12, "link": "https://b.example/?p=12", "title": {"rendered": "t"}, "status": "future"})),
                )
            }
        }),
    );
    let base = serve(router).await;
    let client = WordPressClient::new(&format!("{base}/wp-json/wp/v2"), "u", "p")
        .unwrap()
        .with_retry(fast_retry());

    let post = client.publish(&NewPost::link("t", "x")).await.unwrap();
    assert_eq!(post.id, 12);
    assert_eq!(post.status.as_deref(), Some("future"));
    assert_eq!(post.format, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wordpress_unreachable_host_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = WordPressClient::new(&format!("http://{addr}/wp-json/wp/v2"), "u", "p")
        .unwrap()
        .with_retry(fast_retry().with_max_retries(1));
    let err = client.publish(&NewPost::link("t", "x")).await.unwrap_err();
    assert!(matches!(err, SyncError::Publish { upstream: Upstream::Network, .. }));
    assert!(err.is_retryable());
}

// ---------- Raindrop ----------

fn raindrop_items() -> Value {
    json!({
        "result": true,
        "items": [
            {"_id": 1, "title": "Old", "note": "", "link": "https://a.example", "created": "2025-01-01T00:00:00Z", "tags": ["blog"]},
            {"_id": 2, "title": "Edited", "note": "n", "link": "https://b.example", "created": "2025-01-01T00:00:00Z", "lastUpdate": "2025-06-01T00:00:00Z", "tags": ["Blog"]},
            {"_id": 3, "title": "New", "note": "*hi*", "link": "https://c.example", "created": "2025-05-01T00:00:00Z", "tags": ["blog", "rust"]},
            {"_id": 4, "title": "No link", "created": "2025-05-02T00:00:00Z", "tags": ["blog"]},
            {"_id": 5, "title": "Other tag", "link": "https://e.example", "created": "2025-05-03T00:00:00Z", "tags": ["misc"]}
        ]
    })
}

async fn raindrop_list(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer rd-token");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"result": false})));
    }
    assert_eq!(q.get("search").map(String::as_str), Some("#blog"));
    assert_eq!(q.get("sort").map(String::as_str), Some("-created"));
    (StatusCode::OK, Json(raindrop_items()))
}

async fn raindrop_client(token: &str) -> RaindropClient {
    let router = Router::new().route("/raindrops/0", get(raindrop_list));
    let base = serve(router).await;
    RaindropClient::new(&base, token, Duration::from_secs(5), 50).unwrap()
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[tokio::test]
async fn raindrop_validates_filters_and_sorts() {
    let client = raindrop_client("rd-token").await;

    let items = client.fetch("blog", None).await.unwrap();
    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    // newest created first; equal creation times keep API order
    assert_eq!(ids, vec!["3", "1", "2"]);
}

#[tokio::test]
async fn raindrop_since_uses_last_update() {
    let client = raindrop_client("rd-token").await;

    let items = client.fetch("blog", Some(ts("2025-03-01T00:00:00Z"))).await.unwrap();
    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "2"]);
}

#[tokio::test]
async fn raindrop_http_errors_carry_status() {
    let client = raindrop_client("wrong").await;

    let err = client.fetch("blog", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch { upstream: Upstream::Status(401), .. }));
    assert_eq!(err.to_string(), "Raindrop API error: Unauthorized");
}

#[tokio::test]
async fn raindrop_unsuccessful_result_is_rejected() {
    let router = Router::new().route(
        "/raindrops/0",
        get(|| async { Json(json!({"result": false, "items": []})) }),
    );
    let base = serve(router).await;
    let client = RaindropClient::new(&base, "t", Duration::from_secs(5), 50).unwrap();

    let err = client.fetch("blog", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch { upstream: Upstream::Response, .. }));
    assert!(!err.is_retryable());
}
