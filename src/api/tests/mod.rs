use super::*;
use crate::node::test_helpers::{StubAi, create_test_node, rss_source, wait_for_job};
use crate::sources::Source;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

mod articles;
mod federated;
mod sources;
mod system;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>World</title>
    <link>https://news.test/</link>
    <description>World news</description>
    <item>
      <title>Summit opens</title>
      <link>https://news.test/summit</link>
      <description>Leaders arrive in Berlin.</description>
      <pubDate>Tue, 05 Mar 2024 14:30:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

/// Router over an in-memory node with rate limiting off
async fn create_test_app(
    defaults: Vec<Source>,
    ai: bool,
) -> (Router, Arc<NewsNode>, tempfile::TempDir) {
    let ai: Option<Arc<dyn crate::ai::AiBackend>> = if ai {
        Some(Arc::new(StubAi { fail: false }))
    } else {
        None
    };
    let (node, temp_dir) = create_test_node(defaults, ai).await;
    let node = Arc::new(node);

    let mut config = node.config().clone();
    config.server.api.rate_limit.enabled = false;
    let app = create_router(node.clone(), Arc::new(config));
    (app, node, temp_dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn feed_server() -> (wiremock::MockServer, String) {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;
    let endpoint = format!("{}/feed.xml", server.uri());
    (server, endpoint)
}

fn article_json(url: &str, content: &str) -> Value {
    json!({
        "url": url,
        "title": "Saved",
        "content": content,
        "source": "manual-desk",
        "sourceType": "manual"
    })
}

#[tokio::test]
async fn test_api_server_spawns_and_stops() {
    let (_app, node, _temp_dir) = create_test_app(vec![], false).await;

    let mut config = node.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(start_api_server(node, Arc::new(config), async move {
        let _ = rx.await;
    }));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    tx.send(()).unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (_app, node, _temp_dir) = create_test_app(vec![], false).await;
    let mut config = node.config().clone();
    config.server.api.rate_limit.enabled = false;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(node, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_rate_limit_rejects_after_max_requests() {
    let (_app, node, _temp_dir) = create_test_app(vec![], false).await;
    let mut config = node.config().clone();
    config.server.api.rate_limit.enabled = true;
    config.server.api.rate_limit.max_requests = 2;
    let app = create_router(node, Arc::new(config));

    let client: std::net::SocketAddr = "192.168.1.20:50000".parse().unwrap();
    let request = |uri: &str| {
        let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        request.extensions_mut().insert(ConnectInfo(client));
        request
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(request("/sources")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(request("/sources")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "rate_limited");
    assert!(json["error"]["details"]["retry_after_seconds"].as_u64().unwrap() >= 1);

    // Exempt path still answers
    let response = app.oneshot(request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
