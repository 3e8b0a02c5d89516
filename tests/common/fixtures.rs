//! Feed fixtures, mock sources and node construction

use newsnode::config::StoreBackend;
use newsnode::{Config, NewsNode};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// RSS feed with two distinct stories
pub const WORLD_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>World</title>
    <link>https://world.test/</link>
    <description>World desk</description>
    <item>
      <title>Summit opens in Berlin</title>
      <link>https://world.test/summit</link>
      <description>Leaders arrive for two days of talks.</description>
      <pubDate>Tue, 05 Mar 2024 14:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Storm closes ports</title>
      <link>https://world.test/storm</link>
      <description>Shipping halted along the coast.</description>
      <pubDate>Tue, 05 Mar 2024 09:10:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

/// JSON API payload with one story
pub const WIRE_JSON: &str = r#"{"articles": [
  {"url": "https://wire.test/markets", "title": "Markets rally", "description": "Stocks close higher.", "publishedAt": "2024-03-05T16:00:00Z"}
]}"#;

/// Start a mock server answering `/world.xml` and `/wire.json`
pub async fn start_feed_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/world.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(WORLD_FEED),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wire.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(WIRE_JSON),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

/// Config with every file under `dir` and the API on `port`
pub fn test_config(dir: &TempDir, port: u16) -> Config {
    let mut config = Config::default();
    config.persistence.backend = StoreBackend::Sqlite;
    config.persistence.database_path = dir.path().join("newsnode.db");
    config.persistence.sources_path = dir.path().join("sources.json");
    config.persistence.blob_dir = dir.path().join("blobs");
    config.pipeline.skip_translation = true;
    config.aggregation.timeout = Duration::from_secs(5);
    config.server.api.bind_address = ([127, 0, 0, 1], port).into();
    config.server.api.rate_limit.enabled = false;
    config
}

/// Open a node over `config` and register the mock sources as overrides
pub async fn create_node(config: Config, feeds: &MockServer) -> NewsNode {
    let node = NewsNode::new(config).await.expect("node should open");
    register_mock_sources(&node, feeds).await;
    node
}

/// Add `world`, `wire` and `broken` sources pointing at the mock server
pub async fn register_mock_sources(node: &NewsNode, feeds: &MockServer) {
    let entries = [
        ("world", "rss", "/world.xml"),
        ("wire", "json", "/wire.json"),
        ("broken", "rss", "/broken.xml"),
    ];
    for (name, kind, route) in entries {
        let partial = serde_json::json!({
            "endpoint": format!("{}{}", feeds.uri(), route),
            "sourceType": kind,
            "category": "test",
            "enabled": true
        });
        let serde_json::Value::Object(partial) = partial else {
            unreachable!()
        };
        node.sources()
            .update(name, partial)
            .await
            .expect("source override should save");
    }
}

/// Reserve a free local port
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("should find a free port")
}
