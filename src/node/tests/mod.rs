use super::test_helpers::{StubAi, create_test_node, rss_source, wait_for_job};
use super::*;
use crate::error::{Error, SourceError};
use crate::fetch::FetchOptions;
use crate::types::{Article, JobStatus, SourceType};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod dispatch;

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
    <item>
      <title>Storm warning</title>
      <link>https://news.test/storm</link>
      <description>Heavy rain expected.</description>
      <pubDate>Mon, 04 Mar 2024 08:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

/// Mount `body` at `route` and return the full endpoint
async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

async fn feed_endpoint(server: &MockServer) -> String {
    serve(
        server,
        "/feed.xml",
        ResponseTemplate::new(200).set_body_string(FEED),
    )
    .await
}

fn stub_ai() -> Option<std::sync::Arc<dyn crate::ai::AiBackend>> {
    Some(std::sync::Arc::new(StubAi { fail: false }))
}

fn stored_article(url: &str, content: &str) -> Article {
    let mut article = Article::draft(url, "bbc", SourceType::Rss);
    article.title = "Stored".into();
    article.content = content.into();
    article
}
