use super::*;
use crate::types::JobId;

fn job_id(json: &Value) -> JobId {
    JobId(json["jobId"].as_str().unwrap().parse().unwrap())
}

#[tokio::test]
async fn test_fetch_all_queues_job_and_stores_articles() {
    let (_server, endpoint) = feed_server().await;
    let (app, node, _temp_dir) = create_test_app(vec![rss_source("world", &endpoint)], false).await;

    let (status, json) = send(&app, "GET", "/articles/fetch?skipTranslation=true", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "queued");

    let id = job_id(&json);
    wait_for_job(&node, id).await;

    let (status, job) = send(&app, "GET", &format!("/jobs/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "done");
    assert_eq!(job["source"], "all");

    let (status, articles) = send(&app, "GET", "/articles/local?source=world", None).await;
    assert_eq!(status, StatusCode::OK);
    let articles = articles.as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["url"], "https://news.test/summit");
    assert_eq!(articles[0]["title"], "Summit opens");

    let (_, jobs) = send(&app, "GET", "/jobs", None).await;
    assert_eq!(jobs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fetch_unknown_source_is_404() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, json) = send(&app, "GET", "/articles/fetch/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "source_not_found");
}

#[tokio::test]
async fn test_fetch_single_source_names_the_job() {
    let (_server, endpoint) = feed_server().await;
    let (app, node, _temp_dir) = create_test_app(vec![rss_source("world", &endpoint)], false).await;

    let (status, json) = send(&app, "GET", "/articles/fetch/world", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["source"], "world");

    let job = wait_for_job(&node, job_id(&json)).await;
    assert_eq!(job.source, "world");
    assert_eq!(job.status, crate::types::JobStatus::Done);
}

#[tokio::test]
async fn test_fetch_local_requires_sources() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, _) = send(&app, "POST", "/articles/local/fetch", Some(json!({"sources": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_local_conflicts_without_overwrite() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;
    let body = article_json("https://desk.test/a", "Body text.");

    let (status, json) = send(&app, "POST", "/articles/local/save", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overwritten"], false);

    let (status, json) = send(&app, "POST", "/articles/local/save", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "duplicate");

    let mut body = body;
    body["overwrite"] = json!(true);
    body["title"] = json!("Saved again");
    let (status, json) = send(&app, "POST", "/articles/local/save", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overwritten"], true);

    let (_, articles) = send(&app, "GET", "/articles/local", None).await;
    let articles = articles.as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Saved again");
}

#[tokio::test]
async fn test_save_local_rejects_invalid_article() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, json) = send(
        &app,
        "POST",
        "/articles/local/save",
        Some(article_json("not a url", "Body")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_refetch_skips_existing_and_invalid() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;
    send(
        &app,
        "POST",
        "/articles/local/save",
        Some(article_json("https://desk.test/a", "Body")),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        "/articles/local/refetch",
        Some(json!({"articles": [
            article_json("https://desk.test/a", "Body"),
            article_json("https://desk.test/b", "Body"),
            article_json("ftp://desk.test/c", "Body")
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["added"], 1);
    assert_eq!(json["invalid"], 1);

    let (_, articles) = send(&app, "GET", "/articles/local?limit=1", None).await;
    assert_eq!(articles.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_local_by_encoded_url() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;
    send(
        &app,
        "POST",
        "/articles/local/save",
        Some(article_json("https://desk.test/a", "Body")),
    )
    .await;

    let uri = "/articles/local/delete/https%3A%2F%2Fdesk.test%2Fa";
    let (status, json) = send(&app, "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "https://desk.test/a");
    assert_eq!(json["deleted"], true);

    let (_, json) = send(&app, "DELETE", uri, None).await;
    assert_eq!(json["deleted"], false);
}

#[tokio::test]
async fn test_local_full_ready_and_queued() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let (app, node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, _) = send(&app, "GET", "/articles/local/full", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        "POST",
        "/articles/local/save",
        Some(article_json("https://desk.test/full", "Complete body.")),
    )
    .await;
    let (status, json) = send(
        &app,
        "GET",
        "/articles/local/full?url=https://desk.test/full",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "Complete body.");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Story</title></head><body><article><p>Resolved text.</p></article></body></html>",
        ))
        .mount(&server)
        .await;

    let uri = format!("/articles/local/full?url={}/story", server.uri());
    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "queued");

    let job = wait_for_job(&node, job_id(&json)).await;
    assert_eq!(job.source, "resolve");
    assert_eq!(job.status, crate::types::JobStatus::Done);

    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["content"].as_str().unwrap().contains("Resolved text."));
}

#[tokio::test]
async fn test_analyzed_full_without_ai_is_503() {
    let (app, node, _temp_dir) = create_test_app(vec![], false).await;
    let mut article =
        crate::types::Article::draft("https://desk.test/a", "desk", crate::types::SourceType::Manual);
    article.title = "A".into();
    let id = article.id;
    node.save_local(article, false).await.unwrap();

    let (status, json) = send(&app, "GET", &format!("/articles/analyzed/full?id={}", id), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "not_ready");

    let (status, _) = send(&app, "GET", "/articles/analyzed/full", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyzed_full_queues_then_serves() {
    let (app, node, _temp_dir) = create_test_app(vec![], true).await;
    let mut article =
        crate::types::Article::draft("https://desk.test/a", "desk", crate::types::SourceType::Manual);
    article.title = "A".into();
    article.content = "Some long body.".into();
    let id = article.id;
    node.save_local(article, false).await.unwrap();

    let uri = format!("/articles/analyzed/full?id={}", id);
    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for_job(&node, job_id(&json)).await;

    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["originalId"], id.to_string());
    assert_eq!(json["analyzed"], true);

    let (_, list) = send(&app, "GET", "/articles/analyzed", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/articles/analyzed?id={}", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_minimal_article_then_conflict() {
    let (app, node, _temp_dir) = create_test_app(vec![], false).await;
    let body = json!({"url": "https://x/1", "title": "T", "content": "C"});

    let (status, json) = send(&app, "POST", "/articles/local/save", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = send(&app, "POST", "/articles/local/save", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "duplicate");

    let stored = node.stores().local().unwrap().all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "C");
}
