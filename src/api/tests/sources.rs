use super::*;

#[tokio::test]
async fn test_list_sources_with_meta() {
    let (app, node, _temp_dir) = create_test_app(
        vec![
            rss_source("world", "https://news.test/world.xml"),
            rss_source("tech", "https://news.test/tech.xml"),
        ],
        false,
    )
    .await;

    let (status, json) = send(&app, "GET", "/sources", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["world", "tech"]);
    assert!(json[0].get("meta").is_none());

    let mut article = crate::types::Article::draft(
        "https://news.test/1",
        "world",
        crate::types::SourceType::Rss,
    );
    article.title = "One".into();
    node.save_local(article, false).await.unwrap();

    let (_, json) = send(&app, "GET", "/sources?withMeta=true", None).await;
    assert_eq!(json[0]["meta"]["articleCount"], 1);
    assert!(json[0]["meta"]["latestPublishedAt"].is_string());
    assert_eq!(json[1]["meta"]["articleCount"], 0);
}

#[tokio::test]
async fn test_update_source_persists_override() {
    let (app, node, temp_dir) =
        create_test_app(vec![rss_source("world", "https://news.test/world.xml")], false).await;

    let (status, json) = send(
        &app,
        "POST",
        "/sources/update",
        Some(json!({"name": "world", "enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["source"]["enabled"], false);
    assert_eq!(json["source"]["endpoint"], "https://news.test/world.xml");

    assert!(!node.sources().get("world").await.unwrap().enabled);
    assert!(temp_dir.path().join("sources.json").exists());

    let (status, json) = send(
        &app,
        "POST",
        "/sources/update",
        Some(json!({"name": "wire", "endpoint": "https://wire.test/feed", "sourceType": "json"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"]["sourceType"], "json");
    assert_eq!(node.sources().sources().await.len(), 2);
}

#[tokio::test]
async fn test_update_source_requires_name() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, json) = send(&app, "POST", "/sources/update", Some(json!({"enabled": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    // New source without an endpoint cannot be merged
    let (status, _) = send(&app, "POST", "/sources/update", Some(json!({"name": "ghost"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
