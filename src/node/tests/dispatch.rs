use super::*;
use crate::types::Event;

#[tokio::test]
async fn test_dispatch_fetch_all_runs_in_background() {
    let server = MockServer::start().await;
    let endpoint = feed_endpoint(&server).await;
    let (node, _dir) = create_test_node(vec![rss_source("world", &endpoint)], None).await;
    let mut events = node.subscribe();

    let id = node.dispatch_fetch_all(FetchOptions::default()).unwrap();
    let job = wait_for_job(&node, id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.source, "all");
    assert_eq!(job.message.as_deref(), Some("fetched 2, added 2"));
    assert_eq!(node.stores().local().unwrap().count().await.unwrap(), 2);

    // Job status changes arrive in order: queued, running, done
    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::JobStatus { job_id, status, .. } = event
            && job_id == id
        {
            statuses.push(status);
        }
    }
    assert_eq!(
        statuses,
        vec![JobStatus::Queued, JobStatus::Running, JobStatus::Done]
    );
}

#[tokio::test]
async fn test_dispatch_fetch_all_skips_disabled_sources() {
    let server = MockServer::start().await;
    let endpoint = feed_endpoint(&server).await;
    let mut disabled = rss_source("paused", &endpoint);
    disabled.enabled = false;
    let (node, _dir) = create_test_node(vec![disabled], None).await;

    let id = node.dispatch_fetch_all(FetchOptions::default()).unwrap();
    let job = wait_for_job(&node, id).await;
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(node.stores().local().unwrap().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_dispatch_fetch_source_rejects_unknown_and_disabled() {
    let mut paused = rss_source("paused", "https://news.test/feed");
    paused.enabled = false;
    let (node, _dir) = create_test_node(vec![paused], None).await;

    let err = node
        .dispatch_fetch_source("missing", FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Source(SourceError::UnknownSource { name }) if name == "missing"
    ));

    let err = node
        .dispatch_fetch_source("paused", FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Source(SourceError::Disabled { .. })));
    assert!(node.jobs().is_empty());
}

#[tokio::test]
async fn test_dispatch_fetch_source_failure_marks_job_error() {
    let server = MockServer::start().await;
    let bad = serve(&server, "/down", ResponseTemplate::new(503)).await;
    let (node, _dir) = create_test_node(vec![rss_source("down", &bad)], None).await;

    let id = node
        .dispatch_fetch_source("down", FetchOptions::default())
        .await
        .unwrap();
    let job = wait_for_job(&node, id).await;

    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.source, "down");
    assert!(job.message.unwrap().contains("503"));
    let logged = node.debug_log().entries(&Default::default());
    assert!(logged.iter().any(|e| e.level == crate::types::LogLevel::Error));
}

#[tokio::test]
async fn test_dispatch_fetch_sources_uses_supplied_list() {
    let server = MockServer::start().await;
    let endpoint = feed_endpoint(&server).await;
    let (node, _dir) = create_test_node(vec![], None).await;

    assert!(matches!(
        node.dispatch_fetch_sources(vec![], FetchOptions::default()),
        Err(Error::Validation(_))
    ));

    let id = node
        .dispatch_fetch_sources(vec![rss_source("adhoc", &endpoint)], FetchOptions::default())
        .unwrap();
    let job = wait_for_job(&node, id).await;
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.source, "custom");
    assert_eq!(node.stores().local().unwrap().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_dispatch_analysis_needs_ai() {
    let (node, _dir) = create_test_node(vec![], None).await;
    let err = node
        .dispatch_analysis(stored_article("https://news.test/a", "text"))
        .unwrap_err();
    assert!(matches!(err, Error::NotReady(_)));
}

#[tokio::test]
async fn test_dispatch_resolve_then_analyzes() {
    let (node, _dir) = create_test_node(vec![], stub_ai()).await;
    let meta = crate::resolver::ArticleMetadata {
        url: "https://news.test/inline".into(),
        title: Some("Inline".into()),
        content: Some("Inline body".into()),
        ..Default::default()
    };

    let id = node.dispatch_resolve(meta).unwrap();
    let job = wait_for_job(&node, id).await;
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(
        job.message.as_deref(),
        Some("resolved https://news.test/inline, analysis ok")
    );

    let stored = node
        .stores()
        .local()
        .unwrap()
        .get("https://news.test/inline")
        .await
        .unwrap()
        .unwrap();
    assert!(node.find_analyzed(stored.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_dispatch_aggregation_stores_resolved_articles() {
    let server = MockServer::start().await;
    let provider = serve(
        &server,
        "/provider",
        ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"url": "https://wire.test/1", "title": "One", "content": "first", "source": "wire"},
            {"url": "https://wire.test/2", "title": "Two", "content": "second", "source": "wire"}
        ])),
    )
    .await;
    let (node, _dir) = create_test_node(vec![], None).await;

    let id = node.dispatch_aggregation(vec![provider]).unwrap();
    let job = wait_for_job(&node, id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.message.as_deref(), Some("resolved 2, added 2, dropped 0"));
    assert_eq!(node.stores().local().unwrap().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_dispatch_aggregation_without_providers() {
    let (node, _dir) = create_test_node(vec![], None).await;
    assert!(matches!(
        node.dispatch_aggregation(vec![]),
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn test_dispatch_aggregation_all_providers_failing() {
    let server = MockServer::start().await;
    let broken = serve(&server, "/broken", ResponseTemplate::new(500)).await;
    let (node, _dir) = create_test_node(vec![], None).await;

    let id = node.dispatch_aggregation(vec![broken]).unwrap();
    let job = wait_for_job(&node, id).await;
    assert_eq!(job.status, JobStatus::Error);
}
