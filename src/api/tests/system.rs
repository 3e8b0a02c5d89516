use super::*;

#[tokio::test]
async fn test_health_reports_store_readiness() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["stores"]["local"], true);
    assert_eq!(json["ai"], false);
    assert_eq!(json["acceptingJobs"], true);
}

#[tokio::test]
async fn test_openapi_json_is_served() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, json) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/articles/local"].is_object());
}

#[tokio::test]
async fn test_get_unknown_job_is_404() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let uri = format!("/jobs/{}", uuid::Uuid::new_v4());
    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_debug_log_append_and_filter() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, entry) = send(
        &app,
        "POST",
        "/debug/log",
        Some(json!({"message": "dashboard opened", "meta": {"page": "home"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["level"], "info");
    assert_eq!(entry["meta"]["page"], "home");

    send(
        &app,
        "POST",
        "/debug/log",
        Some(json!({"message": "render failed", "level": "error"})),
    )
    .await;

    let (status, all) = send(&app, "GET", "/debug/logs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, errors) = send(&app, "GET", "/debug/logs?level=error", None).await;
    let errors = errors.as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["message"], "render failed");

    let (status, _) = send(&app, "POST", "/debug/log", Some(json!({"message": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
