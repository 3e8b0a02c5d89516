use super::*;

#[tokio::test]
async fn test_federated_pointer_add_and_list() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;
    let pointer = json!({
        "cid": "bafy-summit",
        "url": "https://peer.test/summit",
        "title": "Summit opens",
        "source": "peer"
    });

    let (status, json) = send(&app, "POST", "/articles/federated", Some(pointer.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["added"], true);

    let (_, json) = send(&app, "POST", "/articles/federated", Some(pointer)).await;
    assert_eq!(json["added"], false);

    let (status, list) = send(&app, "GET", "/articles/federated", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["cid"], "bafy-summit");
}

#[tokio::test]
async fn test_federated_pointer_needs_http_url() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, _) = send(
        &app,
        "POST",
        "/articles/federated",
        Some(json!({"cid": "bafy", "url": "ipfs://bafy"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_aggregate_without_providers_is_400() {
    let (app, _node, _temp_dir) = create_test_app(vec![], false).await;

    let (status, json) = send(&app, "POST", "/articles/aggregate", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_aggregate_queues_job() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (app, node, _temp_dir) = create_test_app(vec![], false).await;
    let endpoint = format!("{}/articles", server.uri());

    let (status, json) = send(
        &app,
        "POST",
        "/articles/aggregate",
        Some(json!({"endpoints": [endpoint]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let id = crate::types::JobId(json["jobId"].as_str().unwrap().parse().unwrap());
    let job = wait_for_job(&node, id).await;
    assert_eq!(job.source, "aggregate");
}
