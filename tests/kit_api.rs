// tests/kit_api.rs
// Kit API client behavior against a wiremock collaborator

use kit_mcp::error::KitError;
use kit_mcp::kit::{BroadcastParams, KitClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(mock: &MockServer) -> KitClient {
    KitClient::new("test-key", mock.uri()).unwrap()
}

#[tokio::test]
async fn api_key_header_is_sent() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(header("X-Kit-Api-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tags": []})))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock).list_tags().await.unwrap();
}

#[tokio::test]
async fn list_broadcasts_sends_per_page() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broadcasts"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"broadcasts": []})))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock).list_broadcasts(5).await.unwrap();
}

#[tokio::test]
async fn list_subscribers_filters_by_tag() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscribers"))
        .and(query_param("per_page", "10"))
        .and(query_param("tag_name", "vip customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subscribers": []})))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock)
        .list_subscribers(Some("vip customers"), 10)
        .await
        .unwrap();
}

#[tokio::test]
async fn non_success_status_maps_to_api_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broadcasts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock)
        .await;

    let err = client(&mock).list_broadcasts(10).await.unwrap_err();
    match err {
        KitError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("internal error"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_broadcast_omits_absent_optionals() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/broadcasts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"broadcast": {"id": 1}})))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock)
        .create_broadcast(&BroadcastParams {
            subject: "S".to_string(),
            content: "C".to_string(),
            description: None,
            email_layout_template: None,
            published: None,
            send_at: None,
        })
        .await
        .unwrap();

    let requests = mock.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["subject"], "S");
    assert_eq!(body["content"], "C");
    let object = body.as_object().unwrap();
    assert!(!object.contains_key("description"));
    assert!(!object.contains_key("send_at"));
    assert!(!object.contains_key("published"));
}

#[tokio::test]
async fn tag_subscriber_uses_existing_tag() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tags": [{"id": 2, "name": "vip"}]})),
        )
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscribers"))
        .and(query_param("email_address", "a@b.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"subscribers": [{"id": 7, "email_address": "a@b.com"}]})),
        )
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscribers/7/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tagging": {"id": 11}})))
        .expect(1)
        .mount(&mock)
        .await;

    let result = client(&mock).tag_subscriber("a@b.com", "vip").await.unwrap();
    assert_eq!(result["tagging"]["id"], 11);

    let tag_posts = mock
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/tags" && r.method.to_string() == "POST")
        .count();
    assert_eq!(tag_posts, 0);
}

#[tokio::test]
async fn tag_subscriber_creates_missing_tag() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tags": []})))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/tags"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"tag": {"id": 5, "name": "new"}})),
        )
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscribers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"subscribers": [{"id": 7}]})),
        )
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscribers/7/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tagging": {"id": 12}})))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock).tag_subscriber("a@b.com", "new").await.unwrap();

    let requests = mock.received_requests().await.unwrap();
    let tag_post = requests
        .iter()
        .find(|r| r.url.path() == "/subscribers/7/tags")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&tag_post.body).unwrap();
    assert_eq!(body["tag_id"], 5);
}

#[tokio::test]
async fn tag_subscriber_unknown_email_is_not_found() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tags": [{"id": 2, "name": "vip"}]})),
        )
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscribers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subscribers": []})))
        .mount(&mock)
        .await;

    let err = client(&mock)
        .tag_subscriber("ghost@b.com", "vip")
        .await
        .unwrap_err();
    assert!(matches!(err, KitError::NotFound(_)));
    assert!(err.to_string().contains("ghost@b.com"));
}

#[tokio::test]
async fn delete_broadcast_accepts_empty_body() {
    let mock = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/broadcasts/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;

    let result = client(&mock).delete_broadcast("42").await.unwrap();
    assert!(result.is_null());
}
