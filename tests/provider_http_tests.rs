//! HTTP provider client tests against a mock server: wire shape,
//! pagination, and error classification.

mod common;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use offhours::catalog::Service;
use offhours::errors::ErrorClass;
use offhours::provider::http::HttpProvider;
use offhours::provider::{ApiCall, ProviderApi};

async fn provider(server: &MockServer) -> HttpProvider {
    HttpProvider::new(&server.uri(), "test-token").unwrap()
}

#[tokio::test]
async fn invoke_posts_json_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compute/StopInstances"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({"InstanceIds": ["i-abc123"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Accepted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let call = ApiCall {
        service: Service::Compute,
        action: "StopInstances".to_string(),
        params: json!({"InstanceIds": ["i-abc123"]}),
    };
    let resp = provider(&server).await.invoke(&call).await.unwrap();
    assert_eq!(resp["Accepted"], json!(true));
}

#[tokio::test]
async fn list_page_follows_next_tokens() {
    let server = MockServer::start().await;
    // the second-page mock is more specific; mount it first
    Mock::given(method("POST"))
        .and(path("/compute/DescribeVolumes"))
        .and(body_partial_json(json!({"NextToken": "page2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Volumes": [{"VolumeId": "vol-2"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/compute/DescribeVolumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"Volumes": [{"VolumeId": "vol-1"}], "NextToken": "page2"}),
        ))
        .mount(&server)
        .await;

    let client = provider(&server).await;
    let first = client
        .list_page(Service::Compute, "DescribeVolumes", None, None)
        .await
        .unwrap();
    assert_eq!(first.body["Volumes"][0]["VolumeId"], json!("vol-1"));
    assert_eq!(first.next_token.as_deref(), Some("page2"));

    let second = client
        .list_page(
            Service::Compute,
            "DescribeVolumes",
            None,
            first.next_token.as_deref(),
        )
        .await
        .unwrap();
    assert_eq!(second.body["Volumes"][0]["VolumeId"], json!("vol-2"));
    assert!(second.next_token.is_none());
}

#[tokio::test]
async fn throttling_classifies_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rdb/StartDbInstance"))
        .respond_with(ResponseTemplate::new(429).set_body_json(
            json!({"code": "Throttling", "message": "slow down"}),
        ))
        .mount(&server)
        .await;

    let call = ApiCall {
        service: Service::Rdb,
        action: "StartDbInstance".to_string(),
        params: json!({"DbInstanceId": "orders-primary"}),
    };
    let err = provider(&server).await.invoke(&call).await.unwrap_err();
    assert_eq!(err.status, Some(429));
    assert_eq!(err.code.as_deref(), Some("Throttling"));
    assert_eq!(err.class(), ErrorClass::Transient);
}

#[tokio::test]
async fn already_in_state_classifies_benign() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compute/StopInstances"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            json!({"code": "IncorrectInstanceState", "message": "already stopped"}),
        ))
        .mount(&server)
        .await;

    let call = ApiCall {
        service: Service::Compute,
        action: "StopInstances".to_string(),
        params: json!({"InstanceIds": ["i-abc123"]}),
    };
    let err = provider(&server).await.invoke(&call).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Benign);
}

#[tokio::test]
async fn authorization_failures_classify_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stacks/UpdateStack"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"code": "AccessDenied", "message": "not allowed"}),
        ))
        .mount(&server)
        .await;

    let call = ApiCall {
        service: Service::Stacks,
        action: "UpdateStack".to_string(),
        params: json!({"StackName": "web-tier"}),
    };
    let err = provider(&server).await.invoke(&call).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Permanent);
}

#[tokio::test]
async fn unreachable_provider_classifies_transient() {
    // a port with no listener
    let client = HttpProvider::new("http://127.0.0.1:1", "test-token").unwrap();
    let call = ApiCall {
        service: Service::Compute,
        action: "StopInstances".to_string(),
        params: json!({}),
    };
    let err = client.invoke(&call).await.unwrap_err();
    assert!(err.status.is_none());
    assert_eq!(err.class(), ErrorClass::Transient);
}

#[tokio::test]
async fn unstructured_error_bodies_still_classify_by_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compute/StopInstances"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let call = ApiCall {
        service: Service::Compute,
        action: "StopInstances".to_string(),
        params: json!({}),
    };
    let err = provider(&server).await.invoke(&call).await.unwrap_err();
    assert_eq!(err.status, Some(500));
    assert!(err.code.is_none());
    assert_eq!(err.class(), ErrorClass::Transient);
}
