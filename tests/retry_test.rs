//! Integration tests for retry classification against a flaky server.

use anobbs_client::{Client, ClientConfig, ClientError, RequestOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn test_client(base_url: &str) -> Client {
    Client::new(ClientConfig {
        user_agent: "anobbs-client integration test".to_string(),
        base_url: base_url.to_string(),
        appid: None,
        default_options: RequestOptions::default(),
    })
    .expect("Failed to create client")
}

const THREAD_PAGE: &str = r#"{
    "id": 49607, "img": "", "ext": "", "now": "2020-01-01(三)12:00:00",
    "userid": "g3qeXeYq", "name": "无名氏", "email": "", "title": "无标题",
    "content": "这是芦苇", "sage": "0", "admin": "0",
    "replys": [], "replyCount": "0"
}"#;

#[tokio::test]
async fn test_transient_server_errors_are_retried_until_success() {
    init_tracing();
    let mock_server = MockServer::start().await;
    // the first two attempts hit a flaky backend
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(THREAD_PAGE, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let (thread, usage) = client
        .get_thread_page(49607, 1, None, false)
        .await
        .expect("fetch failed");

    assert_eq!(thread.id(), 49607);
    // bandwidth covers all three attempts, the failed ones included
    assert!(usage.bytes_received as usize > THREAD_PAGE.len());
}

#[tokio::test]
async fn test_exhausted_retries_name_operation_and_attempts() {
    init_tracing();
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let options = RequestOptions {
        max_attempts: 2,
        ..RequestOptions::default()
    };
    match client.get_thread_page(49607, 1, Some(&options), false).await {
        Err(ClientError::RetriesExhausted {
            operation,
            attempts,
            source,
        }) => {
            assert_eq!(operation, "get_thread_page");
            assert_eq!(attempts, 2);
            assert!(matches!(*source, ClientError::Http { .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_retried() {
    let mock_server = MockServer::start().await;
    // a truncated body decodes as garbage once, then the backend recovers
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"id": 49"#, "application/json"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(THREAD_PAGE, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let (thread, _) = client
        .get_thread_page(49607, 1, None, false)
        .await
        .expect("fetch failed");
    assert_eq!(thread.id(), 49607);
}

#[tokio::test]
async fn test_permission_denial_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let result = client.get_thread_page(49607, 1, None, false).await;
    match result {
        Err(ClientError::NoPermission { status }) => assert_eq!(status.as_u16(), 403),
        other => panic!("expected NoPermission, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_status_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/thread/id/49607"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let result = client.get_thread_page(49607, 1, None, false).await;
    match result {
        Err(ClientError::Http { status }) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected Http, got {other:?}"),
    }
}
