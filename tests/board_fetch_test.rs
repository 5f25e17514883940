//! Integration tests for the board listing retrieval workflow.

use anobbs_client::{Client, ClientConfig, ClientError, RequestOptions, UserCookie};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> Client {
    Client::new(ClientConfig {
        user_agent: "anobbs-client integration test".to_string(),
        base_url: base_url.to_string(),
        appid: None,
        default_options: RequestOptions::default(),
    })
    .expect("Failed to create client")
}

/// Board listing payload: thread records in server order, each carrying
/// its own first page of replies.
const BOARD_PAGE: &str = r#"[
    {"id": 101, "img": "", "ext": "", "now": "2020-01-01(三)12:00:00",
     "userid": "AAAA1111", "name": "无名氏", "email": "", "title": "无标题",
     "content": "第一串", "sage": "0", "admin": "0",
     "replys": [], "replyCount": "0"},
    {"id": 99, "img": "", "ext": "", "now": "2020-01-01(三)11:00:00",
     "userid": "BBBB2222", "name": "无名氏", "email": "", "title": "无标题",
     "content": "第二串", "sage": "0", "admin": "0",
     "replys": [], "replyCount": "5"}
]"#;

#[tokio::test]
async fn test_fetch_board_page() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/showf/id/4"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BOARD_PAGE, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let (board, usage) = client.get_board_page(4, 1, None).await.expect("fetch failed");

    // server order is preserved, not sorted by id
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].id(), 101);
    assert_eq!(board[1].id(), 99);
    assert_eq!(board[1].total_reply_count(), 5);
    assert!(usage.bytes_sent > 0);
    assert!(usage.bytes_received as usize >= BOARD_PAGE.len());
}

#[tokio::test]
async fn test_board_page_at_gatekeeper_is_served() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/showf/id/4"))
        .and(query_param("page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BOARD_PAGE, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    // boundary is inclusive: the gatekeeper page itself is still served
    let options = RequestOptions {
        user_cookie: Some(UserCookie::new("test-hash")),
        ..RequestOptions::default()
    };
    client
        .get_board_page(4, 100, Some(&options))
        .await
        .expect("fetch failed");
}

// boards gate hard past the ceiling: beyond it the server loops back to
// stale listings, so the request is refused even with a cookie. Threads
// deliberately have no such ceiling (see thread_fetch_test).
#[tokio::test]
async fn test_board_page_past_gatekeeper_is_gated_despite_cookie() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BOARD_PAGE, "application/json"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let options = RequestOptions {
        user_cookie: Some(UserCookie::new("test-hash")),
        ..RequestOptions::default()
    };
    match client.get_board_page(4, 101, Some(&options)).await {
        Err(ClientError::Gated {
            context,
            page,
            gatekeeper_page,
        }) => {
            assert_eq!(context, "board");
            assert_eq!(page, 101);
            assert_eq!(gatekeeper_page, 100);
        }
        other => panic!("expected Gated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_board_payload_of_unexpected_shape_is_surfaced() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/showf/id/4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"error": "维护中"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let result = client.get_board_page(4, 1, None).await;
    match result {
        Err(ClientError::UnknownResponse { body }) => assert!(body.contains("维护中")),
        other => panic!("expected UnknownResponse, got {other:?}"),
    }
}
