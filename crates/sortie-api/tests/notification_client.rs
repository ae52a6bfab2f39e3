// Integration tests against a mock HTTP server
use std::num::NonZeroU32;

use serde_json::json;
use sortie_api::{ApiError, NotificationClient, NotificationQuery, NotificationType};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_page() -> serde_json::Value {
    json!([
        {
            "id": "a1",
            "type": "NEW_SORTIE",
            "title": "Climbing at Fontainebleau",
            "body": "Jonas created a new sortie",
            "isRead": false,
            "createdAt": "2024-06-01T08:00:00.000Z",
            "data": { "sortieId": "s-42", "sortieTitle": "Bouldering" }
        },
        {
            "id": "a2",
            "type": "PARTICIPATION_ACCEPTED",
            "title": "You're in",
            "body": "Your request was accepted",
            "isRead": false,
            "createdAt": "2024-06-01T08:01:00.500Z",
            "data": { "sortieId": "s-7" }
        }
    ])
}

#[tokio::test]
async fn test_fetch_sends_query_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .and(query_param("unreadOnly", "true"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "10"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_page()))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let query = NotificationQuery::new()
        .limit(NonZeroU32::new(5).unwrap())
        .offset(10);

    let page = client.fetch("tok-123", &query).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "a1");
    assert_eq!(page[0].kind, NotificationType::NewSortie);
    assert_eq!(page[1].data.sortie_id.as_deref(), Some("s-7"));
}

#[tokio::test]
async fn test_fetch_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let page = client.fetch("tok", &NotificationQuery::default()).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_fetch_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })),
        )
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client
        .fetch("stale", &NotificationQuery::default())
        .await
        .unwrap_err();

    match err {
        ApiError::Auth(msg) => assert_eq!(msg, "Token expired"),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client
        .fetch("tok", &NotificationQuery::default())
        .await
        .unwrap_err();

    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    // Grab a free port, then close it so nothing listens there
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let client = NotificationClient::new(format!("http://{addr}")).unwrap();
    let err = client
        .fetch("tok", &NotificationQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client
        .fetch("tok", &NotificationQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn test_empty_token_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client
        .fetch("", &NotificationQuery::default())
        .await
        .unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_acknowledge_patches_read_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/notifications/a1/read"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Notification marked as read" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let ack = client.acknowledge("tok", "a1").await.unwrap();
    assert_eq!(ack.message, "Notification marked as read");
}

#[tokio::test]
async fn test_acknowledge_missing_notification() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/notifications/gone/read"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Not found" })))
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client.acknowledge("tok", "gone").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Server returned 404: Not found");
}

#[tokio::test]
async fn test_acknowledge_all() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/notifications/read-all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let ack = client.acknowledge_all("tok").await.unwrap();
    assert_eq!(ack.message, "ok");
}

#[tokio::test]
async fn test_unread_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 3 })))
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    assert_eq!(client.unread_count("tok").await.unwrap(), 3);
}

#[tokio::test]
async fn test_acknowledge_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/notifications/a1/read"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client.acknowledge("stale", "a1").await.unwrap_err();

    match err {
        ApiError::Auth(msg) => assert_eq!(msg, "Token expired"),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unread_count_unauthorized_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client.unread_count("stale").await.unwrap_err();
    assert!(err.is_auth());
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_unread_count_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .mount(&server)
        .await;

    let client = NotificationClient::new(server.uri()).unwrap();
    let err = client.unread_count("tok").await.unwrap_err();

    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}
