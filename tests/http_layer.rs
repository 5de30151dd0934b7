mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use common::CapturedLogs;
use futures::stream;
use http_body_util::BodyExt;
use logging_starter::{HttpLoggingLayer, LogLevel, LoggingConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use tracing::Level;

async fn create_item(Json(item): Json<Value>) -> impl IntoResponse {
    (StatusCode::CREATED, [("location", "/items/1")], Json(item))
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn streaming() -> Response {
    let chunks = stream::iter(vec![
        Ok::<_, std::convert::Infallible>(Bytes::from("chunk1")),
        Ok(Bytes::from("chunk2")),
    ]);
    Response::builder()
        .header("content-type", "text/plain")
        .body(Body::from_stream(chunks))
        .unwrap()
}

async fn broken() -> Response {
    let chunks = stream::iter(vec![
        Ok(Bytes::from("half")),
        Err(std::io::Error::other("upstream closed")),
    ]);
    Response::new(Body::from_stream(chunks))
}

fn create_test_app(level: LogLevel) -> Router {
    let config = LoggingConfig::builder().level(level).build();
    Router::new()
        .route("/items", post(create_item))
        .route("/hello", get(hello))
        .route("/streaming", get(streaming))
        .route("/broken", get(broken))
        .route_layer(HttpLoggingLayer::new(&config))
}

/// Wait until `count` exit lines were logged; they are written once the
/// response body has been fully streamed.
async fn wait_for_exit_lines(logs: &CapturedLogs, count: usize) -> Vec<(Level, String)> {
    for _ in 0..100 {
        let exits = logs.containing("HTTP Response for Method=");
        if exits.len() >= count {
            return exits;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    logs.containing("HTTP Response for Method=")
}

#[tokio::test]
async fn test_json_request_and_response() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Info)).unwrap();
    let response = server.post("/items").json(&json!({"id": 1, "name": "x"})).await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>(), json!({"id": 1, "name": "x"}));

    let exits = wait_for_exit_lines(&logs, 1).await;
    assert_eq!(exits.len(), 1);

    let entries = logs.containing("Handling HTTP Request");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, Level::INFO);
    assert_eq!(
        entries[0].1,
        r#"Handling HTTP Request: Method=POST /items, Args={arg0: {"id":1,"name":"x"}}"#
    );

    let exit = &exits[0].1;
    assert!(exit.starts_with("HTTP Response for Method=POST /items: Status=201, Headers={"));
    assert!(exit.contains(r#""location": ["/items/1"]"#));
    assert!(exit.ends_with(r#"Body={"id":1,"name":"x"}"#));

    let lines = logs.lines();
    let entry_at = lines.iter().position(|(_, m)| m.starts_with("Handling")).unwrap();
    let exit_at = lines.iter().position(|(_, m)| m.starts_with("HTTP Response")).unwrap();
    assert!(entry_at < exit_at);
}

#[tokio::test]
async fn test_text_body_and_empty_request() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Info)).unwrap();
    let response = server.get("/hello").await;
    assert_eq!(response.text(), "Hello, World!");

    let exits = wait_for_exit_lines(&logs, 1).await;
    assert!(exits[0].1.ends_with(r#"Body="Hello, World!""#));
    assert_eq!(
        logs.containing("Handling HTTP Request")[0].1,
        "Handling HTTP Request: Method=GET /hello, Args={}"
    );
}

#[tokio::test]
async fn test_streaming_response_is_captured_whole() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Warn)).unwrap();
    let response = server.get("/streaming").await;
    assert_eq!(response.text(), "chunk1chunk2");

    let exits = wait_for_exit_lines(&logs, 1).await;
    assert_eq!(exits[0].0, Level::WARN);
    assert!(exits[0].1.contains(r#""content-type": ["text/plain"]"#));
    assert!(exits[0].1.ends_with(r#"Body="chunk1chunk2""#));
}

#[tokio::test]
async fn test_body_stream_failure_is_logged_as_diagnostic() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let app = create_test_app(LogLevel::Info);
    let request = Request::get("/broken").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.into_body().collect().await.is_err());

    let exits = wait_for_exit_lines(&logs, 1).await;
    assert_eq!(exits.len(), 1);
    assert!(exits[0]
        .1
        .starts_with("HTTP Response for Method=GET /broken: Error serializing response: "));
    assert!(exits[0].1.contains("upstream closed"));
}

#[tokio::test]
async fn test_unmatched_routes_are_not_logged() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Info)).unwrap();
    let response = server.get("/missing").expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(logs.containing("Handling HTTP Request").is_empty());
    assert!(logs.containing("HTTP Response for Method=").is_empty());
}

#[tokio::test]
async fn test_oversized_request_body_is_not_buffered_for_the_log() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Info)).unwrap();
    let huge = "x".repeat(3 * 1024 * 1024);
    let response = server
        .post("/items")
        .json(&json!(huge))
        .expect_failure()
        .await;
    // The route's own extractor limit still applies to the forwarded body.
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let entries = logs.containing("Handling HTTP Request");
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].1,
        r#"Handling HTTP Request: Method=POST /items, Args={arg0: "<omitted: body larger than 2097152 bytes>"}"#
    );

    let exits = wait_for_exit_lines(&logs, 1).await;
    assert!(exits[0].1.contains("Status=413"));
}

#[tokio::test]
async fn test_extractor_rejection_is_logged_as_a_response() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Info)).unwrap();
    let response = server
        .post("/items")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert_eq!(
        logs.containing("Handling HTTP Request")[0].1,
        r#"Handling HTTP Request: Method=POST /items, Args={arg0: "{not json"}"#
    );
    let exits = wait_for_exit_lines(&logs, 1).await;
    assert!(exits[0]
        .1
        .starts_with("HTTP Response for Method=POST /items: Status=400, "));
}

#[tokio::test]
async fn test_client_errors_can_skip_the_exit_line() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let config = LoggingConfig::default();
    let app = Router::new()
        .route("/items", post(create_item))
        .route_layer(HttpLoggingLayer::new(&config).skip_client_errors(true));
    let server = axum_test::TestServer::new(app).unwrap();

    let rejected = server
        .post("/items")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .expect_failure()
        .await;
    assert_eq!(rejected.status_code(), StatusCode::BAD_REQUEST);

    let created = server.post("/items").json(&json!({"id": 3})).await;
    assert_eq!(created.status_code(), StatusCode::CREATED);

    let exits = wait_for_exit_lines(&logs, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let exits_after = logs.containing("HTTP Response for Method=");
    assert_eq!(exits.len(), 1);
    assert_eq!(exits_after.len(), 1);
    assert!(exits_after[0].1.contains("Status=201"));
    assert_eq!(logs.containing("Handling HTTP Request").len(), 2);
}

#[tokio::test]
async fn test_middleware_passthrough() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let server = axum_test::TestServer::new(create_test_app(LogLevel::Info)).unwrap();

    let created = server.post("/items").json(&json!({"id": 2})).await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    assert_eq!(created.header("location"), "/items/1");

    let hello = server.get("/hello").await;
    assert_eq!(hello.status_code(), StatusCode::OK);

    let exits = wait_for_exit_lines(&logs, 2).await;
    assert_eq!(exits.len(), 2);
    assert_eq!(logs.containing("Handling HTTP Request").len(), 2);
}
