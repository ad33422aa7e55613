use linkquery_http::{HttpClient, HttpError, RequestOpts};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

fn client() -> HttpClient {
    HttpClient::new("linkquery-tests", Duration::from_secs(2))
        .expect("client builds")
        .with_timeout(Duration::from_secs(5))
}

fn url(base: &str, path: &str) -> Url {
    Url::parse(&format!("{base}{path}")).expect("valid url")
}

#[tokio::test]
async fn get_text_returns_body_on_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/vi/wol/d/r47/lp-vt/2024")
        .match_header("user-agent", "linkquery-tests")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<article id=\"article\"><a>Giăng 3:16</a></article>")
        .create_async()
        .await;

    let body = client()
        .get_text(&url(&server.url(), "/vi/wol/d/r47/lp-vt/2024"), RequestOpts::default())
        .await
        .expect("success");

    assert!(body.contains("Giăng 3:16"));
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("not here")
        .expect(1)
        .create_async()
        .await;

    let err = client()
        .get_text(&url(&server.url(), "/missing"), RequestOpts::default())
        .await
        .expect_err("404 must fail");

    match &err {
        HttpError::Status { status, snippet, .. } => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(snippet, "not here");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    // exactly one attempt, no retries
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/flaky")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let err = client()
        .get_text(&url(&server.url(), "/flaky"), RequestOpts::default())
        .await
        .expect_err("503 must fail");

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    mock.assert_async().await;
}

#[derive(Debug, Deserialize)]
struct Feed {
    items: Vec<serde_json::Value>,
}

#[tokio::test]
async fn get_json_decodes_payload() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/feed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items":[{"content":"<p>x</p>"}]}"#)
        .create_async()
        .await;

    let feed: Feed = client()
        .get_json(&url(&server.url(), "/feed"), RequestOpts::default())
        .await
        .expect("decodes");
    assert_eq!(feed.items.len(), 1);
}

#[tokio::test]
async fn get_json_reports_decode_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/feed")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = client()
        .get_json::<Feed>(&url(&server.url(), "/feed"), RequestOpts::default())
        .await
        .expect_err("html is not json");
    match err {
        HttpError::Decode(_, snippet) => assert!(snippet.contains("not json")),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    // Port 1 (tcpmux) is not listening on test machines.
    let err = client()
        .get_text(&url("http://127.0.0.1:1", "/"), RequestOpts::default())
        .await
        .expect_err("nothing listens on port 1");
    assert!(matches!(err, HttpError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn non_http_schemes_are_rejected() {
    let err = client()
        .get_text(
            &Url::parse("file:///etc/hosts").unwrap(),
            RequestOpts::default(),
        )
        .await
        .expect_err("file urls are not fetched");
    assert!(matches!(err, HttpError::Url(_)));
}
