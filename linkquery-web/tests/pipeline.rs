use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use linkquery_http::{HttpClient, HttpError};
use linkquery_web::{
    ARTICLE_NOT_FOUND, BrowserError, BrowserLauncher, BrowserStatus, CleanupOptions, PageFetcher,
    SearchError, SearchOptions, SearchOutcome, SearchReport, run_search,
};
use linkquery_web::search::encode_query;
use percent_encoding::percent_decode_str;
use reqwest::StatusCode;
use url::Url;

/// Serves one canned body, or one canned failure.
struct CannedPage(Result<String, StatusCode>);

impl CannedPage {
    fn html(body: &str) -> Self {
        Self(Ok(body.to_string()))
    }
}

#[async_trait]
impl PageFetcher for CannedPage {
    async fn fetch_html(&self, url: &Url) -> Result<String, HttpError> {
        match &self.0 {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(HttpError::Status {
                status: *status,
                url: url.to_string(),
                snippet: String::new(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingBrowser {
    opened: Mutex<Vec<Url>>,
    fail: bool,
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &Url) -> Result<(), BrowserError> {
        self.opened.lock().unwrap().push(url.clone());
        if self.fail {
            return Err(BrowserError::NoLauncher {
                url: url.to_string(),
                tried: "headless".into(),
            });
        }
        Ok(())
    }
}

fn target() -> Url {
    Url::parse("https://wol.jw.org/vi/wol/d/r47/lp-vt/102024001").unwrap()
}

fn article(links: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>t</title></head><body>
<nav><a href="/nav">Mục lục 1</a></nav>
<article id="article" class="article">{links}</article>
</body></html>"#
    )
}

async fn run(
    page: &CannedPage,
    browser: &RecordingBrowser,
    options: SearchOptions,
) -> (Result<SearchOutcome, SearchError>, String) {
    let mut out = Vec::new();
    let result = run_search(page, browser, &target(), options, &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

fn completed(outcome: SearchOutcome) -> SearchReport {
    match outcome {
        SearchOutcome::Completed(report) => report,
        SearchOutcome::ArticleMissing => panic!("expected a completed search"),
    }
}

#[tokio::test]
async fn prints_one_line_and_opens_matching_search() {
    let page = CannedPage::html(&article(
        r#"<p>(<a href="/b/1">Khải Huyền 21</a> <a href="/b/2">5</a>;
        <a href="/b/3">Giăng <em>3:16</em></a>; <a href="/b/4">Bài hát 12</a>;
        <a href="/b/5">Khải Huyền</a>)</p>"#,
    ));
    let browser = RecordingBrowser::default();

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;
    let report = completed(result.unwrap());

    assert_eq!(stdout, "Khải Huyền 21 5;Giăng 3:16\n");
    assert_eq!(report.extraction.query, "Khải Huyền 21 5;Giăng 3:16");
    assert_eq!(
        report.extraction.link_texts,
        vec!["Khải Huyền 21", "5", "Giăng 3:16"]
    );
    assert!(matches!(report.browser, BrowserStatus::Opened));

    let opened = browser.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0], report.search_url);
    assert_eq!(
        opened[0].as_str(),
        format!(
            "https://wol.jw.org/vi/wol/l/r47/lp-vt?q={}",
            encode_query("Khải Huyền 21 5;Giăng 3:16")
        )
    );
}

#[tokio::test]
async fn standalone_numbers_join_previous_reference() {
    let page = CannedPage::html(&article(
        r#"<a>Sách Khải Huyền 1</a><a>5</a><a>Ma-thi-ơ   24:14</a>"#,
    ));
    let browser = RecordingBrowser::default();

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;
    completed(result.unwrap());
    assert_eq!(stdout, "Sách Khải Huyền 1 5;Ma-thi-ơ 24:14\n");
}

#[tokio::test]
async fn printed_result_round_trips_through_search_url() {
    let page = CannedPage::html(&article(
        r#"<a>1 Cô-rinh-tô 13:4-7</a><a>Châm ngôn 3:5, 6</a><a>Thi thiên 37:10 &amp; 11</a>"#,
    ));
    let browser = RecordingBrowser::default();

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;
    let report = completed(result.unwrap());

    let raw = report.search_url.query().unwrap().strip_prefix("q=").unwrap();
    let decoded = percent_decode_str(raw).decode_utf8().unwrap();
    assert_eq!(format!("{decoded}\n"), stdout);
}

#[tokio::test]
async fn missing_article_prints_fixed_message_and_opens_nothing() {
    let page = CannedPage::html(
        r#"<html><body><div id="article"><a>Giăng 3:16</a></div></body></html>"#,
    );
    let browser = RecordingBrowser::default();

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;

    assert!(matches!(result.unwrap(), SearchOutcome::ArticleMissing));
    assert_eq!(stdout, format!("{ARTICLE_NOT_FOUND}\n"));
    assert_eq!(stdout, "The specified article id was not found.\n");
    assert!(browser.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn no_surviving_links_gives_empty_query() {
    let page = CannedPage::html(&article(r#"<a>Trang chủ</a><a>Xem thêm</a>"#));
    let browser = RecordingBrowser::default();

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;
    let report = completed(result.unwrap());

    assert_eq!(stdout, "\n");
    assert!(report.extraction.link_texts.is_empty());
    assert_eq!(
        report.search_url.as_str(),
        "https://wol.jw.org/vi/wol/l/r47/lp-vt?q="
    );
    assert_eq!(browser.opened.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn extra_cleanup_is_switchable() {
    let page = CannedPage::html(&article(r#"<a>Rô-ma 12:2;</a><a> Gia-cơ 1:5</a>"#));

    let base = SearchOptions {
        cleanup: CleanupOptions {
            extra_cleanup: false,
        },
        open_browser: false,
    };
    let (_, stdout) = run(&page, &RecordingBrowser::default(), base).await;
    assert_eq!(stdout, "Rô-ma 12:2;; Gia-cơ 1:5\n");

    let extra = SearchOptions {
        open_browser: false,
        ..SearchOptions::default()
    };
    let (_, stdout) = run(&page, &RecordingBrowser::default(), extra).await;
    assert_eq!(stdout, "Rô-ma 12:2;Gia-cơ 1:5\n");
}

#[tokio::test]
async fn fetch_failure_is_fatal_and_silent_on_stdout() {
    let page = CannedPage(Err(StatusCode::NOT_FOUND));
    let browser = RecordingBrowser::default();

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;

    match result {
        Err(SearchError::Fetch(err)) => assert_eq!(err.status(), Some(StatusCode::NOT_FOUND)),
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(stdout.is_empty());
    assert!(browser.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn browser_failure_is_not_an_error() {
    let page = CannedPage::html(&article("<a>Giăng 3:16</a>"));
    let browser = RecordingBrowser {
        fail: true,
        ..Default::default()
    };

    let (result, stdout) = run(&page, &browser, SearchOptions::default()).await;
    let report = completed(result.unwrap());

    assert_eq!(stdout, "Giăng 3:16\n");
    assert!(matches!(report.browser, BrowserStatus::Failed(_)));
}

#[tokio::test]
async fn disabled_browser_is_skipped() {
    let page = CannedPage::html(&article("<a>Giăng 3:16</a>"));
    let browser = RecordingBrowser::default();
    let options = SearchOptions {
        open_browser: false,
        ..SearchOptions::default()
    };

    let (result, _) = run(&page, &browser, options).await;
    assert!(matches!(completed(result.unwrap()).browser, BrowserStatus::Skipped));
    assert!(browser.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn http_client_drives_the_pipeline() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/vi/wol/d/r47/lp-vt/1")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(article("<a>Giăng 3:16</a><a>17</a>"))
        .create_async()
        .await;

    let client = HttpClient::new("linkquery-tests", Duration::from_secs(2)).unwrap();
    let browser = RecordingBrowser::default();
    let url = Url::parse(&format!("{}/vi/wol/d/r47/lp-vt/1", server.url())).unwrap();
    let mut out = Vec::new();

    let outcome = run_search(&client, &browser, &url, SearchOptions::default(), &mut out)
        .await
        .unwrap();

    assert!(matches!(outcome, SearchOutcome::Completed(_)));
    assert_eq!(String::from_utf8(out).unwrap(), "Giăng 3:16 17\n");
}
