//! The link-query pipeline: fetch a page, pull the reference links out of its
//! article region, print the cleaned query and open a WOL search for it.

use std::io::Write;

use async_trait::async_trait;
use linkquery_http::{HttpClient, HttpError, RequestOpts};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use scraper::Html;
use thiserror::Error;
use url::Url;

use crate::browser::{BrowserError, BrowserLauncher};
use crate::extract::{extract_link_texts, select_article, unwrap_emphasis};
use crate::normalize::{CleanupOptions, build_query};

/// Search endpoint; `{}` is replaced by the percent-encoded query.
pub const SEARCH_URL_TEMPLATE: &str = "https://wol.jw.org/vi/wol/l/r47/lp-vt?q={}";

/// Printed when the page has no `<article id="article">`.
pub const ARTICLE_NOT_FOUND: &str = "The specified article id was not found.";

// Everything but ASCII alphanumerics and `-._~/` is escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error(transparent)]
    Fetch(#[from] HttpError),
    #[error("failed to write result: {0}")]
    Output(#[from] std::io::Error),
}

/// Source of page bodies for the pipeline.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &Url) -> Result<String, HttpError>;
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_html(&self, url: &Url) -> Result<String, HttpError> {
        self.get_text(url, RequestOpts::default()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub cleanup: CleanupOptions,
    pub open_browser: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            cleanup: CleanupOptions::default(),
            open_browser: true,
        }
    }
}

/// Link texts kept from the article and the query built from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub link_texts: Vec<String>,
    pub query: String,
}

#[derive(Debug)]
pub enum BrowserStatus {
    Opened,
    Skipped,
    Failed(BrowserError),
}

#[derive(Debug)]
pub struct SearchReport {
    pub extraction: Extraction,
    pub search_url: Url,
    pub browser: BrowserStatus,
}

#[derive(Debug)]
pub enum SearchOutcome {
    Completed(SearchReport),
    /// The page had no article region; nothing was opened.
    ArticleMissing,
}

/// Drop every backslash (shell and copy-paste escapes) and surrounding whitespace.
pub fn strip_backslashes(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '\\').collect()
}

/// Turn user input into an absolute URL.
///
/// ```
/// use linkquery_web::search::parse_target_url;
///
/// let url = parse_target_url(r"https://wol.jw.org/vi/wol/d/r47/lp-vt/2024\?q=1").unwrap();
/// assert_eq!(url.as_str(), "https://wol.jw.org/vi/wol/d/r47/lp-vt/2024?q=1");
/// ```
pub fn parse_target_url(raw: &str) -> Result<Url, SearchError> {
    let cleaned = strip_backslashes(raw);
    Url::parse(&cleaned).map_err(|e| SearchError::InvalidUrl {
        input: cleaned,
        reason: e.to_string(),
    })
}

/// Percent-encode a query for use as the `q` value.
pub fn encode_query(query: &str) -> String {
    utf8_percent_encode(query, QUERY_ENCODE_SET).to_string()
}

/// Search URL for `query` built from [`SEARCH_URL_TEMPLATE`].
pub fn search_url(query: &str) -> Result<Url, url::ParseError> {
    Url::parse(&SEARCH_URL_TEMPLATE.replace("{}", &encode_query(query)))
}

/// Parse `body`, locate the article region and build the query.
/// `None` when the page has no article region.
pub fn extract_query(body: &str, cleanup: CleanupOptions) -> Option<Extraction> {
    let mut html = Html::parse_document(body);
    let region = select_article(&html)?;
    unwrap_emphasis(&mut html, region);
    let link_texts = extract_link_texts(&html, region);
    let query = build_query(&link_texts, cleanup);
    Some(Extraction { link_texts, query })
}

/// Run the whole pipeline for one URL.
///
/// The result line (or [`ARTICLE_NOT_FOUND`]) is written to `out` before any
/// browser is launched. Fetch failures are returned untouched; a browser
/// that fails to start is reported in [`SearchReport::browser`] only.
pub async fn run_search<F, L, W>(
    fetcher: &F,
    launcher: &L,
    url: &Url,
    options: SearchOptions,
    out: &mut W,
) -> Result<SearchOutcome, SearchError>
where
    F: PageFetcher + ?Sized,
    L: BrowserLauncher + ?Sized,
    W: Write,
{
    tracing::info!(url = %url, "search.fetch");
    let body = fetcher.fetch_html(url).await?;

    let Some(extraction) = extract_query(&body, options.cleanup) else {
        tracing::info!(url = %url, "search.article_missing");
        writeln!(out, "{ARTICLE_NOT_FOUND}")?;
        out.flush()?;
        return Ok(SearchOutcome::ArticleMissing);
    };

    tracing::info!(
        links = extraction.link_texts.len(),
        query_len = extraction.query.len(),
        "search.query_built"
    );
    writeln!(out, "{}", extraction.query)?;
    out.flush()?;

    let search_url = search_url(&extraction.query).map_err(|e| SearchError::InvalidUrl {
        input: SEARCH_URL_TEMPLATE.to_string(),
        reason: e.to_string(),
    })?;

    let browser = if !options.open_browser {
        BrowserStatus::Skipped
    } else {
        match launcher.open(&search_url) {
            Ok(()) => BrowserStatus::Opened,
            Err(e) => {
                tracing::warn!(error = %e, "search.browser_failed");
                BrowserStatus::Failed(e)
            }
        }
    };

    Ok(SearchOutcome::Completed(SearchReport {
        extraction,
        search_url,
        browser,
    }))
}
