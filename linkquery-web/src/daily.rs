//! Daily text from the WOL feed: the scripture line and the comment under it.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use ego_tree::iter::Edge;
use linkquery_http::{HttpClient, HttpError, RequestOpts};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const WOL_BASE: &str = "https://wol.jw.org/";
const SHARE_BASE: &str = "https://www.jw.org/finder";

static EMPHASIS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("em").expect("EMPHASIS: hardcoded selector is valid"));

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("PARAGRAPH: hardcoded selector is valid"));

#[derive(Debug, Error)]
pub enum DailyError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("daily text feed for {0} has no items")]
    NoItems(NaiveDate),
    #[error("invalid daily text URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct DailyFeed {
    #[serde(default)]
    items: Vec<DailyItem>,
}

#[derive(Debug, Deserialize)]
struct DailyItem {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyText {
    pub date: NaiveDate,
    pub scripture: String,
    pub text: String,
}

/// Where and in which language to read the daily text.
#[derive(Debug, Clone)]
pub struct DailySource {
    base: Url,
    locale: String,
    r_version: u32,
}

impl DailySource {
    /// `locale` is the WOL language code (`vt`, `e`, `s`, ...) and
    /// `r_version` its matching resource number (`47`, `1`, `4`, ...).
    pub fn new(locale: &str, r_version: u32) -> Result<Self, DailyError> {
        Ok(Self {
            base: Url::parse(WOL_BASE)?,
            locale: locale.to_lowercase(),
            r_version,
        })
    }

    /// Point the feed at another host, e.g. a local mock server.
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    /// Feed URL for one day.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use linkquery_web::daily::DailySource;
    ///
    /// let source = DailySource::new("VT", 47).unwrap();
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    /// assert_eq!(
    ///     source.feed_url(date).unwrap().as_str(),
    ///     "https://wol.jw.org/wol/dt/r47/lp-vt/2024/03/09"
    /// );
    /// ```
    pub fn feed_url(&self, date: NaiveDate) -> Result<Url, DailyError> {
        let path = format!(
            "wol/dt/r{}/lp-{}/{}/{:02}/{:02}",
            self.r_version,
            self.locale,
            date.year(),
            date.month(),
            date.day()
        );
        Ok(self.base.join(&path)?)
    }

    /// jw.org page for the same day, suitable for opening in a browser.
    pub fn share_url(&self, date: NaiveDate) -> Result<Url, DailyError> {
        let date_param = date.format("%Y%m%d").to_string();
        let locale = self.locale.to_uppercase();
        Ok(Url::parse_with_params(
            SHARE_BASE,
            &[
                ("srcid", "jwlshare"),
                ("wtlocale", locale.as_str()),
                ("prefer", "lang"),
                ("alias", "daily-text"),
                ("date", date_param.as_str()),
            ],
        )?)
    }

    pub async fn fetch(&self, client: &HttpClient, date: NaiveDate) -> Result<DailyText, DailyError> {
        let url = self.feed_url(date)?;
        tracing::info!(url = %url, "daily.fetch");
        let feed: DailyFeed = client.get_json(&url, RequestOpts::default()).await?;
        let item = feed.items.into_iter().next().ok_or(DailyError::NoItems(date))?;
        let (scripture, text) = parse_daily_content(&item.content);
        Ok(DailyText {
            date,
            scripture,
            text,
        })
    }
}

/// Split a daily-text HTML fragment into its scripture and comment (second
/// `p`). The scripture runs from the first `em` to the last `em` of the same
/// paragraph, citation text in between included. Missing parts come back
/// empty.
pub fn parse_daily_content(content: &str) -> (String, String) {
    let fragment = Html::parse_fragment(content);
    let root = fragment.root_element();
    let scripture = root
        .select(&EMPHASIS)
        .next()
        .map(|first| collapse_whitespace(&emphasis_span(first)))
        .unwrap_or_default();
    let text = root
        .select(&PARAGRAPH)
        .nth(1)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .unwrap_or_default();
    (scripture, text)
}

fn emphasis_span(first: ElementRef<'_>) -> String {
    let line = first
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "p");
    let Some(line) = line else {
        return first.text().collect();
    };
    let Some(last) = line.select(&EMPHASIS).last() else {
        return first.text().collect();
    };

    let mut span = String::new();
    let mut inside = false;
    for edge in line.traverse() {
        match edge {
            Edge::Open(node) if node.id() == first.id() => inside = true,
            Edge::Close(node) if node.id() == last.id() => break,
            Edge::Open(node) if inside => {
                if let Some(text) = node.value().as_text() {
                    span.push_str(text);
                }
            }
            _ => {}
        }
    }
    span
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
