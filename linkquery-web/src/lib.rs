//! Page extraction and search dispatch.
//!
//! - Article-region lookup, `em` unwrapping and link filtering (`extract`)
//! - Joining and fixed-point cleanup of the query string (`normalize`)
//! - The fetch -> extract -> print -> open pipeline (`search`)
//! - Default-browser launching behind a trait (`browser`)
//! - The WOL daily text feed (`daily`)

pub mod browser;
pub mod daily;
pub mod extract;
pub mod normalize;
pub mod search;

pub use browser::{BrowserError, BrowserLauncher, SystemBrowser};
pub use normalize::CleanupOptions;
pub use search::{
    ARTICLE_NOT_FOUND, BrowserStatus, PageFetcher, SearchError, SearchOptions, SearchOutcome,
    SearchReport, run_search,
};
