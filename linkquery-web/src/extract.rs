//! Content-region lookup and link-text extraction over a parsed page.
//!
//! The page is parsed once with `scraper`; the `article#article` region is
//! located, its `em` elements are unwrapped in place on the underlying
//! `ego_tree`, and the text of every surviving `a` element is filtered.

use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Case-insensitive substrings that disqualify a link (navigation, song and
/// lesson links rather than references).
pub const EXCLUDED_PHRASES: [&str; 4] = ["chương trình", "mục lục", "bài hát", "th bài học số"];

static ARTICLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article#article").expect("ARTICLE: hardcoded selector is valid")
});

static EMPHASIS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("em").expect("EMPHASIS: hardcoded selector is valid"));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("ANCHOR: hardcoded selector is valid"));

static DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d").expect("DIGIT: hardcoded regex is valid"));

/// Id of the first `<article id="article">` element, if the page has one.
pub fn select_article(html: &Html) -> Option<NodeId> {
    html.root_element().select(&ARTICLE).next().map(|el| el.id())
}

/// Replace every `em` inside `region` with its children, in place.
///
/// Children keep their order and land where the `em` was. Nested `em`
/// elements are handled because ids stay valid across the moves. Returns the
/// number of unwrapped elements.
pub fn unwrap_emphasis(html: &mut Html, region: NodeId) -> usize {
    let targets: Vec<NodeId> = match html.tree.get(region).and_then(ElementRef::wrap) {
        Some(el) => el.select(&EMPHASIS).map(|em| em.id()).collect(),
        None => return 0,
    };

    let mut unwrapped = 0;
    for id in targets {
        let children: Vec<NodeId> = match html.tree.get(id) {
            Some(node) => node.children().map(|child| child.id()).collect(),
            None => continue,
        };
        let Some(mut em) = html.tree.get_mut(id) else {
            continue;
        };
        if em.parent().is_none() {
            continue;
        }
        for child in children {
            em.insert_id_before(child);
        }
        em.detach();
        unwrapped += 1;
    }

    tracing::trace!(unwrapped, "extract.unwrap_emphasis");
    unwrapped
}

/// Whether a link's text is kept: it has a decimal digit and contains none of
/// the [`EXCLUDED_PHRASES`] (compared case-insensitively).
pub fn is_candidate_link_text(text: &str) -> bool {
    if !DIGIT.is_match(text) {
        return false;
    }
    let lowered = text.to_lowercase();
    !EXCLUDED_PHRASES
        .iter()
        .any(|phrase| lowered.contains(&phrase.to_lowercase()))
}

/// Text of every `a` inside `region`, in document order, filtered by
/// [`is_candidate_link_text`]. Duplicates are kept.
pub fn extract_link_texts(html: &Html, region: NodeId) -> Vec<String> {
    let Some(region) = html.tree.get(region).and_then(ElementRef::wrap) else {
        return Vec::new();
    };

    let mut seen = 0usize;
    let kept: Vec<String> = region
        .select(&ANCHOR)
        .map(|a| {
            seen += 1;
            a.text().collect::<String>()
        })
        .filter(|text| is_candidate_link_text(text))
        .collect();

    tracing::debug!(links = seen, kept = kept.len(), "extract.link_texts");
    kept
}
