//! Joining and cleanup of the extracted link texts into one query string.
//!
//! Every rewrite rule runs to a fixed point. Rules never grow the string and
//! each loop is capped at `len + 1` passes.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Separator placed between link texts.
pub const SEPARATOR: &str = ";";

// `;` + whitespace + digits, or `;` + a segment made only of digits.
static NUMBER_AFTER_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r";(?:\s+(\d+)|(\d+)(;|$))")
        .expect("NUMBER_AFTER_SEPARATOR: hardcoded regex is valid")
});

/// Cleanup switches that differ between the historical variants of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Collapse `;;` to `;` and drop spaces right after `;`.
    pub extra_cleanup: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            extra_cleanup: true,
        }
    }
}

/// Join and normalise link texts in one go.
///
/// ```
/// use linkquery_web::normalize::{build_query, CleanupOptions};
///
/// let texts = vec!["Sách Khải Huyền".to_string(), "5".to_string()];
/// assert_eq!(build_query(&texts, CleanupOptions::default()), "Sách Khải Huyền 5");
/// ```
pub fn build_query(texts: &[String], options: CleanupOptions) -> String {
    normalize_query(&texts.join(SEPARATOR), options)
}

/// Apply the cleanup rules, in order, to an already joined string.
pub fn normalize_query(joined: &str, options: CleanupOptions) -> String {
    let mut s = fixed_point(joined.to_string(), attach_numbers);
    s.retain(|c| c != '\n' && c != '\r');
    s = fixed_point(s, collapse_spaces);
    if options.extra_cleanup {
        s = fixed_point(s, collapse_separators);
        s = fixed_point(s, trim_after_separator);
    }
    s
}

/// `A;5` / `A; 5` -> `A 5`, but `A;5:3` is left alone.
///
/// One match per pass: a standalone number consumes the `;` that follows it,
/// which the next segment may still need.
fn attach_numbers(s: &str) -> Cow<'_, str> {
    NUMBER_AFTER_SEPARATOR.replacen(s, 1, |caps: &Captures<'_>| match caps.get(1) {
        Some(digits) => format!(" {}", digits.as_str()),
        None => format!(
            " {}{}",
            &caps[2],
            caps.get(3).map_or("", |tail| tail.as_str())
        ),
    })
}

fn collapse_spaces(s: &str) -> Cow<'_, str> {
    replace_literal(s, "  ", " ")
}

fn collapse_separators(s: &str) -> Cow<'_, str> {
    replace_literal(s, ";;", ";")
}

fn trim_after_separator(s: &str) -> Cow<'_, str> {
    replace_literal(s, "; ", ";")
}

fn replace_literal<'a>(s: &'a str, from: &str, to: &str) -> Cow<'a, str> {
    if s.contains(from) {
        Cow::Owned(s.replace(from, to))
    } else {
        Cow::Borrowed(s)
    }
}

/// Re-apply `step` until it stops changing the input, for at most `len + 1` passes.
pub(crate) fn fixed_point<F>(input: String, step: F) -> String
where
    F: Fn(&str) -> Cow<'_, str>,
{
    let bound = input.len() + 1;
    let mut current = input;
    for _ in 0..bound {
        let next = match step(&current) {
            Cow::Borrowed(_) => return current,
            Cow::Owned(next) => next,
        };
        debug_assert!(next.len() <= current.len(), "cleanup rule grew the string");
        if next == current {
            return current;
        }
        current = next;
    }
    tracing::warn!(len = current.len(), bound, "normalize.fixed_point.bound_reached");
    current
}
