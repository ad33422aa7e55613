//! Common types and utilities shared across linkquery crates.
//!
//! This crate defines the shared error type and observability helpers used
//! throughout the workspace. It stays small so that every crate can depend
//! on it without pulling in the HTTP or HTML stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`LinkQueryError`] and [`Result`]: Shared error handling and the
//!   process exit codes derived from it
//!
//! # Examples
//!
//! ```rust
//! use linkquery_common::LinkQueryError;
//!
//! let err = LinkQueryError::Usage("missing URL".into());
//! assert_eq!(err.exit_code(), 2);
//! assert_eq!(err.to_string(), "Usage error: missing URL");
//! ```

pub mod observability;

/// Exit code for a run that completed, including the soft "article not found" case.
pub const EXIT_OK: i32 = 0;
/// Exit code for fetch, configuration and other runtime failures.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for command-line misuse.
pub const EXIT_USAGE: i32 = 2;

/// Error types surfaced by the `linkquery` binary.
#[derive(thiserror::Error, Debug)]
pub enum LinkQueryError {
    /// The command line was incomplete (e.g. no URL under the usage-error policy).
    #[error("Usage error: {0}")]
    Usage(String),

    /// Configuration sources could not be read or deserialised.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The page request failed (transport error, non-success status, bad URL).
    #[error("Error occurred: {0}")]
    Request(String),

    /// The daily text feed could not be loaded.
    #[error("Failed to load text: {0}")]
    Daily(String),

    /// Anything else bubbled up from setup code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LinkQueryError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}

/// Convenient alias for results that use [`LinkQueryError`].
pub type Result<T> = std::result::Result<T, LinkQueryError>;
