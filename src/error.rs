//! Error types for scrape-pacer
//!
//! The error taxonomy distinguishes three classes of failure:
//! - Per-item transient failures (timeouts, empty pages) are never surfaced as
//!   `Err` from the engine loop; they become recorded fetch outcomes and a
//!   `Failed` work-item status.
//! - Structural failures (the fetch session dying, checkpoint writes failing)
//!   terminate the run and propagate to the caller.
//! - Quota exhaustion is not an error at all; the run ends cleanly and is
//!   resumable the next calendar day.

use thiserror::Error;

/// Result type alias for scrape-pacer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scrape-pacer
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "delay.min_delay")
        key: Option<String>,
    },

    /// Checkpoint database operation failed
    ///
    /// Checkpoint integrity backs resumability, so these are fatal to a run.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Fetch collaborator failure
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A stored page reference could not be decoded
    #[error("invalid page reference: {0}")]
    InvalidPage(String),

    /// The record store collaborator rejected an emitted record
    #[error("record sink error: {0}")]
    Sink(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Checkpoint database errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors reported by the external fetch collaborator
///
/// Only `SessionDead` is structural; the other kinds are converted into
/// failed fetch outcomes and the run continues.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The page did not load within the collaborator's deadline
    #[error("page load timed out")]
    Timeout,

    /// The underlying fetch session (e.g. a browser) is no longer usable
    ///
    /// The engine never attempts session recreation; this ends the run.
    #[error("fetch session is no longer usable")]
    SessionDead,

    /// Any other collaborator-side failure
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must terminate the run rather than fail one item.
    ///
    /// Transient fetch failures are handled in-loop; everything else means
    /// either the session or the checkpoint store can no longer be trusted.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Error::Fetch(FetchError::Timeout) | Error::Fetch(FetchError::Other(_))
        )
    }
}

/// Extraction collaborator failure
///
/// Kept separate from [`Error`] because the engine never propagates it: an
/// extraction failure is recorded as an `EmptyResult` outcome on the item.
#[derive(Debug, Error)]
#[error("extraction failed: {0}")]
pub struct ExtractError(pub String);
