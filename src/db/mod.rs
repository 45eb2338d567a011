//! Database layer for scrape-pacer
//!
//! One SQLite file backs the three independently persisted structures of the
//! engine, each in its own table, plus a key/value table for clean-shutdown
//! tracking.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`items`] — Work item / batch checkpoint CRUD
//! - [`quota`] — Daily quota state
//! - [`seen`] — Seen-key snapshot for the dedup store
//! - [`state`] — Runtime state (shutdown tracking)

use sqlx::{FromRow, sqlite::SqlitePool};

mod items;
mod migrations;
mod quota;
mod seen;
mod state;

/// Work item record from the database
#[derive(Debug, Clone, FromRow)]
pub struct WorkItemRow {
    /// Stable position in the work queue
    pub position: i64,
    /// Encoded page reference
    pub page: String,
    /// Status code (0=pending, 1=in_flight, 2=done, 3=failed)
    pub status: i32,
    /// Fetch attempts made so far
    pub attempts: i64,
    /// Failure description for failed items
    pub failure: Option<String>,
    /// Unix timestamp of the last status change
    pub updated_at: i64,
}

/// Quota record from the database (single row)
#[derive(Debug, Clone, FromRow)]
pub struct QuotaRow {
    /// ISO-8601 calendar day the counter belongs to
    pub day: String,
    /// Fetch attempts recorded on that day
    pub fetched_count: i64,
}

/// SQLite-backed persistence for the scrape pacing engine
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Close the database connection pool.
    ///
    /// Waits for in-flight writes to finish; used on graceful shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
