//! Collaborator traits
//!
//! The engine owns pacing, risk, quota, dedup, and checkpointing; everything
//! that touches the target site or the record store comes in through these
//! seams. Implementations live in the embedding program (a headless browser
//! wrapper, an HTML parser, a CSV/JSONL writer) and are injected at engine
//! construction.

use crate::error::ExtractError;
use crate::types::{FetchResult, PageRef, Record};
use crate::Result;
use async_trait::async_trait;

/// Fetches pages from the target site
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page and report what came back.
    ///
    /// Transient problems (timeouts, garbled loads) should be returned as
    /// [`crate::error::FetchError::Timeout`] or
    /// [`crate::error::FetchError::Other`]; those fail the item without
    /// ending the run. A dead session must be reported either via
    /// [`crate::error::FetchError::SessionDead`] or by returning a result
    /// with `session_alive` false — both end the run.
    async fn fetch_page(&self, page: &PageRef) -> Result<FetchResult>;

    /// Whether the previously reported challenge is still displayed.
    ///
    /// Polled by the challenge gate during a suspension.
    async fn challenge_still_displayed(&self) -> Result<bool>;
}

/// Extracts records from fetched page content
pub trait RecordExtractor: Send + Sync {
    /// Parse page content into records.
    ///
    /// Failures and empty results both mark the item failed with an
    /// empty-result outcome; neither ends the run.
    fn extract(&self, raw_content: &str) -> std::result::Result<Vec<Record>, ExtractError>;
}

/// Receives deduplicated records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Store one record.
    ///
    /// Errors are structural: losing the record store means continuing
    /// would silently drop data, so the run ends.
    async fn emit(&self, record: &Record) -> Result<()>;
}
