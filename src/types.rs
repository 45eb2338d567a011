//! Core types for scrape-pacer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a single fetchable page
///
/// Work items are opaque to the engine: either a page number in a paginated
/// listing (the collaborator knows how to turn it into a URL) or a fully
/// resolved URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PageRef {
    /// A 1-based page number within a paginated listing
    Index(u32),
    /// A fully resolved page URL
    Url(url::Url),
}

impl PageRef {
    /// Encode for checkpoint storage.
    pub(crate) fn to_storage(&self) -> String {
        match self {
            PageRef::Index(n) => format!("index:{n}"),
            PageRef::Url(u) => format!("url:{u}"),
        }
    }

    /// Decode from checkpoint storage.
    pub(crate) fn from_storage(s: &str) -> crate::Result<Self> {
        if let Some(n) = s.strip_prefix("index:") {
            let n = n
                .parse::<u32>()
                .map_err(|e| crate::Error::InvalidPage(format!("bad page index '{n}': {e}")))?;
            Ok(PageRef::Index(n))
        } else if let Some(u) = s.strip_prefix("url:") {
            let u = url::Url::parse(u)
                .map_err(|e| crate::Error::InvalidPage(format!("bad page url '{u}': {e}")))?;
            Ok(PageRef::Url(u))
        } else {
            Err(crate::Error::InvalidPage(format!(
                "unknown page reference encoding '{s}'"
            )))
        }
    }
}

impl std::fmt::Display for PageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageRef::Index(n) => write!(f, "page {n}"),
            PageRef::Url(u) => write!(f, "{u}"),
        }
    }
}

/// Processing status of a work item
///
/// Transitions happen only inside the checkpoint manager. `Done` is terminal
/// except through the explicit retry-failed operation, which never touches it;
/// `InFlight` items found at startup are demoted to `Pending` (at-least-once
/// recovery).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    /// Not yet attempted (or demoted after an interrupted attempt)
    Pending,
    /// A fetch for this item is currently in progress
    InFlight,
    /// Fetched, extracted, and checkpointed
    Done,
    /// Attempted and failed; eligible for operator-triggered retry
    Failed,
}

impl WorkStatus {
    /// Convert integer status code to WorkStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => WorkStatus::Pending,
            1 => WorkStatus::InFlight,
            2 => WorkStatus::Done,
            3 => WorkStatus::Failed,
            _ => WorkStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert WorkStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            WorkStatus::Pending => 0,
            WorkStatus::InFlight => 1,
            WorkStatus::Done => 2,
            WorkStatus::Failed => 3,
        }
    }

    /// Whether this status is terminal for batch accounting.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkStatus::Done | WorkStatus::Failed)
    }
}

/// A single unit of work: one page to fetch
#[derive(Clone, Debug)]
pub struct WorkItem {
    /// Stable position in the work queue (processing order)
    pub position: i64,
    /// The page this item fetches
    pub page: PageRef,
    /// Current processing status
    pub status: WorkStatus,
    /// Number of fetch attempts made so far
    pub attempts: u32,
    /// Failure description for `Failed` items
    pub failure: Option<String>,
}

/// Classified failure kind for a fetch attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An anti-automation challenge intercepted the page
    ChallengeDetected,
    /// The page did not load in time
    Timeout,
    /// The page loaded but yielded no records
    EmptyResult,
    /// The fetch session died (structural; recorded for completeness)
    SessionDead,
    /// Anything else
    Other,
}

/// Immutable record of one fetch attempt
///
/// Produced by the orchestrator after each attempt and consumed append-only
/// by the risk monitor.
#[derive(Clone, Debug)]
pub struct FetchOutcome {
    /// When the attempt finished
    pub at: DateTime<Utc>,
    /// Which page was attempted
    pub page: String,
    /// Whether the attempt produced usable content
    pub success: bool,
    /// Classified failure kind for unsuccessful attempts
    pub failure: Option<FailureKind>,
}

/// Coarse classification of how likely continued fetching is to trigger
/// detection or blocking
///
/// Always derived from the current outcome window, never set directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Normal operation
    Low,
    /// Mildly degraded success rate; stretch delays
    Elevated,
    /// Strong degradation or a recent challenge; slow way down
    High,
    /// Continued fetching is likely to get the session blocked; stop and cool off
    Critical,
}

/// Raw result returned by the fetch collaborator for one page
#[derive(Clone, Debug)]
pub struct FetchResult {
    /// Rendered page content
    pub raw_content: String,
    /// Whether an anti-automation challenge is currently displayed
    pub challenge_displayed: bool,
    /// Whether the underlying session is still usable
    pub session_alive: bool,
}

/// One extracted record, ready for dedup and emission
///
/// The engine is agnostic to the extracted fields; it only needs a source URL
/// to derive a stable dedup identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    /// Canonical URL of the listing/detail the record was extracted from
    pub source_url: String,
    /// Extracted domain fields, opaque to the engine
    pub fields: serde_json::Value,
    /// Which page produced this record
    pub page: String,
    /// Extraction timestamp
    pub scraped_at: DateTime<Utc>,
}

/// Counters accumulated over one engine run
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Fetch attempts made (including challenge retries)
    pub pages_attempted: u64,
    /// Items that reached `Done`
    pub pages_succeeded: u64,
    /// Items that reached `Failed`
    pub pages_failed: u64,
    /// Records handed to the record sink
    pub records_emitted: u64,
    /// Records discarded because their key was already seen
    pub duplicates_discarded: u64,
    /// Challenge interceptions observed
    pub challenges_detected: u64,
}

/// Why a run ended without a structural error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Every work item reached a terminal status
    Completed,
    /// The daily fetch ceiling was reached; resume tomorrow
    QuotaExhausted,
    /// The external stop signal was observed between items
    Stopped,
}

/// Final report returned by a completed run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Why the run ended
    pub reason: EndReason,
    /// Counters accumulated during the run
    pub stats: RunStats,
}

/// Event emitted during an engine run
///
/// Consumers subscribe via [`crate::ScrapeEngine::subscribe`]; events are
/// broadcast and dropped silently when nobody is listening.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A work item's fetch is starting
    ItemStarted {
        /// Page being fetched
        page: String,
    },

    /// A work item reached `Done`
    ItemCompleted {
        /// Page that was fetched
        page: String,
        /// Records emitted for this item
        records: u64,
        /// Records discarded as duplicates for this item
        duplicates: u64,
    },

    /// A work item reached `Failed`
    ItemFailed {
        /// Page that was attempted
        page: String,
        /// Classified failure kind
        kind: FailureKind,
    },

    /// A challenge intercepted the page; the pipeline is suspended for
    /// manual resolution
    ChallengeSuspended {
        /// Page that triggered the challenge
        page: String,
    },

    /// The challenge cleared within the wait budget; the item is retried once
    ChallengeResumed {
        /// Page being retried
        page: String,
    },

    /// The challenge outlasted the wait budget; the item is abandoned
    ChallengeAborted {
        /// Page that was abandoned
        page: String,
    },

    /// The derived risk level changed
    RiskLevelChanged {
        /// Previous level
        from: RiskLevel,
        /// New level
        to: RiskLevel,
    },

    /// Risk crossed into `High` or worse; an oversized pause was inserted
    AdaptiveBreak {
        /// Risk level that triggered the break
        level: RiskLevel,
        /// Pause length in seconds
        secs: u64,
    },

    /// A checkpoint batch boundary was crossed
    BatchCompleted {
        /// Items in a terminal status so far
        completed: usize,
        /// Total items in the work queue
        total: usize,
    },

    /// The daily fetch ceiling was reached
    QuotaExhausted {
        /// Configured daily limit
        limit: u32,
    },

    /// The run ended
    RunFinished {
        /// Why the run ended
        reason: EndReason,
        /// Final counters
        stats: RunStats,
    },
}
