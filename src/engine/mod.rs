//! Scrape pacing engine
//!
//! [`ScrapeEngine`] wires the pacing components together around an injected
//! fetcher/extractor/sink trio and drives the single-worker run loop.
//!
//! ## Submodules
//!
//! - [`traits`] — collaborator seams ([`PageFetcher`], [`RecordExtractor`],
//!   [`RecordSink`])
//! - `runner` — the per-item processing loop
//! - `lifecycle` — run termination and shutdown

use crate::checkpoint::BatchCheckpointManager;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Database;
use crate::dedup::DedupStore;
use crate::delay::DelayScheduler;
use crate::gate::ChallengeGate;
use crate::quota::QuotaManager;
use crate::risk::RiskMonitor;
use crate::types::{Event, PageRef, RiskLevel, RunStats};
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

mod lifecycle;
mod runner;
pub mod traits;

pub use traits::{PageFetcher, RecordExtractor, RecordSink};

#[cfg(test)]
pub(crate) mod test_helpers;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

/// Risk-adaptive scraping engine
///
/// Owns one work queue, one quota budget, and one dedup set, all backed by a
/// single SQLite file. Processing is strictly sequential; there is never more
/// than one fetch in flight.
pub struct ScrapeEngine {
    config: Arc<Config>,
    db: Arc<Database>,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
    clock: Arc<dyn Clock>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn RecordExtractor>,
    sink: Arc<dyn RecordSink>,
    risk: RiskMonitor,
    delays: DelayScheduler,
    quota: QuotaManager,
    gate: ChallengeGate,
    dedup: DedupStore,
    checkpoint: BatchCheckpointManager,
    stats: RunStats,
    level: RiskLevel,
}

impl ScrapeEngine {
    /// Create an engine with the system clock and an entropy-seeded RNG.
    ///
    /// Opens (or creates) the checkpoint database and restores quota, dedup,
    /// and work-queue state from it.
    pub async fn new(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn RecordExtractor>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self> {
        Self::with_clock_and_rng(
            config,
            fetcher,
            extractor,
            sink,
            Arc::new(SystemClock),
            StdRng::from_entropy(),
        )
        .await
    }

    /// Create an engine with an explicit clock and RNG.
    ///
    /// This is the deterministic entry point: tests script the clock and seed
    /// the RNG so delays, day boundaries, and challenge deadlines are exact.
    pub async fn with_clock_and_rng(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn RecordExtractor>,
        sink: Arc<dyn RecordSink>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Result<Self> {
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);

        if db.was_unclean_shutdown().await? {
            tracing::warn!("Unclean shutdown detected, interrupted items will be re-attempted");
        }
        db.set_clean_start().await?;

        let quota = QuotaManager::restore(config.quota.clone(), db.clone(), clock.now()).await?;
        let dedup = DedupStore::restore(db.clone()).await?;
        let checkpoint = BatchCheckpointManager::restore(config.batch.clone(), db.clone()).await?;

        let (event_tx, _) = broadcast::channel(1000);

        Ok(Self {
            risk: RiskMonitor::new(config.risk.clone()),
            delays: DelayScheduler::with_rng(config.delay.clone(), rng),
            gate: ChallengeGate::new(config.challenge.clone()),
            config: Arc::new(config),
            db,
            event_tx,
            cancel: CancellationToken::new(),
            clock,
            fetcher,
            extractor,
            sink,
            quota,
            dedup,
            checkpoint,
            stats: RunStats::default(),
            level: RiskLevel::Low,
        })
    }

    /// Subscribe to engine events.
    ///
    /// Events are broadcast; if no receiver exists they are dropped silently.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the run between items when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Install pages into the work queue.
    ///
    /// Pages already present (from this run or a previous one) are skipped,
    /// so seeding the same range after a restart resumes instead of
    /// resetting. Returns how many new items were added.
    pub async fn seed_items(&mut self, pages: Vec<PageRef>) -> Result<usize> {
        self.checkpoint.seed(pages).await
    }

    /// Reset failed items to pending so the next run re-attempts them.
    ///
    /// Never touches completed items. Returns how many were reset.
    pub async fn retry_failed_items(&mut self) -> Result<u64> {
        self.checkpoint.retry_failed().await
    }

    /// Snapshot of the run counters.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Current risk level derived from the outcome window.
    pub fn risk_level(&self) -> RiskLevel {
        self.risk.current_level()
    }

    /// Fetches left in today's quota budget.
    pub async fn quota_remaining(&mut self) -> Result<u32> {
        let now = self.clock.now();
        self.quota.remaining(now).await
    }

    pub(crate) fn emit(&self, event: Event) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }
}
