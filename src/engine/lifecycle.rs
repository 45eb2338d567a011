//! Run termination and shutdown.

use crate::types::{EndReason, Event, RunStats, RunSummary};
use crate::Result;

use super::ScrapeEngine;

impl ScrapeEngine {
    /// Record a clean ending and build the summary.
    ///
    /// Marks the shutdown clean in the database first; if that write fails
    /// the run ends with an error instead, and the next startup treats it
    /// as unclean.
    pub(crate) async fn finish(&mut self, reason: EndReason) -> Result<RunSummary> {
        self.db.set_clean_shutdown().await?;

        let stats = self.stats;
        log_summary(reason, &stats);
        self.emit(Event::RunFinished { reason, stats });
        Ok(RunSummary { reason, stats })
    }

    /// Close the checkpoint database.
    ///
    /// Call after the last run on this engine; further operations fail.
    pub async fn shutdown(&self) {
        self.db.close().await;
        tracing::info!("Engine shut down");
    }
}

fn log_summary(reason: EndReason, stats: &RunStats) {
    tracing::info!(
        reason = ?reason,
        attempted = stats.pages_attempted,
        succeeded = stats.pages_succeeded,
        failed = stats.pages_failed,
        records = stats.records_emitted,
        duplicates = stats.duplicates_discarded,
        challenges = stats.challenges_detected,
        "Run finished"
    );
}
