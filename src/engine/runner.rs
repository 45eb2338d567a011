//! The per-item run loop.
//!
//! Strictly sequential: delay, fetch, gate, extract, dedup, emit, checkpoint,
//! then re-derive risk. The stop token and the quota are checked between
//! items, never mid-item, so an item that started always reaches a terminal
//! status before the run ends.

use crate::dedup::DedupKey;
use crate::error::FetchError;
use crate::gate::{GateOutcome, GateVerdict};
use crate::types::{
    EndReason, Event, FailureKind, FetchOutcome, FetchResult, PageRef, RiskLevel, RunSummary,
    WorkItem,
};
use crate::{Error, Result};
use chrono::Utc;

use super::ScrapeEngine;

/// What one quota-counted fetch attempt produced.
enum Attempt {
    Content(FetchResult),
    Failed(FailureKind, String),
}

impl ScrapeEngine {
    /// Drive the work queue until it is exhausted, the quota runs out, or
    /// the stop token fires.
    ///
    /// Returns the run summary on any clean ending; propagates structural
    /// errors (dead session, persistence failure, sink failure).
    pub async fn run(&mut self) -> Result<RunSummary> {
        tracing::info!(
            items = self.checkpoint.total(),
            pending = self.checkpoint.has_pending(),
            "Starting run"
        );

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Stop requested, ending run");
                return self.finish(EndReason::Stopped).await;
            }

            let Some(item) = self.checkpoint.next_pending() else {
                tracing::info!("Work queue exhausted");
                return self.finish(EndReason::Completed).await;
            };

            let now = self.clock.now();
            if !self.quota.can_fetch(now).await? {
                let limit = self.config.quota.daily_limit;
                tracing::info!(limit, "Daily quota exhausted, ending run");
                self.emit(Event::QuotaExhausted { limit });
                return self.finish(EndReason::QuotaExhausted).await;
            }

            let level = self.risk.current_level();
            let delay = self.delays.next_delay(level, now);
            tracing::debug!(
                page = %item.page,
                level = ?level,
                delay_secs = delay.as_secs(),
                "Pacing before fetch"
            );
            self.clock.sleep(delay).await;

            // A stop during the pacing sleep ends the run before the fetch
            if self.cancel.is_cancelled() {
                tracing::info!("Stop requested, ending run");
                return self.finish(EndReason::Stopped).await;
            }

            self.process_item(&item).await?;
            self.observe_risk().await;

            if self.checkpoint.at_batch_boundary() && self.checkpoint.has_pending() {
                self.batch_pause().await;
            }
        }
    }

    /// Take one item from mark-in-flight to a terminal status.
    async fn process_item(&mut self, item: &WorkItem) -> Result<()> {
        let page = item.page.to_string();
        self.emit(Event::ItemStarted { page: page.clone() });
        self.checkpoint.mark_in_flight(item.position).await?;

        let mut fetched = match self.fetch_once(&item.page).await? {
            Attempt::Content(result) => result,
            Attempt::Failed(kind, reason) => {
                self.record_outcome(&page, false, Some(kind));
                return self.fail_item(item, kind, &reason).await;
            }
        };

        if self.gate.inspect(&fetched) == GateVerdict::ChallengePending {
            self.stats.challenges_detected += 1;
            self.record_outcome(&page, false, Some(FailureKind::ChallengeDetected));
            self.emit(Event::ChallengeSuspended { page: page.clone() });
            tracing::warn!(page = %item.page, "Challenge detected, suspending");

            match self
                .gate
                .wait_for_clear(self.fetcher.as_ref(), self.clock.as_ref())
                .await?
            {
                GateOutcome::Aborted => {
                    self.emit(Event::ChallengeAborted { page: page.clone() });
                    // Outcome already recorded at detection
                    return self
                        .fail_item(item, FailureKind::ChallengeDetected, "challenge not cleared")
                        .await;
                }
                GateOutcome::Resumed => {
                    self.emit(Event::ChallengeResumed { page: page.clone() });
                    fetched = match self.fetch_once(&item.page).await? {
                        Attempt::Content(result)
                            if self.gate.inspect(&result) == GateVerdict::ChallengePending =>
                        {
                            // One retry only; a second challenge fails the item
                            self.stats.challenges_detected += 1;
                            self.record_outcome(
                                &page,
                                false,
                                Some(FailureKind::ChallengeDetected),
                            );
                            return self
                                .fail_item(
                                    item,
                                    FailureKind::ChallengeDetected,
                                    "challenge re-appeared on retry",
                                )
                                .await;
                        }
                        Attempt::Content(result) => result,
                        Attempt::Failed(kind, reason) => {
                            self.record_outcome(&page, false, Some(kind));
                            return self.fail_item(item, kind, &reason).await;
                        }
                    };
                }
            }
        }

        let records = match self.extractor.extract(&fetched.raw_content) {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => {
                self.record_outcome(&page, false, Some(FailureKind::EmptyResult));
                return self
                    .fail_item(item, FailureKind::EmptyResult, "no records on page")
                    .await;
            }
            Err(e) => {
                tracing::warn!(page = %item.page, error = %e, "Extraction failed");
                self.record_outcome(&page, false, Some(FailureKind::EmptyResult));
                return self.fail_item(item, FailureKind::EmptyResult, &e.to_string()).await;
            }
        };

        self.record_outcome(&page, true, None);

        let mut emitted = 0u64;
        let mut duplicates = 0u64;
        for record in &records {
            let key = DedupKey::from_record(record);
            if self.dedup.contains(&key) {
                duplicates += 1;
                self.stats.duplicates_discarded += 1;
                continue;
            }
            self.sink.emit(record).await?;
            self.dedup.insert(&key).await?;
            emitted += 1;
            self.stats.records_emitted += 1;
        }

        self.checkpoint.mark_done(item.position).await?;
        self.stats.pages_succeeded += 1;
        tracing::info!(page = %item.page, records = emitted, duplicates, "Item completed");
        self.emit(Event::ItemCompleted {
            page,
            records: emitted,
            duplicates,
        });
        Ok(())
    }

    /// One quota-counted fetch attempt.
    ///
    /// The quota write happens before the fetch, so a crash mid-fetch
    /// leaves the attempt counted. Transient fetch errors become failed
    /// attempts; structural ones propagate.
    async fn fetch_once(&mut self, page: &PageRef) -> Result<Attempt> {
        let now = self.clock.now();
        self.quota.record_fetch(now).await?;
        self.stats.pages_attempted += 1;

        match self.fetcher.fetch_page(page).await {
            Ok(result) if !result.session_alive => {
                tracing::error!(page = %page, "Fetch session reported dead");
                self.record_outcome(&page.to_string(), false, Some(FailureKind::SessionDead));
                Err(FetchError::SessionDead.into())
            }
            Ok(result) => Ok(Attempt::Content(result)),
            Err(Error::Fetch(FetchError::Timeout)) => Ok(Attempt::Failed(
                FailureKind::Timeout,
                "page load timed out".into(),
            )),
            Err(Error::Fetch(FetchError::Other(msg))) => {
                tracing::warn!(page = %page, error = %msg, "Fetch failed");
                Ok(Attempt::Failed(FailureKind::Other, msg))
            }
            Err(e) => {
                if matches!(e, Error::Fetch(FetchError::SessionDead)) {
                    self.record_outcome(&page.to_string(), false, Some(FailureKind::SessionDead));
                }
                Err(e)
            }
        }
    }

    async fn fail_item(&mut self, item: &WorkItem, kind: FailureKind, reason: &str) -> Result<()> {
        self.checkpoint.mark_failed(item.position, reason).await?;
        self.stats.pages_failed += 1;
        tracing::warn!(page = %item.page, kind = ?kind, reason, "Item failed");
        self.emit(Event::ItemFailed {
            page: item.page.to_string(),
            kind,
        });
        Ok(())
    }

    fn record_outcome(&mut self, page: &str, success: bool, failure: Option<FailureKind>) {
        self.risk.record_outcome(FetchOutcome {
            at: self.clock.now().with_timezone(&Utc),
            page: page.to_owned(),
            success,
            failure,
        });
    }

    /// Re-derive the risk level and react to transitions.
    ///
    /// Escalation into `High` or `Critical` inserts an oversized pause
    /// before the next item on top of the per-item delay stretch.
    async fn observe_risk(&mut self) {
        let level = self.risk.current_level();
        if level == self.level {
            return;
        }

        tracing::info!(from = ?self.level, to = ?level, "Risk level changed");
        self.emit(Event::RiskLevelChanged {
            from: self.level,
            to: level,
        });
        let escalated = level >= RiskLevel::High && self.level < RiskLevel::High;
        self.level = level;

        if escalated && self.checkpoint.has_pending() && !self.cancel.is_cancelled() {
            let pause = self.delays.batch_break(level);
            tracing::warn!(
                level = ?level,
                pause_secs = pause.as_secs(),
                "Risk escalated, taking an adaptive break"
            );
            self.emit(Event::AdaptiveBreak {
                level,
                secs: pause.as_secs(),
            });
            self.clock.sleep(pause).await;
        }
    }

    async fn batch_pause(&mut self) {
        let completed = self.checkpoint.terminal_count();
        let total = self.checkpoint.total();
        self.emit(Event::BatchCompleted { completed, total });

        if self.cancel.is_cancelled() {
            return;
        }
        let pause = self.delays.batch_break(self.level);
        tracing::info!(
            completed,
            total,
            pause_secs = pause.as_secs(),
            "Batch complete, pausing before the next one"
        );
        self.clock.sleep(pause).await;
    }
}
