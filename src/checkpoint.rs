//! Batch checkpoint manager
//!
//! Owns the ordered work queue and its persistence. Every status transition
//! is written to the database before the engine moves on, so progress is
//! never more than one item stale on disk. Restore demotes interrupted
//! `InFlight` items back to `Pending`, which gives at-least-once processing
//! across crashes (a page may be fetched twice; the dedup store keeps its
//! records from being emitted twice).

use crate::config::BatchConfig;
use crate::db::Database;
use crate::types::{PageRef, WorkItem, WorkStatus};
use crate::Result;
use std::sync::Arc;

/// Persistent, batch-aware work queue
#[derive(Debug)]
pub struct BatchCheckpointManager {
    db: Arc<Database>,
    batch_size: usize,
    items: Vec<WorkItem>,
}

impl BatchCheckpointManager {
    /// Load the persisted queue and demote interrupted items.
    pub async fn restore(config: BatchConfig, db: Arc<Database>) -> Result<Self> {
        let demoted = db.demote_in_flight_items().await?;
        if demoted > 0 {
            tracing::warn!(
                count = demoted,
                "Demoted interrupted in-flight items to pending"
            );
        }

        let rows = db.load_work_items().await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(WorkItem {
                position: row.position,
                page: PageRef::from_storage(&row.page)?,
                status: WorkStatus::from_i32(row.status),
                attempts: row.attempts.max(0) as u32,
                failure: row.failure,
            });
        }
        tracing::info!(items = items.len(), "Restored work queue");

        Ok(Self {
            db,
            batch_size: config.batch_size.max(1),
            items,
        })
    }

    /// Install pages into the queue, skipping ones already present.
    ///
    /// Positions continue from the current queue tail, so seeding the same
    /// range after a restart is a no-op and progress is preserved.
    pub async fn seed(&mut self, pages: Vec<PageRef>) -> Result<usize> {
        let mut next_position = self.items.iter().map(|i| i.position).max().unwrap_or(0) + 1;
        let mut inserted = 0;

        for page in pages {
            if self.items.iter().any(|i| i.page == page) {
                continue;
            }
            if self
                .db
                .insert_work_item_if_absent(next_position, &page.to_storage())
                .await?
            {
                self.items.push(WorkItem {
                    position: next_position,
                    page,
                    status: WorkStatus::Pending,
                    attempts: 0,
                    failure: None,
                });
                next_position += 1;
                inserted += 1;
            }
        }

        if inserted > 0 {
            tracing::info!(count = inserted, "Seeded work items");
        }
        Ok(inserted)
    }

    /// First pending item in queue order.
    pub fn next_pending(&self) -> Option<WorkItem> {
        self.items
            .iter()
            .find(|i| i.status == WorkStatus::Pending)
            .cloned()
    }

    /// Mark an item as being fetched; counts one attempt.
    pub async fn mark_in_flight(&mut self, position: i64) -> Result<()> {
        self.transition(position, WorkStatus::InFlight, None, true)
            .await
    }

    /// Mark an item fetched, extracted, and emitted.
    pub async fn mark_done(&mut self, position: i64) -> Result<()> {
        self.transition(position, WorkStatus::Done, None, false).await
    }

    /// Mark an item failed with a reason.
    pub async fn mark_failed(&mut self, position: i64, reason: &str) -> Result<()> {
        self.transition(position, WorkStatus::Failed, Some(reason), false)
            .await
    }

    /// Reset failed items to pending; returns how many were reset.
    ///
    /// The only sanctioned regression besides in-flight demotion. `Done`
    /// items are never touched.
    pub async fn retry_failed(&mut self) -> Result<u64> {
        let reset = self.db.reset_failed_items().await?;
        for item in &mut self.items {
            if item.status == WorkStatus::Failed {
                item.status = WorkStatus::Pending;
                item.failure = None;
            }
        }
        if reset > 0 {
            tracing::info!(count = reset, "Reset failed items to pending");
        }
        Ok(reset)
    }

    /// Items in a terminal status (`Done` or `Failed`).
    pub fn terminal_count(&self) -> usize {
        self.items.iter().filter(|i| i.status.is_terminal()).count()
    }

    /// Total items in the queue.
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Whether any pending work remains.
    pub fn has_pending(&self) -> bool {
        self.items.iter().any(|i| i.status == WorkStatus::Pending)
    }

    /// Whether the terminal count sits exactly on a batch boundary.
    pub fn at_batch_boundary(&self) -> bool {
        let terminal = self.terminal_count();
        terminal > 0 && terminal % self.batch_size == 0
    }

    async fn transition(
        &mut self,
        position: i64,
        status: WorkStatus,
        failure: Option<&str>,
        count_attempt: bool,
    ) -> Result<()> {
        let Some(item) = self.items.iter_mut().find(|i| i.position == position) else {
            tracing::warn!(position, "Status update for unknown work item");
            return Ok(());
        };

        item.status = status;
        item.failure = failure.map(str::to_owned);
        if count_attempt {
            item.attempts += 1;
        }
        let attempts = i64::from(item.attempts);

        self.db
            .update_work_item(position, status.to_i32(), attempts, failure)
            .await
    }
}
