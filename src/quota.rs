//! Daily quota manager
//!
//! Enforces the fetch-attempts-per-calendar-day ceiling. The counter and the
//! day it belongs to are persisted together; `record_fetch` writes the new
//! count before returning so a crash can only lose a fetch (under-count),
//! never double-spend quota. Day boundaries come from the caller's clock,
//! never from the system clock.

use crate::config::QuotaConfig;
use crate::db::Database;
use crate::Result;
use chrono::{DateTime, Local, NaiveDate};
use std::sync::Arc;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Calendar-day fetch budget
#[derive(Debug)]
pub struct QuotaManager {
    config: QuotaConfig,
    db: Arc<Database>,
    day: NaiveDate,
    fetched_count: u32,
}

impl QuotaManager {
    /// Load persisted quota state, resetting the counter if the stored day
    /// is in the past.
    pub async fn restore(
        config: QuotaConfig,
        db: Arc<Database>,
        now: DateTime<Local>,
    ) -> Result<Self> {
        let today = now.date_naive();
        let (day, fetched_count) = match db.load_quota_state().await? {
            Some(row) => {
                let stored = NaiveDate::parse_from_str(&row.day, DAY_FORMAT).unwrap_or(today);
                if stored < today {
                    tracing::info!(
                        stored_day = %stored,
                        today = %today,
                        "Quota day rolled over, resetting counter"
                    );
                    (today, 0)
                } else {
                    // A stored day in the future means the clock moved back;
                    // keep counting against the stored day rather than
                    // granting a fresh budget.
                    (stored, row.fetched_count.max(0) as u32)
                }
            }
            None => (today, 0),
        };

        let manager = Self {
            config,
            db,
            day,
            fetched_count,
        };
        manager.persist().await?;
        Ok(manager)
    }

    /// Whether another fetch fits in today's budget.
    ///
    /// Rolls the day boundary first, so the first call after midnight sees a
    /// fresh counter.
    pub async fn can_fetch(&mut self, now: DateTime<Local>) -> Result<bool> {
        self.roll_day(now).await?;
        Ok(self.fetched_count < self.config.daily_limit)
    }

    /// Count one fetch attempt against today's budget.
    ///
    /// The new count is persisted before this returns; a persistence failure
    /// is fatal to the run.
    pub async fn record_fetch(&mut self, now: DateTime<Local>) -> Result<()> {
        self.roll_day(now).await?;
        self.fetched_count += 1;
        self.persist().await
    }

    /// Fetches left in today's budget.
    pub async fn remaining(&mut self, now: DateTime<Local>) -> Result<u32> {
        self.roll_day(now).await?;
        Ok(self.config.daily_limit.saturating_sub(self.fetched_count))
    }

    /// Fetches recorded against the current day.
    pub fn fetched_today(&self) -> u32 {
        self.fetched_count
    }

    async fn roll_day(&mut self, now: DateTime<Local>) -> Result<()> {
        let today = now.date_naive();
        if today > self.day {
            tracing::info!(
                previous_day = %self.day,
                today = %today,
                "Quota day rolled over, resetting counter"
            );
            self.day = today;
            self.fetched_count = 0;
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        self.db
            .save_quota_state(
                &self.day.format(DAY_FORMAT).to_string(),
                i64::from(self.fetched_count),
            )
            .await
    }
}
