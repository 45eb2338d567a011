//! Risk monitor
//!
//! Maintains a sliding window of recent fetch outcomes, bounded both by entry
//! count and by age, and derives a coarse [`RiskLevel`] from the success rate
//! over that window. The level is always recomputed from the window; nothing
//! ever sets it directly.

use crate::config::RiskConfig;
use crate::types::{FailureKind, FetchOutcome, RiskLevel};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Sliding-window risk classifier
#[derive(Debug)]
pub struct RiskMonitor {
    config: RiskConfig,
    window: VecDeque<FetchOutcome>,
}

impl RiskMonitor {
    /// Create an empty monitor.
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            window: VecDeque::new(),
        }
    }

    /// Append one outcome and evict entries that fall outside the window.
    ///
    /// Eviction uses the timestamps carried on the outcomes themselves, so a
    /// scripted clock in tests behaves identically to the system clock.
    pub fn record_outcome(&mut self, outcome: FetchOutcome) {
        let now = outcome.at;
        self.window.push_back(outcome);
        while self.window.len() > self.config.window_len {
            self.window.pop_front();
        }
        self.evict_aged(now);
    }

    /// Risk level derived from the current window.
    ///
    /// Below the minimum sample count the base level is `Low` regardless of
    /// the observed rate. Any challenge detection still in the window raises
    /// the result to at least `High`; recovery happens naturally as those
    /// entries age out or are displaced.
    pub fn current_level(&self) -> RiskLevel {
        let base = if self.window.len() < self.config.min_samples {
            RiskLevel::Low
        } else {
            let successes = self.window.iter().filter(|o| o.success).count();
            let rate = successes as f64 / self.window.len() as f64;
            if rate >= self.config.low_threshold {
                RiskLevel::Low
            } else if rate >= self.config.elevated_threshold {
                RiskLevel::Elevated
            } else if rate >= self.config.high_threshold {
                RiskLevel::High
            } else {
                RiskLevel::Critical
            }
        };

        let challenged = self
            .window
            .iter()
            .any(|o| o.failure == Some(FailureKind::ChallengeDetected));
        if challenged {
            base.max(RiskLevel::High)
        } else {
            base
        }
    }

    /// Number of outcomes currently retained.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    fn evict_aged(&mut self, now: DateTime<Utc>) {
        let max_age = chrono::Duration::from_std(self.config.window_age)
            .unwrap_or(chrono::Duration::MAX);
        while let Some(front) = self.window.front() {
            if now.signed_duration_since(front.at) > max_age {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }
}
