//! Delay scheduler
//!
//! Produces the pause before each fetch: a uniform random draw from the
//! configured base range, stretched by the current risk level and by any
//! matching peak-hour window, then clamped to an absolute ceiling. Critical
//! risk bypasses the draw entirely and yields the fixed cooldown.
//!
//! Also produces the longer randomized inter-batch break, scaled by the same
//! risk multipliers.

use crate::config::DelayConfig;
use crate::types::RiskLevel;
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Risk- and schedule-aware delay generator
#[derive(Debug)]
pub struct DelayScheduler {
    config: DelayConfig,
    rng: StdRng,
}

impl DelayScheduler {
    /// Create a scheduler seeded from system entropy.
    pub fn new(config: DelayConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a scheduler with an explicit RNG, for deterministic tests.
    pub fn with_rng(config: DelayConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    /// Delay to wait before the next fetch.
    ///
    /// `now` decides peak-window membership; it is the caller's clock reading,
    /// never the system clock.
    pub fn next_delay(&mut self, level: RiskLevel, now: DateTime<Local>) -> Duration {
        if level == RiskLevel::Critical {
            return self.config.critical_cooldown;
        }

        let base = self.draw_secs(self.config.min_delay, self.config.max_delay);
        let stretched = base * self.risk_multiplier(level) * self.peak_multiplier(now);
        let ceiling = self.config.max_total_delay.as_secs_f64();
        Duration::from_secs_f64(stretched.min(ceiling))
    }

    /// Randomized pause between batches, stretched by risk.
    ///
    /// At critical risk the fixed cooldown takes over if it is longer than
    /// the drawn break.
    pub fn batch_break(&mut self, level: RiskLevel) -> Duration {
        let base = self.draw_secs(self.config.min_batch_break, self.config.max_batch_break);
        let secs = match level {
            RiskLevel::Critical => base.max(self.config.critical_cooldown.as_secs_f64()),
            other => base * self.risk_multiplier(other),
        };
        Duration::from_secs_f64(secs)
    }

    fn draw_secs(&mut self, min: Duration, max: Duration) -> f64 {
        let lo = min.as_secs_f64();
        let hi = max.as_secs_f64();
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    fn risk_multiplier(&self, level: RiskLevel) -> f64 {
        match level {
            RiskLevel::Low => 1.0,
            RiskLevel::Elevated => self.config.elevated_multiplier,
            RiskLevel::High => self.config.high_multiplier,
            // Critical never reaches the multiplier path
            RiskLevel::Critical => self.config.high_multiplier,
        }
    }

    fn peak_multiplier(&self, now: DateTime<Local>) -> f64 {
        self.config
            .peak_windows
            .iter()
            .filter(|w| w.matches(now))
            .map(|w| w.multiplier)
            .fold(1.0, f64::max)
    }
}
