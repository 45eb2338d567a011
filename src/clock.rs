//! Clock abstraction
//!
//! All time reads and sleeps in the engine go through [`Clock`] so that tests
//! can script day boundaries, peak windows, and challenge deadlines without
//! real waiting.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Source of wall-clock time and timed waits
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Wait for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the system time and the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
