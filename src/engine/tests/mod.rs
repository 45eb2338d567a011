//! End-to-end engine scenarios against a real (temporary) checkpoint database.

use super::test_helpers::{ManualClock, MockExtractor, MockFetcher, MockSink};
use crate::config::Config;
use crate::engine::ScrapeEngine;
use crate::types::Event;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

mod challenge;
mod recovery;

pub(super) struct Harness {
    pub fetcher: Arc<MockFetcher>,
    pub sink: Arc<MockSink>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_clock(ManualClock::new())
    }

    pub(super) fn with_clock(clock: ManualClock) -> Self {
        Self {
            fetcher: Arc::new(MockFetcher::new()),
            sink: Arc::new(MockSink::new()),
            clock: Arc::new(clock),
        }
    }
}

/// Config with second-scale pacing so scripted clocks stay within one day.
pub(super) fn fast_config(db_path: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = db_path.to_path_buf();
    config.delay.min_delay = Duration::from_secs(1);
    config.delay.max_delay = Duration::from_secs(3);
    config.delay.min_batch_break = Duration::from_secs(5);
    config.delay.max_batch_break = Duration::from_secs(10);
    config.delay.critical_cooldown = Duration::from_secs(60);
    config
}

pub(super) async fn build_engine(config: Config, harness: &Harness) -> ScrapeEngine {
    ScrapeEngine::with_clock_and_rng(
        config,
        harness.fetcher.clone(),
        Arc::new(MockExtractor),
        harness.sink.clone(),
        harness.clock.clone(),
        StdRng::seed_from_u64(7),
    )
    .await
    .unwrap()
}

/// Drain every event the run produced.
pub(super) fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
