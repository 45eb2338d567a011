//! Challenge gate
//!
//! Detects anti-automation challenges in fetch results and runs the bounded
//! suspension that follows: poll the fetch collaborator at a fixed interval
//! until the challenge clears or the wait budget runs out. The gate never
//! attempts to solve a challenge; clearing is assumed to happen out of band
//! (an operator, or the challenge expiring on its own).

use crate::clock::Clock;
use crate::config::ChallengeConfig;
use crate::engine::PageFetcher;
use crate::types::FetchResult;
use crate::Result;

/// Result of inspecting a fetch result for a challenge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateVerdict {
    /// No challenge; the content can be processed
    Pass,
    /// A challenge is displayed; the pipeline must suspend
    ChallengePending,
}

/// How a challenge suspension ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// The challenge cleared within the wait budget
    Resumed,
    /// The wait budget ran out with the challenge still up
    Aborted,
}

/// Bounded-wait challenge handler
#[derive(Debug)]
pub struct ChallengeGate {
    config: ChallengeConfig,
}

impl ChallengeGate {
    /// Create a gate with the given polling configuration.
    pub fn new(config: ChallengeConfig) -> Self {
        Self { config }
    }

    /// Classify a fetch result.
    pub fn inspect(&self, result: &FetchResult) -> GateVerdict {
        if result.challenge_displayed {
            GateVerdict::ChallengePending
        } else {
            GateVerdict::Pass
        }
    }

    /// Poll until the challenge clears or the wait budget is exhausted.
    ///
    /// At least one poll happens even when the budget is shorter than the
    /// poll interval. Collaborator errors during polling propagate; the
    /// caller decides whether they are structural.
    pub async fn wait_for_clear(
        &self,
        fetcher: &dyn PageFetcher,
        clock: &dyn Clock,
    ) -> Result<GateOutcome> {
        let deadline = clock.now()
            + chrono::Duration::from_std(self.config.max_wait).unwrap_or(chrono::Duration::MAX);

        loop {
            clock.sleep(self.config.poll_interval).await;

            if !fetcher.challenge_still_displayed().await? {
                tracing::info!("Challenge cleared, resuming");
                return Ok(GateOutcome::Resumed);
            }
            if clock.now() >= deadline {
                tracing::warn!(
                    max_wait_secs = self.config.max_wait.as_secs(),
                    "Challenge wait budget exhausted, abandoning item"
                );
                return Ok(GateOutcome::Aborted);
            }
        }
    }
}
