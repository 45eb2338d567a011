//! # scrape-pacer
//!
//! Risk-adaptive pacing, daily quota, and checkpoint engine for long-running
//! paginated scrapes.
//!
//! ## Design Philosophy
//!
//! scrape-pacer is designed to be:
//! - **Site-agnostic** - Fetching, extraction, and record storage come in
//!   through traits; the engine only decides *when* to fetch and *what* to keep
//! - **Resumable** - Every item, quota tick, and dedup key is checkpointed to
//!   SQLite, so a crash or quota stop resumes instead of restarting
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use scrape_pacer::{Config, PageRef, ScrapeEngine};
//! use std::sync::Arc;
//!
//! # fn collaborators() -> (Arc<dyn scrape_pacer::PageFetcher>, Arc<dyn scrape_pacer::RecordExtractor>, Arc<dyn scrape_pacer::RecordSink>) { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (fetcher, extractor, sink) = collaborators();
//!     let mut engine = ScrapeEngine::new(Config::default(), fetcher, extractor, sink).await?;
//!
//!     // Subscribe to events
//!     let mut events = engine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     engine.seed_items((1..=100).map(PageRef::Index).collect()).await?;
//!     let summary = engine.run().await?;
//!     println!("Run ended: {:?}", summary.reason);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch checkpoint manager (persistent work queue)
pub mod checkpoint;
/// Clock abstraction for testable time
pub mod clock;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Duplicate detection
pub mod dedup;
/// Risk- and schedule-aware delay generation
pub mod delay;
/// Scrape pacing engine (run loop, collaborator traits)
pub mod engine;
/// Error types
pub mod error;
/// Challenge detection and bounded suspension
pub mod gate;
/// Daily quota management
pub mod quota;
/// Sliding-window risk classification
pub mod risk;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use checkpoint::BatchCheckpointManager;
pub use clock::{Clock, SystemClock};
pub use config::{Config, DelayConfig, PeakWindow, RiskConfig, Weekday};
pub use db::Database;
pub use dedup::{DedupKey, DedupStore};
pub use delay::DelayScheduler;
pub use engine::{PageFetcher, RecordExtractor, RecordSink, ScrapeEngine};
pub use error::{DatabaseError, Error, ExtractError, FetchError, Result};
pub use gate::{ChallengeGate, GateOutcome, GateVerdict};
pub use quota::QuotaManager;
pub use risk::RiskMonitor;
pub use types::{
    EndReason, Event, FailureKind, FetchOutcome, FetchResult, PageRef, Record, RiskLevel,
    RunStats, RunSummary, WorkItem, WorkStatus,
};

/// Helper function to stop a running engine on termination signals.
///
/// Cancels the engine's stop token when a signal arrives; the run loop
/// observes the token between items and ends with
/// [`EndReason::Stopped`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use scrape_pacer::{Config, ScrapeEngine, stop_on_signal};
/// # use std::sync::Arc;
/// # fn collaborators() -> (Arc<dyn scrape_pacer::PageFetcher>, Arc<dyn scrape_pacer::RecordExtractor>, Arc<dyn scrape_pacer::RecordSink>) { unimplemented!() }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (fetcher, extractor, sink) = collaborators();
///     let mut engine = ScrapeEngine::new(Config::default(), fetcher, extractor, sink).await?;
///
///     // SIGTERM/SIGINT request a graceful stop between items
///     tokio::spawn(stop_on_signal(engine.cancel_token()));
///     let summary = engine.run().await?;
///     engine.shutdown().await;
///     println!("{:?}", summary.reason);
///     Ok(())
/// }
/// ```
pub async fn stop_on_signal(token: tokio_util::sync::CancellationToken) {
    wait_for_signal().await;
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
