use super::*;
use crate::engine::test_helpers::FetchScript;
use crate::types::{EndReason, FailureKind, PageRef, RiskLevel};
use tempfile::NamedTempFile;

fn pages(range: std::ops::RangeInclusive<u32>) -> Vec<PageRef> {
    range.map(PageRef::Index).collect()
}

#[tokio::test]
async fn cleared_challenge_retries_item_once_and_completes() {
    let temp_file = NamedTempFile::new().unwrap();
    let harness = Harness::new();
    let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
    let mut rx = engine.subscribe();

    engine.seed_items(pages(1..=12)).await.unwrap();
    // Item 5 hits a challenge; it clears on the second poll
    harness
        .fetcher
        .script(&PageRef::Index(5), FetchScript::Challenge);
    harness.fetcher.script_polls(vec![true, false]);

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.reason, EndReason::Completed);
    assert_eq!(summary.stats.pages_succeeded, 12);
    assert_eq!(summary.stats.challenges_detected, 1);
    // 12 items plus one challenge retry
    assert_eq!(summary.stats.pages_attempted, 13);
    assert_eq!(harness.fetcher.fetch_count(), 13);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ChallengeSuspended { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ChallengeResumed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::ChallengeAborted { .. })));
}

#[tokio::test]
async fn challenge_forces_risk_to_high() {
    let temp_file = NamedTempFile::new().unwrap();
    let harness = Harness::new();
    let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
    let mut rx = engine.subscribe();

    engine.seed_items(pages(1..=6)).await.unwrap();
    harness
        .fetcher
        .script(&PageRef::Index(3), FetchScript::Challenge);
    harness.fetcher.script_polls(vec![false]);

    engine.run().await.unwrap();

    // A single challenge among successes escalates risk regardless of rate
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::RiskLevelChanged {
            to: RiskLevel::High,
            ..
        }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::AdaptiveBreak { .. })));
}

#[tokio::test]
async fn unresolved_challenge_abandons_item_and_continues() {
    let temp_file = NamedTempFile::new().unwrap();
    let harness = Harness::new();
    let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
    let mut rx = engine.subscribe();

    engine.seed_items(pages(1..=4)).await.unwrap();
    harness
        .fetcher
        .script(&PageRef::Index(2), FetchScript::Challenge);
    // Challenge never clears within the 90s budget
    harness.fetcher.script_polls(vec![true; 50]);

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.reason, EndReason::Completed);
    assert_eq!(summary.stats.pages_succeeded, 3);
    assert_eq!(summary.stats.pages_failed, 1);
    // No retry fetch happened for the abandoned item
    assert_eq!(summary.stats.pages_attempted, 4);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ChallengeAborted { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::ItemFailed {
            kind: FailureKind::ChallengeDetected,
            ..
        }
    )));
}

#[tokio::test]
async fn challenge_on_retry_fails_item_without_second_suspension() {
    let temp_file = NamedTempFile::new().unwrap();
    let harness = Harness::new();
    let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
    let mut rx = engine.subscribe();

    engine.seed_items(pages(1..=2)).await.unwrap();
    // Challenge clears, but the retried fetch hits another challenge
    harness
        .fetcher
        .script(&PageRef::Index(1), FetchScript::Challenge);
    harness
        .fetcher
        .script(&PageRef::Index(1), FetchScript::Challenge);
    harness.fetcher.script_polls(vec![false]);

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stats.pages_failed, 1);
    assert_eq!(summary.stats.pages_succeeded, 1);
    assert_eq!(summary.stats.challenges_detected, 2);

    // Only one suspension; the retry challenge fails the item immediately
    let events = drain(&mut rx);
    let suspensions = events
        .iter()
        .filter(|e| matches!(e, Event::ChallengeSuspended { .. }))
        .count();
    assert_eq!(suspensions, 1);
}

#[tokio::test]
async fn challenge_retry_counts_against_quota() {
    let temp_file = NamedTempFile::new().unwrap();
    let harness = Harness::new();
    let mut config = fast_config(temp_file.path());
    config.quota.daily_limit = 3;
    let mut engine = build_engine(config, &harness).await;

    engine.seed_items(pages(1..=5)).await.unwrap();
    harness
        .fetcher
        .script(&PageRef::Index(1), FetchScript::Challenge);
    harness.fetcher.script_polls(vec![false]);

    let summary = engine.run().await.unwrap();

    // Item 1 used two attempts (original + retry), item 2 the third
    assert_eq!(summary.reason, EndReason::QuotaExhausted);
    assert_eq!(summary.stats.pages_attempted, 3);
    assert_eq!(summary.stats.pages_succeeded, 2);
}
