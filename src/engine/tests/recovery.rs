use super::*;
use crate::engine::test_helpers::{FetchScript, ManualClock};
use crate::types::{EndReason, PageRef};
use chrono::{Local, TimeZone};
use tempfile::NamedTempFile;

fn pages(range: std::ops::RangeInclusive<u32>) -> Vec<PageRef> {
    range.map(PageRef::Index).collect()
}

fn next_day_clock() -> ManualClock {
    ManualClock::starting_at(Local.with_ymd_and_hms(2026, 8, 27, 4, 0, 0).unwrap())
}

#[tokio::test]
async fn restart_resumes_where_quota_stopped() {
    let temp_file = NamedTempFile::new().unwrap();

    // Day one: quota allows 7 of 12 items
    {
        let harness = Harness::new();
        let mut config = fast_config(temp_file.path());
        config.quota.daily_limit = 7;
        let mut engine = build_engine(config, &harness).await;
        engine.seed_items(pages(1..=12)).await.unwrap();

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.reason, EndReason::QuotaExhausted);
        assert_eq!(summary.stats.pages_succeeded, 7);
        engine.shutdown().await;
    }

    // Day two: re-seeding the same range is a no-op; the rest completes
    {
        let harness = Harness::with_clock(next_day_clock());
        let mut config = fast_config(temp_file.path());
        config.quota.daily_limit = 7;
        let mut engine = build_engine(config, &harness).await;
        assert_eq!(engine.seed_items(pages(1..=12)).await.unwrap(), 0);

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.reason, EndReason::Completed);
        assert_eq!(summary.stats.pages_succeeded, 5);
        // Only the unfinished pages were fetched again
        assert_eq!(harness.fetcher.fetch_count(), 5);
        engine.shutdown().await;
    }
}

#[tokio::test]
async fn interrupted_item_is_reattempted_after_crash() {
    let temp_file = NamedTempFile::new().unwrap();

    // First session dies mid-item: the session drops on item 7
    {
        let harness = Harness::new();
        let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
        engine.seed_items(pages(1..=12)).await.unwrap();
        harness
            .fetcher
            .script(&PageRef::Index(7), FetchScript::SessionDead);

        let err = engine.run().await.unwrap_err();
        assert!(err.is_structural());
        assert_eq!(engine.stats().pages_succeeded, 6);
        // No clean shutdown mark; item 7 is left in flight
        engine.shutdown().await;
    }

    // Second session: item 7 is demoted to pending and completes
    {
        let harness = Harness::with_clock(next_day_clock());
        let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
        let mut rx = engine.subscribe();

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.reason, EndReason::Completed);
        assert_eq!(summary.stats.pages_succeeded, 6);

        let events = drain(&mut rx);
        let completed_pages: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                Event::ItemCompleted { page, .. } => Some(page.clone()),
                _ => None,
            })
            .collect();
        assert!(completed_pages.contains(&"page 7".to_string()));
        engine.shutdown().await;
    }
}

#[tokio::test]
async fn dedup_holds_across_restart() {
    let temp_file = NamedTempFile::new().unwrap();

    {
        let harness = Harness::new();
        let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
        engine.seed_items(pages(1..=1)).await.unwrap();
        harness
            .fetcher
            .script(&PageRef::Index(1), FetchScript::Content("record:listing-9"));

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.stats.records_emitted, 1);
        engine.shutdown().await;
    }

    // A later run fetches a different page carrying the same record
    {
        let harness = Harness::with_clock(next_day_clock());
        let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;
        engine.seed_items(pages(1..=2)).await.unwrap();
        harness
            .fetcher
            .script(&PageRef::Index(2), FetchScript::Content("record:listing-9"));

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.stats.pages_succeeded, 1);
        assert_eq!(summary.stats.records_emitted, 0);
        assert_eq!(summary.stats.duplicates_discarded, 1);
        assert!(harness.sink.records().is_empty());
        engine.shutdown().await;
    }
}

#[tokio::test]
async fn retry_failed_items_reruns_only_failures() {
    let temp_file = NamedTempFile::new().unwrap();
    let harness = Harness::new();
    let mut engine = build_engine(fast_config(temp_file.path()), &harness).await;

    engine.seed_items(pages(1..=4)).await.unwrap();
    harness
        .fetcher
        .script(&PageRef::Index(3), FetchScript::Timeout);

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.stats.pages_failed, 1);

    // Operator retry: only the failed item becomes pending again
    assert_eq!(engine.retry_failed_items().await.unwrap(), 1);
    let summary = engine.run().await.unwrap();
    assert_eq!(summary.reason, EndReason::Completed);
    assert_eq!(summary.stats.pages_succeeded, 4);
    // Pages 1, 2, 4 were not fetched a second time
    assert_eq!(harness.fetcher.fetch_count(), 5);
    engine.shutdown().await;
}

#[tokio::test]
async fn quota_counter_survives_same_day_restart() {
    let temp_file = NamedTempFile::new().unwrap();

    {
        let harness = Harness::new();
        let mut config = fast_config(temp_file.path());
        config.quota.daily_limit = 5;
        let mut engine = build_engine(config, &harness).await;
        engine.seed_items(pages(1..=3)).await.unwrap();
        engine.run().await.unwrap();
        engine.shutdown().await;
    }

    // Same day: 3 of 5 already spent
    {
        let harness = Harness::new();
        let mut config = fast_config(temp_file.path());
        config.quota.daily_limit = 5;
        let mut engine = build_engine(config, &harness).await;
        assert_eq!(engine.quota_remaining().await.unwrap(), 2);

        engine.seed_items(pages(4..=9)).await.unwrap();
        let summary = engine.run().await.unwrap();
        assert_eq!(summary.reason, EndReason::QuotaExhausted);
        assert_eq!(summary.stats.pages_succeeded, 2);
        engine.shutdown().await;
    }
}
