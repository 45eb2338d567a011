//! Shared mocks for engine and gate tests.
//!
//! The clock is fully scripted: `sleep` advances the reported time instead of
//! waiting, so delay, break, and challenge-deadline logic runs exactly as in
//! production but instantaneously.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::error::FetchError;
use crate::types::{FetchResult, PageRef, Record};
use crate::{Clock, PageFetcher, RecordExtractor, RecordSink, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Clock whose time only moves when something sleeps on it.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Local>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Start at a fixed off-peak instant (2026-08-26 04:00 local).
    pub(crate) fn new() -> Self {
        Self::starting_at(Local.with_ymd_and_hms(2026, 8, 26, 4, 0, 0).unwrap())
    }

    pub(crate) fn starting_at(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every duration slept so far, in order.
    pub(crate) fn slept(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

/// One scripted fetch response.
pub(crate) enum FetchScript {
    /// Page loads with this content
    Content(&'static str),
    /// Page loads but a challenge is displayed
    Challenge,
    /// Page load times out
    Timeout,
    /// The session dies
    SessionDead,
}

/// Fetcher with per-page response scripts.
///
/// Scripts are consumed in order; once a page's script runs out (or none was
/// set) every fetch returns `"record:<page>"`, which the mock extractor turns
/// into one record unique to that page.
pub(crate) struct MockFetcher {
    scripts: Mutex<HashMap<String, VecDeque<FetchScript>>>,
    polls: Mutex<VecDeque<bool>>,
    fetches: AtomicU64,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            polls: Mutex::new(VecDeque::new()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Queue a scripted response for one page.
    pub(crate) fn script(&self, page: &PageRef, response: FetchScript) {
        self.scripts
            .lock()
            .unwrap()
            .entry(page.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue challenge poll answers; `true` = still displayed.
    /// Once exhausted, polls report the challenge cleared.
    pub(crate) fn script_polls(&self, polls: Vec<bool>) {
        self.polls.lock().unwrap().extend(polls);
    }

    pub(crate) fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, page: &PageRef) -> Result<FetchResult> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&page.to_string())
            .and_then(VecDeque::pop_front);

        match script {
            None => Ok(FetchResult {
                raw_content: format!("record:{page}"),
                challenge_displayed: false,
                session_alive: true,
            }),
            Some(FetchScript::Content(content)) => Ok(FetchResult {
                raw_content: content.to_owned(),
                challenge_displayed: false,
                session_alive: true,
            }),
            Some(FetchScript::Challenge) => Ok(FetchResult {
                raw_content: String::new(),
                challenge_displayed: true,
                session_alive: true,
            }),
            Some(FetchScript::Timeout) => Err(FetchError::Timeout.into()),
            Some(FetchScript::SessionDead) => Err(FetchError::SessionDead.into()),
        }
    }

    async fn challenge_still_displayed(&self) -> Result<bool> {
        Ok(self.polls.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// Extractor that reads the mock content format.
///
/// `"record:a|b|c"` yields one record per `|`-separated identity;
/// `"empty"` yields no records; `"garbled"` fails extraction.
pub(crate) struct MockExtractor;

impl RecordExtractor for MockExtractor {
    fn extract(
        &self,
        raw_content: &str,
    ) -> std::result::Result<Vec<Record>, crate::error::ExtractError> {
        if raw_content == "empty" {
            return Ok(Vec::new());
        }
        if raw_content == "garbled" {
            return Err(crate::error::ExtractError("unparseable markup".into()));
        }
        let identities = raw_content.strip_prefix("record:").unwrap_or(raw_content);
        Ok(identities
            .split('|')
            .map(|identity| Record {
                source_url: format!("https://example.com/l/{}", identity.replace(' ', "-")),
                fields: serde_json::json!({ "identity": identity }),
                page: identity.to_owned(),
                scraped_at: Utc::now(),
            })
            .collect())
    }
}

/// Sink that collects records; optionally cancels a token after N emits.
pub(crate) struct MockSink {
    records: Mutex<Vec<Record>>,
    cancel_after: Mutex<Option<(u64, CancellationToken)>>,
    emitted: AtomicU64,
}

impl MockSink {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
            emitted: AtomicU64::new(0),
        }
    }

    /// Cancel `token` once `count` records have been emitted.
    pub(crate) fn cancel_after(&self, count: u64, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((count, token));
    }

    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MockSink {
    async fn emit(&self, record: &Record) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        let total = self.emitted.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if total >= *count {
                token.cancel();
            }
        }
        Ok(())
    }
}
