//! Duplicate detection
//!
//! Each extracted record gets a [`DedupKey`] derived from its canonicalized
//! source URL: parseable URLs are normalized (fragment stripped) and hashed
//! with SHA-256 so cosmetic differences in how a listing was reached don't
//! produce duplicate records. The full key set lives in memory for O(1)
//! lookups and is snapshotted to the database on every insert, so restarts
//! never re-emit records from earlier runs.

use crate::db::Database;
use crate::types::Record;
use crate::Result;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// Stable identity of a record for duplicate detection
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    /// Derive the key for a record from its canonicalized source URL.
    pub fn from_record(record: &Record) -> Self {
        let canonical = canonicalize(&record.source_url);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest backing this key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        // Not a URL; fall back to a case-insensitive comparison key
        Err(_) => trimmed.to_lowercase(),
    }
}

/// Persistent set of already-emitted record identities
#[derive(Debug)]
pub struct DedupStore {
    db: Arc<Database>,
    seen: HashSet<String>,
}

impl DedupStore {
    /// Rebuild the in-memory set from the persisted snapshot.
    pub async fn restore(db: Arc<Database>) -> Result<Self> {
        let seen: HashSet<String> = db.load_seen_keys().await?.into_iter().collect();
        tracing::debug!(keys = seen.len(), "Restored dedup snapshot");
        Ok(Self { db, seen })
    }

    /// Whether this key has been inserted before.
    pub fn contains(&self, key: &DedupKey) -> bool {
        self.seen.contains(key.as_str())
    }

    /// Add a key to the set and persist it; re-inserting is a no-op.
    pub async fn insert(&mut self, key: &DedupKey) -> Result<()> {
        if self.seen.insert(key.as_str().to_owned()) {
            self.db.insert_seen_key(key.as_str()).await?;
        }
        Ok(())
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no keys have been seen yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn record(source_url: &str) -> Record {
        Record {
            source_url: source_url.into(),
            fields: serde_json::json!({"title": "listing"}),
            page: "page 1".into(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn same_url_yields_same_key() {
        let a = DedupKey::from_record(&record("https://example.com/item/42"));
        let b = DedupKey::from_record(&record("https://example.com/item/42"));
        assert_eq!(a, b);
    }

    #[test]
    fn fragment_and_whitespace_are_ignored() {
        let a = DedupKey::from_record(&record("https://example.com/item/42"));
        let b = DedupKey::from_record(&record("https://example.com/item/42#photos"));
        let c = DedupKey::from_record(&record("  https://example.com/item/42 "));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn different_urls_yield_different_keys() {
        let a = DedupKey::from_record(&record("https://example.com/item/42"));
        let b = DedupKey::from_record(&record("https://example.com/item/43"));
        assert_ne!(a, b);
    }

    #[test]
    fn non_url_identity_compares_case_insensitively() {
        let a = DedupKey::from_record(&record("Listing 42 Main St"));
        let b = DedupKey::from_record(&record("listing 42 main st"));
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn insert_then_contains() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
        let mut store = DedupStore::restore(db).await.unwrap();

        let key = DedupKey::from_record(&record("https://example.com/item/1"));
        assert!(!store.contains(&key));
        store.insert(&key).await.unwrap();
        assert!(store.contains(&key));

        // Idempotent
        store.insert(&key).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn keys_survive_restore() {
        let temp_file = NamedTempFile::new().unwrap();
        let key = DedupKey::from_record(&record("https://example.com/item/1"));

        {
            let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
            let mut store = DedupStore::restore(db.clone()).await.unwrap();
            store.insert(&key).await.unwrap();
            db.close().await;
        }

        let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
        let store = DedupStore::restore(db).await.unwrap();
        assert!(store.contains(&key));
    }
}
