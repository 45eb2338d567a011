//! Seen-key snapshot queries for the dedup store.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Load every persisted dedup key
    ///
    /// Called once at startup to rebuild the in-memory set.
    pub async fn load_seen_keys(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT key FROM seen_keys")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to load seen keys: {}",
                    e
                )))
            })
    }

    /// Persist one dedup key; inserting an existing key is a no-op
    pub async fn insert_seen_key(&self, key: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO seen_keys (key, added_at) VALUES (?, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert seen key: {}",
                e
            )))
        })?;

        Ok(())
    }
}
