//! Daily quota state persistence (single-row table).

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, QuotaRow};

impl Database {
    /// Load the persisted quota state, if any
    pub async fn load_quota_state(&self) -> Result<Option<QuotaRow>> {
        sqlx::query_as::<_, QuotaRow>(
            r#"
            SELECT day, fetched_count FROM quota_state WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load quota state: {}",
                e
            )))
        })
    }

    /// Persist the quota counter for the given calendar day
    ///
    /// Upserts the single row; callers persist before acting on the new
    /// count so a crash can only under-count, never over-count.
    pub async fn save_quota_state(&self, day: &str, fetched_count: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO quota_state (id, day, fetched_count, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET day = ?, fetched_count = ?, updated_at = ?
            "#,
        )
        .bind(day)
        .bind(fetched_count)
        .bind(now)
        .bind(day)
        .bind(fetched_count)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to save quota state: {}",
                e
            )))
        })?;

        Ok(())
    }
}
