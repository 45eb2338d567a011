//! Work item queries: seeding, restore, per-item status updates.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, WorkItemRow};

impl Database {
    /// Insert a work item unless a row for the same page already exists
    ///
    /// Returns true if a row was inserted. Seeding relies on this being a
    /// no-op for pages that survived a previous run, so restarts resume
    /// rather than reset.
    pub async fn insert_work_item_if_absent(&self, position: i64, page: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO work_items (position, page, status, attempts, failure, updated_at)
            VALUES (?, ?, 0, 0, NULL, ?)
            ON CONFLICT(page) DO NOTHING
            "#,
        )
        .bind(position)
        .bind(page)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert work item: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Load all work items in queue order
    pub async fn load_work_items(&self) -> Result<Vec<WorkItemRow>> {
        sqlx::query_as::<_, WorkItemRow>(
            r#"
            SELECT position, page, status, attempts, failure, updated_at
            FROM work_items
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load work items: {}",
                e
            )))
        })
    }

    /// Update one item's status, attempt count, and failure description
    pub async fn update_work_item(
        &self,
        position: i64,
        status: i32,
        attempts: i64,
        failure: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE work_items
            SET status = ?, attempts = ?, failure = ?, updated_at = ?
            WHERE position = ?
            "#,
        )
        .bind(status)
        .bind(attempts)
        .bind(failure)
        .bind(now)
        .bind(position)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update work item {}: {}",
                position, e
            )))
        })?;

        Ok(())
    }

    /// Demote in-flight items back to pending
    ///
    /// Called once on restore. Items interrupted mid-fetch are re-attempted,
    /// giving at-least-once processing across crashes.
    pub async fn demote_in_flight_items(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE work_items SET status = 0, updated_at = ? WHERE status = 1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to demote in-flight items: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Reset failed items to pending
    ///
    /// The only sanctioned status regression besides in-flight demotion;
    /// triggered explicitly by the operator, never automatically.
    pub async fn reset_failed_items(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE work_items
            SET status = 0, failure = NULL, updated_at = ?
            WHERE status = 3
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to reset failed items: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}
