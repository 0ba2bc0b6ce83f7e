//! Pending-change repository trait and implementation
//!
//! The queue of offline edits. Display order is newest first; replay
//! order is oldest first. `change_id` breaks timestamp ties in both
//! directions so same-second entries stay deterministic.

use crate::error::Result;
use crate::models::{ChangeType, PendingChange};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// A change not yet persisted; `enqueue` assigns the id and timestamp.
#[derive(Debug, Clone)]
pub struct NewPendingChange {
    pub user_id: String,
    pub change_type: ChangeType,
    pub playlist_id: String,
    pub playlist_name: Option<String>,
    pub track_id: Option<String>,
    pub track_name: Option<String>,
}

/// Pending-change repository interface
#[async_trait]
pub trait PendingChangeRepository: Send + Sync {
    /// Append a change; returns the assigned `change_id`.
    async fn enqueue(&self, change: &NewPendingChange) -> Result<i64>;

    /// Find a change by id
    async fn find_by_id(&self, change_id: i64) -> Result<Option<PendingChange>>;

    /// All of a user's pending changes, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PendingChange>>;

    /// Changes queued against one playlist, in replay (oldest-first)
    /// order.
    async fn list_for_playlist(&self, playlist_id: &str) -> Result<Vec<PendingChange>>;

    /// A user's queued playlist deletions, in replay order.
    async fn list_deletes_for_user(&self, user_id: &str) -> Result<Vec<PendingChange>>;

    /// Delete a change row. Returns `false` if it was already gone.
    async fn delete(&self, change_id: i64) -> Result<bool>;
}

/// SQLite implementation of PendingChangeRepository
pub struct SqlitePendingChangeRepository {
    pool: SqlitePool,
}

impl SqlitePendingChangeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingChangeRepository for SqlitePendingChangeRepository {
    async fn enqueue(&self, change: &NewPendingChange) -> Result<i64> {
        let result = query(
            r#"
            INSERT INTO pending_changes
                (user_id, change_type, playlist_id, playlist_name, track_id, track_name)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&change.user_id)
        .bind(change.change_type)
        .bind(&change.playlist_id)
        .bind(&change.playlist_name)
        .bind(&change.track_id)
        .bind(&change.track_name)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, change_id: i64) -> Result<Option<PendingChange>> {
        let change =
            query_as::<_, PendingChange>("SELECT * FROM pending_changes WHERE change_id = ?")
                .bind(change_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(change)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PendingChange>> {
        let changes = query_as::<_, PendingChange>(
            "SELECT * FROM pending_changes WHERE user_id = ?
             ORDER BY created_at DESC, change_id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }

    async fn list_for_playlist(&self, playlist_id: &str) -> Result<Vec<PendingChange>> {
        let changes = query_as::<_, PendingChange>(
            "SELECT * FROM pending_changes WHERE playlist_id = ?
             ORDER BY created_at ASC, change_id ASC",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }

    async fn list_deletes_for_user(&self, user_id: &str) -> Result<Vec<PendingChange>> {
        let changes = query_as::<_, PendingChange>(
            "SELECT * FROM pending_changes WHERE user_id = ? AND change_type = ?
             ORDER BY created_at ASC, change_id ASC",
        )
        .bind(user_id)
        .bind(ChangeType::DeletePlaylist)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }

    async fn delete(&self, change_id: i64) -> Result<bool> {
        let result = query("DELETE FROM pending_changes WHERE change_id = ?")
            .bind(change_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
