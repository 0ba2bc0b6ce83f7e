//! Playlist repository trait and implementation
//!
//! Mirror edits that must reach the remote catalog later are recorded
//! as pending changes inside the same transaction as the edit itself.
//! No membership can be removed from a synced playlist without the
//! `REMOVE_TRACK` intent being durably queued alongside it.

use crate::error::{MirrorError, Result};
use crate::models::{generate_local_playlist_id, ChangeType, Playlist};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};
use tracing::instrument;

/// Playlist repository interface
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by id
    async fn find_by_id(&self, playlist_id: &str) -> Result<Option<Playlist>>;

    /// Insert or update a playlist mirrored from the remote catalog.
    async fn upsert(&self, playlist: &Playlist) -> Result<()>;

    /// All playlists owned by a user, by name.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Playlist>>;

    /// Replace the playlist's membership with the given tracks, in
    /// order. Used by resync; records no pending changes.
    async fn replace_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Track ids in playlist order.
    async fn track_ids(&self, playlist_id: &str) -> Result<Vec<String>>;

    /// Append a track to a playlist, ignoring an existing membership.
    /// Records no pending change; used to undo a cancelled removal.
    async fn add_track(&self, playlist_id: &str, track_id: &str) -> Result<()>;

    /// Create a local-only playlist and queue its remote creation.
    ///
    /// The playlist gets a `local_` prefixed id, its memberships are
    /// inserted, and a `CREATE_PLAYLIST` pending change is appended,
    /// all in one transaction.
    async fn create_local(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> Result<Playlist>;

    /// Remove a track from a playlist, queueing the remote removal.
    ///
    /// Deletes the membership row and, for synced playlists, inserts
    /// the `REMOVE_TRACK` pending change in the same transaction.
    /// Local-only playlists record no change: their eventual remote
    /// creation pushes whatever membership exists at that moment.
    ///
    /// Returns `false` (and records nothing) when the membership did
    /// not exist.
    async fn remove_track_recording_change(
        &self,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<bool>;

    /// Delete a playlist, queueing the remote deletion.
    ///
    /// Snapshots the playlist name into a `DELETE_PLAYLIST` change,
    /// purges any pending changes still referencing the playlist, and
    /// deletes the row (cascade clears memberships) in one
    /// transaction. Local-only playlists queue no remote deletion;
    /// there is nothing remote to delete.
    async fn delete_recording_change(&self, playlist_id: &str) -> Result<()>;

    /// Delete a playlist row without recording anything, but only if
    /// it is still local-only.
    ///
    /// Used to retire a local id after its remote counterpart has been
    /// created, and to roll back a cancelled local creation. Returns
    /// `false` if the playlist was absent or already synced.
    async fn delete_local_only(&self, playlist_id: &str) -> Result<bool>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, playlist_id: &str) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>(
            "SELECT playlist_id, user_id, name, description, image_url, is_local_only,
                    created_at, updated_at
             FROM playlists WHERE playlist_id = ?",
        )
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(playlist)
    }

    async fn upsert(&self, playlist: &Playlist) -> Result<()> {
        playlist.validate().map_err(|e| MirrorError::InvalidInput {
            field: "Playlist".to_string(),
            message: e,
        })?;

        query(
            r#"
            INSERT INTO playlists (playlist_id, user_id, name, description, image_url,
                                   is_local_only, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(playlist_id) DO UPDATE SET
                user_id = excluded.user_id,
                name = excluded.name,
                description = excluded.description,
                image_url = excluded.image_url,
                is_local_only = excluded.is_local_only,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&playlist.playlist_id)
        .bind(&playlist.user_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.image_url)
        .bind(playlist.is_local_only)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let playlists = query_as::<_, Playlist>(
            "SELECT playlist_id, user_id, name, description, image_url, is_local_only,
                    created_at, updated_at
             FROM playlists WHERE user_id = ? ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    async fn replace_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;

        for (position, track_id) in track_ids.iter().enumerate() {
            query(
                "INSERT OR IGNORE INTO playlist_tracks (playlist_id, track_id, position)
                 VALUES (?, ?, ?)",
            )
            .bind(playlist_id)
            .bind(track_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn track_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        let track_ids = query_as::<_, (String,)>(
            "SELECT track_id FROM playlist_tracks WHERE playlist_id = ? ORDER BY position ASC",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(|(id,)| id).collect())?;

        Ok(track_ids)
    }

    async fn add_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        query(
            r#"
            INSERT OR IGNORE INTO playlist_tracks (playlist_id, track_id, position)
            VALUES (?, ?, (SELECT COALESCE(MAX(position) + 1, 0)
                           FROM playlist_tracks WHERE playlist_id = ?))
            "#,
        )
        .bind(playlist_id)
        .bind(track_id)
        .bind(playlist_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, track_ids), fields(user_id = %user_id, name = %name))]
    async fn create_local(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> Result<Playlist> {
        if name.trim().is_empty() {
            return Err(MirrorError::InvalidInput {
                field: "name".to_string(),
                message: "Playlist name cannot be empty".to_string(),
            });
        }

        let playlist_id = generate_local_playlist_id();
        let now = Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        query(
            r#"
            INSERT INTO playlists (playlist_id, user_id, name, description, is_local_only,
                                   created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&playlist_id)
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, track_id) in track_ids.iter().enumerate() {
            query(
                "INSERT INTO playlist_tracks (playlist_id, track_id, position) VALUES (?, ?, ?)",
            )
            .bind(&playlist_id)
            .bind(track_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        query(
            r#"
            INSERT INTO pending_changes (user_id, change_type, playlist_id, playlist_name)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(ChangeType::CreatePlaylist)
        .bind(&playlist_id)
        .bind(name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(playlist_id = %playlist_id, "Created local playlist");

        Ok(Playlist {
            playlist_id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: description.map(String::from),
            image_url: None,
            is_local_only: true,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id, track_id = %track_id))]
    async fn remove_track_recording_change(
        &self,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let playlist = query_as::<_, (String, String, bool)>(
            "SELECT user_id, name, is_local_only FROM playlists WHERE playlist_id = ?",
        )
        .bind(playlist_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, playlist_name, is_local_only)) = playlist else {
            return Err(MirrorError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist_id.to_string(),
            });
        };

        let result = query("DELETE FROM playlist_tracks WHERE playlist_id = ? AND track_id = ?")
            .bind(playlist_id)
            .bind(track_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Membership was never there; nothing to push upstream.
            tx.rollback().await?;
            return Ok(false);
        }

        if !is_local_only {
            let track_name: Option<(String,)> =
                query_as("SELECT name FROM tracks WHERE track_id = ?")
                    .bind(track_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            query(
                r#"
                INSERT INTO pending_changes
                    (user_id, change_type, playlist_id, playlist_name, track_id, track_name)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user_id)
            .bind(ChangeType::RemoveTrack)
            .bind(playlist_id)
            .bind(&playlist_name)
            .bind(track_id)
            .bind(track_name.map(|(name,)| name))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    async fn delete_recording_change(&self, playlist_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let playlist = query_as::<_, (String, String, bool)>(
            "SELECT user_id, name, is_local_only FROM playlists WHERE playlist_id = ?",
        )
        .bind(playlist_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, name, is_local_only)) = playlist else {
            return Err(MirrorError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist_id.to_string(),
            });
        };

        // Changes queued against this playlist are moot once it is
        // gone; for a local-only playlist this is where the queued
        // CREATE_PLAYLIST dies.
        query("DELETE FROM pending_changes WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;

        if !is_local_only {
            query(
                r#"
                INSERT INTO pending_changes (user_id, change_type, playlist_id, playlist_name)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&user_id)
            .bind(ChangeType::DeletePlaylist)
            .bind(playlist_id)
            .bind(&name)
            .execute(&mut *tx)
            .await?;
        }

        query("DELETE FROM playlists WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(was_local = is_local_only, "Deleted playlist from mirror");
        Ok(())
    }

    async fn delete_local_only(&self, playlist_id: &str) -> Result<bool> {
        let result = query("DELETE FROM playlists WHERE playlist_id = ? AND is_local_only = 1")
            .bind(playlist_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{is_local_playlist_id, PendingChange, Track};
    use crate::repositories::track::{SqliteTrackRepository, TrackRepository};
    use crate::repositories::user::{SqliteUserRepository, UserRepository};

    async fn seed(pool: &SqlitePool) {
        let users = SqliteUserRepository::new(pool.clone());
        users.upsert("user-1", Some("Alice"), None, None).await.unwrap();

        let tracks = SqliteTrackRepository::new(pool.clone());
        for id in ["t1", "t2", "t3"] {
            let track = Track {
                track_id: id.to_string(),
                name: format!("Track {}", id),
                album_name: None,
                album_image_url: None,
                duration_ms: 180_000,
                popularity: None,
                created_at: 0,
                updated_at: 0,
            };
            tracks.upsert_with_artists(&track, &[]).await.unwrap();
        }
    }

    fn synced_playlist(id: &str) -> Playlist {
        Playlist {
            playlist_id: id.to_string(),
            user_id: "user-1".to_string(),
            name: "Road Trip".to_string(),
            description: Some("Long drives".to_string()),
            image_url: None,
            is_local_only: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    async fn pending_changes(pool: &SqlitePool) -> Vec<PendingChange> {
        query_as::<_, PendingChange>("SELECT * FROM pending_changes ORDER BY change_id ASC")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool);

        repo.upsert(&synced_playlist("p1")).await.unwrap();
        repo.upsert(&synced_playlist("p2")).await.unwrap();

        let playlists = repo.list_by_user("user-1").await.unwrap();
        assert_eq!(playlists.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_tracks_sets_order() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool);

        repo.upsert(&synced_playlist("p1")).await.unwrap();
        repo.replace_tracks("p1", &["t2".to_string(), "t1".to_string()])
            .await
            .unwrap();

        assert_eq!(repo.track_ids("p1").await.unwrap(), vec!["t2", "t1"]);

        repo.replace_tracks("p1", &["t3".to_string()]).await.unwrap();
        assert_eq!(repo.track_ids("p1").await.unwrap(), vec!["t3"]);
    }

    #[tokio::test]
    async fn test_create_local_records_change() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        let playlist = repo
            .create_local("user-1", "Gym", Some("Lifting"), &["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();

        assert!(is_local_playlist_id(&playlist.playlist_id));
        assert!(playlist.is_local_only);
        assert_eq!(
            repo.track_ids(&playlist.playlist_id).await.unwrap(),
            vec!["t1", "t2"]
        );

        let changes = pending_changes(&pool).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::CreatePlaylist);
        assert_eq!(changes[0].playlist_id, playlist.playlist_id);
        assert_eq!(changes[0].playlist_name.as_deref(), Some("Gym"));
    }

    #[tokio::test]
    async fn test_remove_track_records_change_with_snapshots() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        repo.upsert(&synced_playlist("p1")).await.unwrap();
        repo.replace_tracks("p1", &["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();

        let removed = repo.remove_track_recording_change("p1", "t1").await.unwrap();
        assert!(removed);
        assert_eq!(repo.track_ids("p1").await.unwrap(), vec!["t2"]);

        let changes = pending_changes(&pool).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::RemoveTrack);
        assert_eq!(changes[0].track_id.as_deref(), Some("t1"));
        assert_eq!(changes[0].track_name.as_deref(), Some("Track t1"));
        assert_eq!(changes[0].playlist_name.as_deref(), Some("Road Trip"));
    }

    #[tokio::test]
    async fn test_remove_missing_membership_records_nothing() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        repo.upsert(&synced_playlist("p1")).await.unwrap();

        let removed = repo.remove_track_recording_change("p1", "t1").await.unwrap();
        assert!(!removed);
        assert!(pending_changes(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_from_local_only_records_nothing() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        let playlist = repo
            .create_local("user-1", "Gym", None, &["t1".to_string()])
            .await
            .unwrap();

        let removed = repo
            .remove_track_recording_change(&playlist.playlist_id, "t1")
            .await
            .unwrap();
        assert!(removed);

        // Only the CREATE_PLAYLIST entry remains
        let changes = pending_changes(&pool).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::CreatePlaylist);
    }

    #[tokio::test]
    async fn test_delete_records_change_and_snapshots_name() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        repo.upsert(&synced_playlist("p1")).await.unwrap();
        repo.replace_tracks("p1", &["t1".to_string()]).await.unwrap();

        repo.delete_recording_change("p1").await.unwrap();

        assert!(repo.find_by_id("p1").await.unwrap().is_none());
        // Cascade cleared memberships
        assert!(repo.track_ids("p1").await.unwrap().is_empty());

        let changes = pending_changes(&pool).await;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::DeletePlaylist);
        assert_eq!(changes[0].playlist_name.as_deref(), Some("Road Trip"));
    }

    #[tokio::test]
    async fn test_delete_local_only_queues_no_remote_delete() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool.clone());

        let playlist = repo
            .create_local("user-1", "Gym", None, &[])
            .await
            .unwrap();

        repo.delete_recording_change(&playlist.playlist_id)
            .await
            .unwrap();

        // The queued CREATE_PLAYLIST died with the playlist, and no
        // DELETE_PLAYLIST was queued
        assert!(pending_changes(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_playlist_is_not_found() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePlaylistRepository::new(pool);

        let result = repo.delete_recording_change("ghost").await;
        assert!(matches!(result, Err(MirrorError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_local_only_guard() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let repo = SqlitePlaylistRepository::new(pool);

        repo.upsert(&synced_playlist("p1")).await.unwrap();

        // Synced playlists are not touched
        assert!(!repo.delete_local_only("p1").await.unwrap());
        assert!(repo.find_by_id("p1").await.unwrap().is_some());

        let local = repo.create_local("user-1", "Gym", None, &[]).await.unwrap();
        assert!(repo.delete_local_only(&local.playlist_id).await.unwrap());
    }
}
