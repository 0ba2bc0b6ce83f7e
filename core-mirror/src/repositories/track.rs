//! Track repository trait and implementation
//!
//! Tracks carry their artist links and a derived genre set. The genre
//! set is the union of the linked artists' genres and is recomputed
//! whenever either side of that join changes.

use crate::error::{MirrorError, Result};
use crate::models::{Artist, Track, TrackWithArtists};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, Sqlite, SqlitePool, Transaction};

/// Track repository interface
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a track by id
    async fn find_by_id(&self, track_id: &str) -> Result<Option<Track>>;

    /// Insert or update a track, replace its artist links, and
    /// recompute its derived genres.
    ///
    /// `artist_ids` is the credited order; position is the index.
    async fn upsert_with_artists(&self, track: &Track, artist_ids: &[String]) -> Result<()>;

    /// Load a track with its artists and derived genres.
    async fn with_artists(&self, track_id: &str) -> Result<Option<TrackWithArtists>>;

    /// Derived genres for a track, sorted.
    async fn genres_for(&self, track_id: &str) -> Result<Vec<String>>;

    /// Recompute derived genres for every track crediting an artist.
    ///
    /// Called after an artist's genre set changes: artist details
    /// arrive in a later sweep than the tracks crediting them.
    async fn refresh_genres_for_artist(&self, artist_id: &str) -> Result<()>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn recompute_genres(tx: &mut Transaction<'_, Sqlite>, track_id: &str) -> Result<()> {
        query("DELETE FROM track_genres WHERE track_id = ?")
            .bind(track_id)
            .execute(&mut **tx)
            .await?;

        query(
            r#"
            INSERT OR IGNORE INTO track_genres (track_id, genre)
            SELECT DISTINCT ta.track_id, ag.genre
            FROM track_artists ta
            JOIN artist_genres ag ON ag.artist_id = ta.artist_id
            WHERE ta.track_id = ?
            "#,
        )
        .bind(track_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_by_id(&self, track_id: &str) -> Result<Option<Track>> {
        let track = query_as::<_, Track>("SELECT * FROM tracks WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(track)
    }

    async fn upsert_with_artists(&self, track: &Track, artist_ids: &[String]) -> Result<()> {
        track.validate().map_err(|e| MirrorError::InvalidInput {
            field: "Track".to_string(),
            message: e,
        })?;

        let mut tx = self.pool.begin().await?;

        query(
            r#"
            INSERT INTO tracks (track_id, name, album_name, album_image_url, duration_ms, popularity, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                name = excluded.name,
                album_name = excluded.album_name,
                album_image_url = excluded.album_image_url,
                duration_ms = excluded.duration_ms,
                popularity = excluded.popularity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&track.track_id)
        .bind(&track.name)
        .bind(&track.album_name)
        .bind(&track.album_image_url)
        .bind(track.duration_ms)
        .bind(track.popularity)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        query("DELETE FROM track_artists WHERE track_id = ?")
            .bind(&track.track_id)
            .execute(&mut *tx)
            .await?;

        for (position, artist_id) in artist_ids.iter().enumerate() {
            // Placeholder row so the foreign key holds; the artist
            // sweep fills in name and genres later.
            query("INSERT OR IGNORE INTO artists (artist_id, name) VALUES (?, '')")
                .bind(artist_id)
                .execute(&mut *tx)
                .await?;

            query(
                "INSERT INTO track_artists (track_id, artist_id, position) VALUES (?, ?, ?)",
            )
            .bind(&track.track_id)
            .bind(artist_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        Self::recompute_genres(&mut tx, &track.track_id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn with_artists(&self, track_id: &str) -> Result<Option<TrackWithArtists>> {
        let Some(track) = self.find_by_id(track_id).await? else {
            return Ok(None);
        };

        let artists = query_as::<_, Artist>(
            r#"
            SELECT a.artist_id, a.name, a.created_at, a.updated_at
            FROM artists a
            JOIN track_artists ta ON ta.artist_id = a.artist_id
            WHERE ta.track_id = ?
            ORDER BY ta.position ASC
            "#,
        )
        .bind(track_id)
        .fetch_all(&self.pool)
        .await?;

        let genres = self.genres_for(track_id).await?;

        Ok(Some(TrackWithArtists {
            track,
            artists,
            genres,
        }))
    }

    async fn genres_for(&self, track_id: &str) -> Result<Vec<String>> {
        let genres = query_as::<_, (String,)>(
            "SELECT genre FROM track_genres WHERE track_id = ? ORDER BY genre ASC",
        )
        .bind(track_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(|(genre,)| genre).collect())?;

        Ok(genres)
    }

    async fn refresh_genres_for_artist(&self, artist_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query(
            r#"
            DELETE FROM track_genres
            WHERE track_id IN (SELECT track_id FROM track_artists WHERE artist_id = ?)
            "#,
        )
        .bind(artist_id)
        .execute(&mut *tx)
        .await?;

        query(
            r#"
            INSERT OR IGNORE INTO track_genres (track_id, genre)
            SELECT DISTINCT ta.track_id, ag.genre
            FROM track_artists ta
            JOIN artist_genres ag ON ag.artist_id = ta.artist_id
            WHERE ta.track_id IN (SELECT track_id FROM track_artists WHERE artist_id = ?)
            "#,
        )
        .bind(artist_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::artist::{ArtistRepository, SqliteArtistRepository};

    fn track(id: &str, name: &str) -> Track {
        Track {
            track_id: id.to_string(),
            name: name.to_string(),
            album_name: Some("Album".to_string()),
            album_image_url: None,
            duration_ms: 200_000,
            popularity: Some(40),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_find_track() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.upsert_with_artists(&track("t1", "Song"), &["a1".to_string()])
            .await
            .unwrap();

        let found = repo.find_by_id("t1").await.unwrap().unwrap();
        assert_eq!(found.name, "Song");
        assert_eq!(found.album_name.as_deref(), Some("Album"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_artist_links() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool.clone());
        let artists = SqliteArtistRepository::new(pool);

        artists.upsert_with_genres("a1", "First", &[]).await.unwrap();
        artists.upsert_with_genres("a2", "Second", &[]).await.unwrap();

        repo.upsert_with_artists(&track("t1", "Song"), &["a1".to_string()])
            .await
            .unwrap();
        repo.upsert_with_artists(&track("t1", "Song"), &["a2".to_string(), "a1".to_string()])
            .await
            .unwrap();

        let with_artists = repo.with_artists("t1").await.unwrap().unwrap();
        let names: Vec<&str> = with_artists
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        // Credited order preserved
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_genres_derived_from_artists() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool.clone());
        let artists = SqliteArtistRepository::new(pool);

        artists
            .upsert_with_genres("a1", "One", &["ambient".to_string(), "idm".to_string()])
            .await
            .unwrap();
        artists
            .upsert_with_genres("a2", "Two", &["idm".to_string(), "techno".to_string()])
            .await
            .unwrap();

        repo.upsert_with_artists(&track("t1", "Song"), &["a1".to_string(), "a2".to_string()])
            .await
            .unwrap();

        // Union of both artists' genres, deduplicated
        assert_eq!(
            repo.genres_for("t1").await.unwrap(),
            vec!["ambient", "idm", "techno"]
        );
    }

    #[tokio::test]
    async fn test_refresh_genres_after_artist_update() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool.clone());
        let artists = SqliteArtistRepository::new(pool);

        // Track arrives before the artist sweep has genre data
        repo.upsert_with_artists(&track("t1", "Song"), &["a1".to_string()])
            .await
            .unwrap();
        assert!(repo.genres_for("t1").await.unwrap().is_empty());

        artists
            .upsert_with_genres("a1", "One", &["dub".to_string()])
            .await
            .unwrap();
        repo.refresh_genres_for_artist("a1").await.unwrap();

        assert_eq!(repo.genres_for("t1").await.unwrap(), vec!["dub"]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_track() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        let result = repo.upsert_with_artists(&track("t1", "  "), &[]).await;
        assert!(matches!(result, Err(MirrorError::InvalidInput { .. })));
    }
}
