//! Artist repository trait and implementation

use crate::error::Result;
use crate::models::Artist;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};
use std::collections::HashSet;

/// Artist repository interface
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by id
    async fn find_by_id(&self, artist_id: &str) -> Result<Option<Artist>>;

    /// Insert or update an artist and replace its genre set.
    async fn upsert_with_genres(
        &self,
        artist_id: &str,
        name: &str,
        genres: &[String],
    ) -> Result<()>;

    /// Genres recorded for an artist, sorted.
    async fn genres_for(&self, artist_id: &str) -> Result<Vec<String>>;

    /// Filter `artist_ids` down to the ids with no mirrored details
    /// yet.
    ///
    /// The mirror sweep uses this to fetch only artists it has never
    /// seen instead of re-requesting the whole credit list.
    async fn find_missing(&self, artist_ids: &[String]) -> Result<Vec<String>>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, artist_id: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>(
            "SELECT artist_id, name, created_at, updated_at FROM artists WHERE artist_id = ?",
        )
        .bind(artist_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(artist)
    }

    async fn upsert_with_genres(
        &self,
        artist_id: &str,
        name: &str,
        genres: &[String],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query(
            r#"
            INSERT INTO artists (artist_id, name, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(artist_id) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(artist_id)
        .bind(name)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        query("DELETE FROM artist_genres WHERE artist_id = ?")
            .bind(artist_id)
            .execute(&mut *tx)
            .await?;

        for genre in genres {
            query("INSERT OR IGNORE INTO artist_genres (artist_id, genre) VALUES (?, ?)")
                .bind(artist_id)
                .bind(genre)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn genres_for(&self, artist_id: &str) -> Result<Vec<String>> {
        let genres = query_as::<_, (String,)>(
            "SELECT genre FROM artist_genres WHERE artist_id = ? ORDER BY genre ASC",
        )
        .bind(artist_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(|(genre,)| genre).collect())?;

        Ok(genres)
    }

    async fn find_missing(&self, artist_ids: &[String]) -> Result<Vec<String>> {
        if artist_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Rows with an empty name are credit placeholders inserted by
        // the track upsert; they still need their details fetched.
        let placeholders = vec!["?"; artist_ids.len()].join(", ");
        let sql = format!(
            "SELECT artist_id FROM artists WHERE artist_id IN ({}) AND name <> ''",
            placeholders
        );

        let mut q = query_as::<_, (String,)>(&sql);
        for id in artist_ids {
            q = q.bind(id);
        }

        let known: HashSet<String> = q
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(id,)| id)
            .collect();

        Ok(artist_ids
            .iter()
            .filter(|id| !known.contains(*id))
            .cloned()
            .collect())
    }
}
