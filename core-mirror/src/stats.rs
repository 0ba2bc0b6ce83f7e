//! Playlist statistics
//!
//! Aggregates computed from the mirror at read time. The derived
//! `track_genres` table keeps the genre histogram a single join.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{query_as, SqlitePool};

/// How many playlist tracks carry a genre / credit an artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Aggregate view of one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistStats {
    pub track_count: i64,
    pub total_duration_ms: i64,
    /// Genre histogram, most common first.
    pub genres: Vec<LabelCount>,
    /// Most-credited artists, capped at ten.
    pub top_artists: Vec<LabelCount>,
}

/// Read-side aggregate queries.
pub struct LibraryStats {
    pool: SqlitePool,
}

impl LibraryStats {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn playlist_stats(&self, playlist_id: &str) -> Result<PlaylistStats> {
        let (track_count, total_duration_ms): (i64, i64) = query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(t.duration_ms), 0)
            FROM playlist_tracks pt
            JOIN tracks t ON t.track_id = pt.track_id
            WHERE pt.playlist_id = ?
            "#,
        )
        .bind(playlist_id)
        .fetch_one(&self.pool)
        .await?;

        let genres = query_as::<_, (String, i64)>(
            r#"
            SELECT tg.genre, COUNT(*) AS n
            FROM playlist_tracks pt
            JOIN track_genres tg ON tg.track_id = pt.track_id
            WHERE pt.playlist_id = ?
            GROUP BY tg.genre
            ORDER BY n DESC, tg.genre ASC
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();

        let top_artists = query_as::<_, (String, i64)>(
            r#"
            SELECT a.name, COUNT(*) AS n
            FROM playlist_tracks pt
            JOIN track_artists ta ON ta.track_id = pt.track_id
            JOIN artists a ON a.artist_id = ta.artist_id
            WHERE pt.playlist_id = ?
            GROUP BY a.artist_id
            ORDER BY n DESC, a.name ASC
            LIMIT 10
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();

        Ok(PlaylistStats {
            track_count,
            total_duration_ms,
            genres,
            top_artists,
        })
    }
}
