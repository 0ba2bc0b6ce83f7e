//! Track filtering and search
//!
//! Filter syntax mirrors what the playlist view accepts:
//!
//! - `"daft punk"`: a quoted string is one exact (case-insensitive)
//!   match against a track's name, album, artist, or genre
//! - `electronic, french`: unquoted input splits on commas into fuzzy
//!   terms; every term must match at least one field (AND of ORs)
//!
//! Empty input matches everything.

use crate::error::Result;
use crate::models::Track;
use crate::repositories::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use sqlx::{query_as, SqlitePool};

/// A single parsed filter term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterTerm {
    /// Must equal a field exactly (case-insensitive).
    Exact(String),
    /// Must be contained in a field (case-insensitive).
    Fuzzy(String),
}

/// Parsed track filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackFilter {
    pub terms: Vec<FilterTerm>,
}

impl TrackFilter {
    /// Parse user input into filter terms.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            let inner = trimmed[1..trimmed.len() - 1].trim();
            if inner.is_empty() {
                return Self::default();
            }
            return Self {
                terms: vec![FilterTerm::Exact(inner.to_string())],
            };
        }

        Self {
            terms: trimmed
                .split(',')
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(|term| FilterTerm::Fuzzy(term.to_string()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Read-side search over the mirrored tracks.
pub struct LibraryQuery {
    pool: SqlitePool,
}

impl LibraryQuery {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Search tracks by name, album, artist, or genre.
    ///
    /// `playlist_id` scopes the search to one playlist's membership;
    /// `None` searches the whole mirror.
    pub async fn search_tracks(
        &self,
        playlist_id: Option<&str>,
        filter: &TrackFilter,
        page_request: PageRequest,
    ) -> Result<Page<Track>> {
        let mut conditions = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if playlist_id.is_some() {
            conditions.push(
                "EXISTS (SELECT 1 FROM playlist_tracks pt
                         WHERE pt.track_id = t.track_id AND pt.playlist_id = ?)"
                    .to_string(),
            );
        }

        for term in &filter.terms {
            let (operator, value) = match term {
                FilterTerm::Exact(value) => ("=", value.clone()),
                FilterTerm::Fuzzy(value) => ("LIKE", format!("%{}%", value)),
            };

            conditions.push(format!(
                "(t.name {op} ? COLLATE NOCASE
                  OR t.album_name {op} ? COLLATE NOCASE
                  OR EXISTS (SELECT 1 FROM track_artists ta
                             JOIN artists a ON a.artist_id = ta.artist_id
                             WHERE ta.track_id = t.track_id
                               AND a.name {op} ? COLLATE NOCASE)
                  OR EXISTS (SELECT 1 FROM track_genres tg
                             WHERE tg.track_id = t.track_id
                               AND tg.genre {op} ? COLLATE NOCASE))",
                op = operator
            ));
            // One bind per field comparison
            for _ in 0..4 {
                binds.push(value.clone());
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM tracks t {}", where_clause);
        let mut count_query = query_as::<_, (i64,)>(&count_sql);
        if let Some(id) = playlist_id {
            count_query = count_query.bind(id.to_string());
        }
        for bind in &binds {
            count_query = count_query.bind(bind.clone());
        }
        let (total,) = count_query.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT t.* FROM tracks t {} ORDER BY t.name ASC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut select_query = query_as::<_, Track>(&select_sql);
        if let Some(id) = playlist_id {
            select_query = select_query.bind(id.to_string());
        }
        for bind in &binds {
            select_query = select_query.bind(bind.clone());
        }
        let tracks = select_query
            .bind(page_request.limit())
            .bind(page_request.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(tracks, total as u64, page_request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::{
        ArtistRepository, PlaylistRepository, SqliteArtistRepository, SqlitePlaylistRepository,
        SqliteTrackRepository, SqliteUserRepository, TrackRepository, UserRepository,
    };

    #[test]
    fn test_parse_empty() {
        assert!(TrackFilter::parse("").is_empty());
        assert!(TrackFilter::parse("   ").is_empty());
        assert!(TrackFilter::parse("\"\"").is_empty());
    }

    #[test]
    fn test_parse_quoted_exact() {
        let filter = TrackFilter::parse("\"Daft Punk\"");
        assert_eq!(filter.terms, vec![FilterTerm::Exact("Daft Punk".to_string())]);
    }

    #[test]
    fn test_parse_comma_fuzzy() {
        let filter = TrackFilter::parse("electronic, french ,  house");
        assert_eq!(
            filter.terms,
            vec![
                FilterTerm::Fuzzy("electronic".to_string()),
                FilterTerm::Fuzzy("french".to_string()),
                FilterTerm::Fuzzy("house".to_string()),
            ]
        );
    }

    async fn seed(pool: &SqlitePool) {
        SqliteUserRepository::new(pool.clone())
            .upsert("user-1", None, None, None)
            .await
            .unwrap();

        let artists = SqliteArtistRepository::new(pool.clone());
        artists
            .upsert_with_genres("a1", "Daft Punk", &["french house".to_string()])
            .await
            .unwrap();
        artists
            .upsert_with_genres("a2", "Air", &["downtempo".to_string()])
            .await
            .unwrap();

        let tracks = SqliteTrackRepository::new(pool.clone());
        for (id, name, album, artist) in [
            ("t1", "One More Time", "Discovery", "a1"),
            ("t2", "Digital Love", "Discovery", "a1"),
            ("t3", "La Femme d'Argent", "Moon Safari", "a2"),
        ] {
            let track = Track {
                track_id: id.to_string(),
                name: name.to_string(),
                album_name: Some(album.to_string()),
                album_image_url: None,
                duration_ms: 240_000,
                popularity: None,
                created_at: 0,
                updated_at: 0,
            };
            tracks
                .upsert_with_artists(&track, &[artist.to_string()])
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_search_by_fuzzy_name() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let query = LibraryQuery::new(pool);

        let page = query
            .search_tracks(None, &TrackFilter::parse("love"), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Digital Love");
    }

    #[tokio::test]
    async fn test_search_by_exact_artist() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let query = LibraryQuery::new(pool);

        let page = query
            .search_tracks(
                None,
                &TrackFilter::parse("\"daft punk\""),
                PageRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 2);

        // Exact requires the whole field to match
        let none = query
            .search_tracks(None, &TrackFilter::parse("\"daft\""), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(none.total, 0);
    }

    #[tokio::test]
    async fn test_search_terms_are_anded() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let query = LibraryQuery::new(pool);

        // "discovery" matches t1+t2 via album, "digital" narrows to t2
        let page = query
            .search_tracks(
                None,
                &TrackFilter::parse("discovery, digital"),
                PageRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].track_id, "t2");
    }

    #[tokio::test]
    async fn test_search_by_genre() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;
        let query = LibraryQuery::new(pool);

        let page = query
            .search_tracks(None, &TrackFilter::parse("house"), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_search_scoped_to_playlist() {
        let pool = create_test_pool().await.unwrap();
        seed(&pool).await;

        let playlists = SqlitePlaylistRepository::new(pool.clone());
        playlists
            .create_local("user-1", "French Touch", None, &["t1".to_string()])
            .await
            .unwrap();
        let playlist_id = playlists.list_by_user("user-1").await.unwrap()[0]
            .playlist_id
            .clone();

        let query = LibraryQuery::new(pool);
        let page = query
            .search_tracks(
                Some(&playlist_id),
                &TrackFilter::default(),
                PageRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].track_id, "t1");
    }
}
