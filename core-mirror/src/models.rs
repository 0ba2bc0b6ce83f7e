//! Domain models for the library mirror
//!
//! Rows map 1:1 onto the mirror schema. Identifiers are the remote
//! catalog's own string ids, except locally created playlists, which
//! carry a `local_` prefixed id until reconciliation promotes them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Prefix carried by playlists that exist only in the mirror.
pub const LOCAL_PLAYLIST_PREFIX: &str = "local_";

/// Generate an id for a playlist created offline.
///
/// Format: `local_{first 8 uuid chars}_{unix seconds}`. The prefix is
/// what marks the playlist as needing remote creation; the uuid slice
/// and timestamp only keep ids from colliding.
pub fn generate_local_playlist_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", LOCAL_PLAYLIST_PREFIX, &uuid[..8], Utc::now().timestamp())
}

/// True when the id denotes a playlist not yet created remotely.
pub fn is_local_playlist_id(playlist_id: &str) -> bool {
    playlist_id.starts_with(LOCAL_PLAYLIST_PREFIX)
}

/// A mirrored user profile.
///
/// Token columns on the same row are owned by the credential store and
/// deliberately absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
    /// Subscription tier as reported by the remote profile.
    pub product: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A mirrored track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub track_id: String,
    pub name: String,
    pub album_name: Option<String>,
    pub album_image_url: Option<String>,
    pub duration_ms: i64,
    pub popularity: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Track {
    pub fn validate(&self) -> Result<(), String> {
        if self.track_id.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Track name cannot be empty".to_string());
        }
        if self.duration_ms < 0 {
            return Err("Track duration cannot be negative".to_string());
        }
        Ok(())
    }
}

/// A mirrored artist. Genres live in `artist_genres`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A track joined with its artists and derived genres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWithArtists {
    pub track: Track,
    /// Artists in credited order.
    pub artists: Vec<Artist>,
    /// Union of the artists' genres, sorted and deduplicated.
    pub genres: Vec<String>,
}

/// A mirrored playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    pub playlist_id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Set for playlists created offline that have no remote
    /// counterpart yet.
    pub is_local_only: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }
        if self.user_id.trim().is_empty() {
            return Err("Playlist owner cannot be empty".to_string());
        }
        Ok(())
    }
}

/// The kind of offline edit recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    RemoveTrack,
    CreatePlaylist,
    DeletePlaylist,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::RemoveTrack => "REMOVE_TRACK",
            ChangeType::CreatePlaylist => "CREATE_PLAYLIST",
            ChangeType::DeletePlaylist => "DELETE_PLAYLIST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REMOVE_TRACK" => Some(ChangeType::RemoveTrack),
            "CREATE_PLAYLIST" => Some(ChangeType::CreatePlaylist),
            "DELETE_PLAYLIST" => Some(ChangeType::DeletePlaylist),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An offline edit waiting to be replayed against the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PendingChange {
    pub change_id: i64,
    pub user_id: String,
    pub change_type: ChangeType,
    pub playlist_id: String,
    /// Set for `RemoveTrack` entries.
    pub track_id: Option<String>,
    /// Track name snapshotted at record time so the entry renders
    /// even if the track row is later pruned.
    pub track_name: Option<String>,
    /// Playlist name snapshotted at record time, so `DeletePlaylist`
    /// entries stay readable after the playlist row is gone.
    pub playlist_name: Option<String>,
    pub created_at: i64,
}
