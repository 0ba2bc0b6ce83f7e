//! # Library Mirror Module
//!
//! The local SQLite mirror of a user's Spotify library.
//!
//! ## Overview
//!
//! Everything the application shows comes from this mirror; the remote
//! catalog is only consulted during sync. The mirror owns:
//!
//! - Users, tracks, artists, playlists, and playlist membership
//! - Per-artist genres and the derived per-track genre set
//! - The pending-change queue of offline edits awaiting replay
//!
//! Mirror edits that must eventually reach the remote catalog (track
//! removal, playlist creation, playlist deletion) record their pending
//! change inside the same transaction as the edit, so an edit and its
//! replay intent can never drift apart.

pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod repositories;
pub mod stats;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{MirrorError, Result};
pub use models::{
    generate_local_playlist_id, is_local_playlist_id, Artist, ChangeType, PendingChange, Playlist,
    Track, TrackWithArtists, User, LOCAL_PLAYLIST_PREFIX,
};
pub use query::{FilterTerm, LibraryQuery, TrackFilter};
pub use repositories::{
    ArtistRepository, NewPendingChange, Page, PageRequest, PendingChangeRepository,
    PlaylistRepository, SqliteArtistRepository, SqlitePendingChangeRepository,
    SqlitePlaylistRepository, SqliteTrackRepository, SqliteUserRepository, TrackRepository,
    UserRepository,
};
pub use stats::{LabelCount, LibraryStats, PlaylistStats};
