//! Repository traits and SQLite implementations
//!
//! Each repository pairs a trait (the seam the sync layer mocks) with a
//! `Sqlite*Repository` over the shared pool. Multi-table commands that
//! must stay atomic (recording a pending change alongside the mirror
//! edit it describes) run inside a single transaction in the repository
//! that owns the primary table.

pub mod artist;
pub mod pagination;
pub mod pending_change;
pub mod playlist;
pub mod track;
pub mod user;

pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use pagination::{Page, PageRequest};
pub use pending_change::{NewPendingChange, PendingChangeRepository, SqlitePendingChangeRepository};
pub use playlist::{PlaylistRepository, SqlitePlaylistRepository};
pub use track::{SqliteTrackRepository, TrackRepository};
pub use user::{SqliteUserRepository, UserRepository};
