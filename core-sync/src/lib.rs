//! # Sync Module
//!
//! Keeps the local mirror and the remote catalog consistent.
//!
//! ## Overview
//!
//! Three collaborators, all built on the mirror's repositories and the
//! [`RemoteCatalog`] seam:
//!
//! - [`ChangeLog`] lists the queue of offline edits and cancels
//!   entries, undoing their local effect
//! - [`ReconciliationEngine`] replays queued edits against the remote
//!   catalog; replay is idempotent and survives partial failure
//! - [`CatalogMirror`] pulls remote state (profile, playlists, saved
//!   tracks, artist genres) into the mirror

pub mod changelog;
pub mod error;
pub mod mirror;
pub mod reconciler;
pub mod remote;

pub use changelog::ChangeLog;
pub use error::{Result, SyncError};
pub use mirror::{liked_songs_playlist_id, CatalogMirror};
pub use reconciler::{ReconcileOutcome, ReconciliationEngine};
pub use remote::RemoteCatalog;
