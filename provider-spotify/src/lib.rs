//! # Spotify Provider Module
//!
//! The remote catalog client. Wraps the Spotify Web API behind typed
//! operations: profile and library reads, playlist creation, track
//! removal, and playlist deletion.
//!
//! ## Overview
//!
//! A [`SpotifyConnector`] is bound to one access token; callers obtain
//! a fresh token from the token guardian and build a connector per
//! sync pass. Paged listings are drained eagerly, transient failures
//! are retried, and the connector never touches local storage.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SpotifyConnector;
pub use error::{Result, SpotifyError};
pub use types::{RemoteArtist, RemoteArtistRef, RemotePlaylist, RemoteTrack, RemoteUser};
