//! Remote catalog seam.
//!
//! The reconciliation engine and the mirror sweep talk to the remote
//! catalog through this trait so tests can substitute mocks. The one
//! production implementation delegates to [`SpotifyConnector`].

use async_trait::async_trait;
use provider_spotify::{
    RemoteArtist, RemotePlaylist, RemoteTrack, RemoteUser, Result, SpotifyConnector,
};

#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Profile of the authenticated user.
    async fn current_user(&self) -> Result<RemoteUser>;

    /// One playlist's header.
    async fn playlist(&self, playlist_id: &str) -> Result<RemotePlaylist>;

    /// Headers of every playlist owned by `owner_id`.
    async fn user_playlists(&self, owner_id: &str) -> Result<Vec<RemotePlaylist>>;

    /// A playlist's tracks, in listing order.
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<RemoteTrack>>;

    /// The user's saved ("liked") tracks.
    async fn saved_tracks(&self) -> Result<Vec<RemoteTrack>>;

    /// Artist details for the given ids.
    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<RemoteArtist>>;

    /// Create a private playlist and return its remote id.
    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<String>;

    /// Append tracks to a playlist.
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Remove a track from a playlist. Absence counts as success.
    async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<()>;

    /// Delete (unfollow) a playlist. Absence counts as success.
    async fn delete_playlist(&self, playlist_id: &str) -> Result<()>;
}

#[async_trait]
impl RemoteCatalog for SpotifyConnector {
    async fn current_user(&self) -> Result<RemoteUser> {
        self.get_current_user().await
    }

    async fn playlist(&self, playlist_id: &str) -> Result<RemotePlaylist> {
        self.get_playlist(playlist_id).await
    }

    async fn user_playlists(&self, owner_id: &str) -> Result<Vec<RemotePlaylist>> {
        self.get_user_playlists(owner_id).await
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<RemoteTrack>> {
        self.get_playlist_tracks(playlist_id).await
    }

    async fn saved_tracks(&self) -> Result<Vec<RemoteTrack>> {
        self.get_saved_tracks().await
    }

    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<RemoteArtist>> {
        self.get_artists(artist_ids).await
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<String> {
        SpotifyConnector::create_playlist(self, owner_id, name, description.as_deref()).await
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        SpotifyConnector::add_tracks(self, playlist_id, track_ids).await
    }

    async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        SpotifyConnector::remove_track(self, playlist_id, track_id).await
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        SpotifyConnector::delete_playlist(self, playlist_id).await
    }
}
