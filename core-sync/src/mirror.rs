//! Mirror sweep.
//!
//! Pulls remote state into the local mirror. Track rows are upserted
//! with their artist credits, then the artists the mirror has never
//! seen are fetched in bulk and their genre sets written back, which
//! refreshes the derived per-track genres.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use core_mirror::{
    ArtistRepository, Playlist, PlaylistRepository, Track, TrackRepository, UserRepository,
};
use provider_spotify::{RemotePlaylist, RemoteTrack, RemoteUser};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::remote::RemoteCatalog;

/// Synthetic playlist id suffix for the user's saved tracks.
const LIKED_SUFFIX: &str = "_liked";
const LIKED_NAME: &str = "Liked Songs";
const LIKED_DESCRIPTION: &str = "Your favorite tracks";

/// The synthetic playlist id mirroring a user's saved tracks.
pub fn liked_songs_playlist_id(user_id: &str) -> String {
    format!("{}{}", user_id, LIKED_SUFFIX)
}

/// Writes remote catalog state into the mirror.
pub struct CatalogMirror {
    remote: Arc<dyn RemoteCatalog>,
    users: Arc<dyn UserRepository>,
    playlists: Arc<dyn PlaylistRepository>,
    tracks: Arc<dyn TrackRepository>,
    artists: Arc<dyn ArtistRepository>,
}

impl CatalogMirror {
    pub fn new(
        remote: Arc<dyn RemoteCatalog>,
        users: Arc<dyn UserRepository>,
        playlists: Arc<dyn PlaylistRepository>,
        tracks: Arc<dyn TrackRepository>,
        artists: Arc<dyn ArtistRepository>,
    ) -> Self {
        Self {
            remote,
            users,
            playlists,
            tracks,
            artists,
        }
    }

    /// Mirror the authenticated user's profile.
    #[instrument(skip(self))]
    pub async fn mirror_user(&self) -> Result<RemoteUser> {
        let user = self.remote.current_user().await?;
        self.users
            .upsert(
                &user.id,
                user.display_name.as_deref(),
                user.image_url.as_deref(),
                user.product.as_deref(),
            )
            .await?;
        Ok(user)
    }

    /// Mirror the headers of every playlist the user owns.
    ///
    /// Membership is not fetched here; [`mirror_playlist`] fills it in
    /// when a playlist is opened.
    ///
    /// [`mirror_playlist`]: CatalogMirror::mirror_playlist
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn mirror_playlist_headers(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let remote_playlists = self.remote.user_playlists(user_id).await?;
        let mut mirrored = Vec::with_capacity(remote_playlists.len());
        for remote in remote_playlists {
            let playlist = playlist_row(remote);
            self.playlists.upsert(&playlist).await?;
            mirrored.push(playlist);
        }
        info!(count = mirrored.len(), "Mirrored playlist headers");
        Ok(mirrored)
    }

    /// Mirror one playlist's header and full membership.
    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    pub async fn mirror_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let playlist = playlist_row(self.remote.playlist(playlist_id).await?);
        self.playlists.upsert(&playlist).await?;

        let remote_tracks = self.remote.playlist_tracks(playlist_id).await?;
        self.mirror_tracks(&remote_tracks).await?;

        let track_ids: Vec<String> = remote_tracks.iter().map(|t| t.id.clone()).collect();
        self.playlists.replace_tracks(playlist_id, &track_ids).await?;

        info!(tracks = track_ids.len(), "Mirrored playlist");
        Ok(playlist)
    }

    /// Mirror the user's saved tracks as a synthetic playlist.
    ///
    /// The playlist id is derived from the user id, so repeated sweeps
    /// update the same row.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn mirror_liked_songs(&self, user_id: &str) -> Result<Playlist> {
        let remote_tracks = self.remote.saved_tracks().await?;
        self.mirror_tracks(&remote_tracks).await?;

        let now = Utc::now().timestamp();
        let playlist = Playlist {
            playlist_id: liked_songs_playlist_id(user_id),
            user_id: user_id.to_string(),
            name: LIKED_NAME.to_string(),
            description: Some(LIKED_DESCRIPTION.to_string()),
            image_url: None,
            is_local_only: false,
            created_at: now,
            updated_at: now,
        };
        self.playlists.upsert(&playlist).await?;

        let track_ids: Vec<String> = remote_tracks.iter().map(|t| t.id.clone()).collect();
        self.playlists
            .replace_tracks(&playlist.playlist_id, &track_ids)
            .await?;

        info!(tracks = track_ids.len(), "Mirrored liked songs");
        Ok(playlist)
    }

    /// Upsert tracks with their credits, then backfill genre data for
    /// any artist the mirror has not seen before.
    async fn mirror_tracks(&self, remote_tracks: &[RemoteTrack]) -> Result<()> {
        let now = Utc::now().timestamp();
        let mut credited: HashSet<String> = HashSet::new();

        for remote in remote_tracks {
            let artist_ids: Vec<String> =
                remote.artists.iter().map(|a| a.id.clone()).collect();
            credited.extend(artist_ids.iter().cloned());

            let track = Track {
                track_id: remote.id.clone(),
                name: remote.name.clone(),
                album_name: remote.album_name.clone(),
                album_image_url: remote.album_image_url.clone(),
                duration_ms: remote.duration_ms,
                popularity: remote.popularity,
                created_at: now,
                updated_at: now,
            };
            self.tracks.upsert_with_artists(&track, &artist_ids).await?;
        }

        let all_ids: Vec<String> = credited.into_iter().collect();
        let missing = self.artists.find_missing(&all_ids).await?;
        if missing.is_empty() {
            return Ok(());
        }

        let fetched = self.remote.artists(&missing).await?;
        if fetched.len() < missing.len() {
            warn!(
                requested = missing.len(),
                received = fetched.len(),
                "Some artist lookups failed; their genres stay empty"
            );
        }
        for artist in fetched {
            self.artists
                .upsert_with_genres(&artist.id, &artist.name, &artist.genres)
                .await?;
            self.tracks.refresh_genres_for_artist(&artist.id).await?;
        }

        Ok(())
    }
}

fn playlist_row(remote: RemotePlaylist) -> Playlist {
    let now = Utc::now().timestamp();
    Playlist {
        playlist_id: remote.id,
        user_id: remote.owner_id,
        name: remote.name,
        description: remote.description,
        image_url: remote.image_url,
        is_local_only: false,
        created_at: now,
        updated_at: now,
    }
}
