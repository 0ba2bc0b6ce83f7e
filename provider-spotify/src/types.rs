//! Wire types and domain views for the Spotify Web API.
//!
//! The `*Object`/`*Response` structs mirror the JSON the API returns;
//! the `Remote*` structs are the flattened views the rest of the
//! workspace consumes. Conversion drops everything the mirror does not
//! store.

use serde::{Deserialize, Serialize};

/// Generic paging envelope. `next` is a full URL or null; its absence
/// is the only non-error termination of a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PagingObject<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// A full track object. `id` is null for local files, which the mirror
/// skips entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: i64,
    pub popularity: Option<i64>,
    pub album: Option<AlbumObject>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

/// One entry of a playlist's track listing. `track` is null when the
/// item is unavailable in the requesting market.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrackItem {
    pub track: Option<TrackObject>,
}

/// One entry of the user's saved-tracks listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrackItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub owner: OwnerRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Envelope of `GET /artists?ids=...`. Unknown ids come back as nulls.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<ArtistObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub product: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
}

/// Error envelope the API wraps non-success responses in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

/// Flattened user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
    pub product: Option<String>,
}

impl From<CurrentUser> for RemoteUser {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            image_url: user.images.into_iter().next().map(|image| image.url),
            product: user.product,
        }
    }
}

/// Flattened playlist header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub owner_id: String,
}

impl From<PlaylistResponse> for RemotePlaylist {
    fn from(playlist: PlaylistResponse) -> Self {
        Self {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description.filter(|d| !d.is_empty()),
            image_url: playlist.images.into_iter().next().map(|image| image.url),
            owner_id: playlist.owner.id,
        }
    }
}

/// A credited artist on a track; genres arrive separately via the
/// artist endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtistRef {
    pub id: String,
    pub name: String,
}

/// Flattened track with artist credits in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub id: String,
    pub name: String,
    pub album_name: Option<String>,
    pub album_image_url: Option<String>,
    pub duration_ms: i64,
    pub popularity: Option<i64>,
    pub artists: Vec<RemoteArtistRef>,
}

impl RemoteTrack {
    /// Convert a wire track, skipping local files and null-id entries.
    pub fn from_object(track: TrackObject) -> Option<Self> {
        let id = track.id?;
        let (album_name, album_image_url) = match track.album {
            Some(album) => (
                Some(album.name),
                album.images.into_iter().next().map(|image| image.url),
            ),
            None => (None, None),
        };
        Some(Self {
            id,
            name: track.name,
            album_name,
            album_image_url,
            duration_ms: track.duration_ms,
            popularity: track.popularity,
            artists: track
                .artists
                .into_iter()
                .filter_map(|artist| {
                    artist.id.map(|id| RemoteArtistRef {
                        id,
                        name: artist.name,
                    })
                })
                .collect(),
        })
    }
}

/// Flattened artist with genre labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
}

impl From<ArtistObject> for RemoteArtist {
    fn from(artist: ArtistObject) -> Self {
        Self {
            id: artist.id,
            name: artist.name,
            genres: artist.genres,
        }
    }
}
