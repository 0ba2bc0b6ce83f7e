//! Spotify Web API connector.
//!
//! One connector instance wraps one access token. Listings follow the
//! paging envelope's `next` URL until it is absent; transient failures
//! (429 and 5xx) are retried with exponential backoff, everything else
//! surfaces immediately.

use std::sync::Arc;
use std::time::Duration;

use core_runtime::config::API_BASE_URL;
use core_runtime::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SpotifyError};
use crate::types::{
    ArtistsResponse, CreatedPlaylist, CurrentUser, PagingObject, PlaylistResponse,
    PlaylistTrackItem, RemoteArtist, RemotePlaylist, RemoteTrack, RemoteUser, SavedTrackItem,
};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_PAGE_SIZE: u32 = 50;
/// The API rejects artist batches above this size.
const ARTIST_BATCH_SIZE: usize = 50;
/// The API rejects add-tracks batches above this size.
const TRACK_BATCH_SIZE: usize = 100;
/// Marker string the API puts in the body when the token's scopes do
/// not cover the endpoint.
const SCOPE_ERROR_MARKER: &str = "Insufficient client scope";

/// Client for the remote catalog, bound to one bearer token.
pub struct SpotifyConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    api_base: String,
    max_retries: u32,
    page_size: u32,
}

impl SpotifyConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            api_base: API_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the API base URL. Used by tests.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the attempt limit for retryable failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the page size requested from listing endpoints.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn get(&self, url: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, url).bearer_token(&self.access_token)
    }

    /// Execute a request, retrying rate limits and server errors.
    ///
    /// Returns the final response whatever its status; callers decide
    /// what a non-2xx means for their endpoint.
    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0u32;
        loop {
            let response = self
                .http_client
                .execute(request.clone())
                .await
                .map_err(|e| SpotifyError::Network(e.to_string()))?;

            let retryable = response.status == 429 || response.is_server_error();
            if !retryable || attempt + 1 >= self.max_retries {
                return Ok(response);
            }

            let delay = Duration::from_millis(100u64 * 2u64.pow(attempt));
            debug!(
                status = response.status,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying transient API failure"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Map a non-success response to the right error.
    fn classify_failure(response: &HttpResponse) -> SpotifyError {
        let body = String::from_utf8_lossy(&response.body);
        if body.contains(SCOPE_ERROR_MARKER) {
            return SpotifyError::InsufficientScope;
        }
        if response.status == 401 || response.status == 403 {
            return SpotifyError::Auth {
                status: response.status,
            };
        }
        let message = serde_json::from_slice::<crate::types::ApiErrorBody>(&response.body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.into_owned());
        SpotifyError::Api {
            status_code: response.status,
            message,
        }
    }

    /// Execute and require a 2xx.
    async fn execute_checked(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.execute_with_retry(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(Self::classify_failure(&response))
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| SpotifyError::Parse(e.to_string()))
    }

    /// Collect every item of a paged listing, following `next` URLs
    /// until the API stops providing one.
    async fn collect_pages<T: serde::de::DeserializeOwned>(
        &self,
        first_url: String,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next_url = Some(first_url);
        while let Some(url) = next_url {
            let response = self.execute_checked(self.get(&url)).await?;
            let page: PagingObject<T> = Self::parse(&response)?;
            items.extend(page.items);
            next_url = page.next;
        }
        Ok(items)
    }

    /// Fetch the profile of the token's user.
    #[instrument(skip(self))]
    pub async fn get_current_user(&self) -> Result<RemoteUser> {
        let response = self.execute_checked(self.get(&self.url("/me"))).await?;
        let user: CurrentUser = Self::parse(&response)?;
        Ok(user.into())
    }

    /// Fetch one playlist's header.
    #[instrument(skip(self))]
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<RemotePlaylist> {
        let url = self.url(&format!("/playlists/{}", playlist_id));
        let response = self.execute_checked(self.get(&url)).await?;
        let playlist: PlaylistResponse = Self::parse(&response)?;
        Ok(playlist.into())
    }

    /// Fetch the playlists owned by `owner_id`.
    ///
    /// The listing endpoint also returns followed playlists; those are
    /// filtered out here.
    #[instrument(skip(self))]
    pub async fn get_user_playlists(&self, owner_id: &str) -> Result<Vec<RemotePlaylist>> {
        let first = self.url(&format!("/me/playlists?limit={}", self.page_size));
        let playlists: Vec<PlaylistResponse> = self.collect_pages(first).await?;
        Ok(playlists
            .into_iter()
            .filter(|playlist| playlist.owner.id == owner_id)
            .map(RemotePlaylist::from)
            .collect())
    }

    /// Fetch a playlist's tracks in listing order. Unavailable and
    /// local-file entries are skipped.
    #[instrument(skip(self))]
    pub async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<RemoteTrack>> {
        let first = self.url(&format!(
            "/playlists/{}/tracks?limit={}",
            playlist_id, self.page_size
        ));
        let items: Vec<PlaylistTrackItem> = self.collect_pages(first).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(RemoteTrack::from_object)
            .collect())
    }

    /// Fetch the user's saved ("liked") tracks.
    #[instrument(skip(self))]
    pub async fn get_saved_tracks(&self) -> Result<Vec<RemoteTrack>> {
        let first = self.url(&format!("/me/tracks?limit={}", self.page_size));
        let items: Vec<SavedTrackItem> = self.collect_pages(first).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(RemoteTrack::from_object)
            .collect())
    }

    /// Fetch artist details in batches of up to fifty ids.
    ///
    /// A failing batch is logged and skipped; the rest of the library
    /// sync should not stall on one bad artist lookup.
    #[instrument(skip(self, artist_ids), fields(count = artist_ids.len()))]
    pub async fn get_artists(&self, artist_ids: &[String]) -> Result<Vec<RemoteArtist>> {
        let mut artists = Vec::with_capacity(artist_ids.len());
        for batch in artist_ids.chunks(ARTIST_BATCH_SIZE) {
            let url = self.url(&format!("/artists?ids={}", batch.join(",")));
            match self.execute_checked(self.get(&url)).await {
                Ok(response) => {
                    let envelope: ArtistsResponse = Self::parse(&response)?;
                    artists.extend(envelope.artists.into_iter().flatten().map(RemoteArtist::from));
                }
                // Credential problems affect every batch; stop instead
                // of logging fifty identical failures.
                Err(error @ (SpotifyError::Auth { .. } | SpotifyError::InsufficientScope)) => {
                    return Err(error);
                }
                Err(error) => {
                    warn!(batch_size = batch.len(), %error, "Skipping failed artist batch");
                }
            }
        }
        Ok(artists)
    }

    /// Create a private playlist under `owner_id` and return its id.
    #[instrument(skip(self, description))]
    pub async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let url = self.url(&format!("/users/{}/playlists", owner_id));
        let body = json!({
            "name": name,
            "description": description.unwrap_or(""),
            "public": false,
        });
        let request = HttpRequest::new(HttpMethod::Post, &url)
            .bearer_token(&self.access_token)
            .json(&body)
            .map_err(|e| SpotifyError::Parse(e.to_string()))?;
        let response = self.execute_checked(request).await?;
        let created: CreatedPlaylist = Self::parse(&response)?;
        Ok(created.id)
    }

    /// Append tracks to a playlist in batches of up to one hundred.
    ///
    /// A failed batch is logged and the rest still go out; the playlist
    /// arrives incomplete rather than not at all.
    #[instrument(skip(self, track_ids), fields(count = track_ids.len()))]
    pub async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let url = self.url(&format!("/playlists/{}/tracks", playlist_id));
        for batch in track_ids.chunks(TRACK_BATCH_SIZE) {
            let uris: Vec<String> = batch
                .iter()
                .map(|id| format!("spotify:track:{}", id))
                .collect();
            let request = HttpRequest::new(HttpMethod::Post, &url)
                .bearer_token(&self.access_token)
                .json(&json!({ "uris": uris }))
                .map_err(|e| SpotifyError::Parse(e.to_string()))?;
            if let Err(error) = self.execute_checked(request).await {
                warn!(batch_size = batch.len(), %error, "Failed to add track batch");
            }
        }
        Ok(())
    }

    /// Remove every occurrence of a track from a playlist.
    ///
    /// A 404 means the playlist is already gone remotely, which is the
    /// state the removal was after; it counts as success.
    #[instrument(skip(self))]
    pub async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let url = self.url(&format!("/playlists/{}/tracks", playlist_id));
        let body = json!({
            "tracks": [{ "uri": format!("spotify:track:{}", track_id) }],
        });
        let request = HttpRequest::new(HttpMethod::Delete, &url)
            .bearer_token(&self.access_token)
            .json(&body)
            .map_err(|e| SpotifyError::Parse(e.to_string()))?;
        let response = self.execute_with_retry(request).await?;
        if response.is_success() || response.status == 404 {
            Ok(())
        } else {
            Err(Self::classify_failure(&response))
        }
    }

    /// Remove the user from a playlist's followers, which deletes it
    /// from their library. 404 counts as success.
    #[instrument(skip(self))]
    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        let url = self.url(&format!("/playlists/{}/followers", playlist_id));
        let request =
            HttpRequest::new(HttpMethod::Delete, &url).bearer_token(&self.access_token);
        let response = self.execute_with_retry(request).await?;
        if response.is_success() || response.status == 404 {
            Ok(())
        } else {
            Err(Self::classify_failure(&response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use core_runtime::http::HttpResponse;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(
                &self,
                request: HttpRequest,
            ) -> core_runtime::Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn connector(mock: MockHttp) -> SpotifyConnector {
        SpotifyConnector::new(Arc::new(mock), "token").with_api_base("https://api.test")
    }

    #[tokio::test]
    async fn test_playlist_listing_follows_next_until_absent() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(3).returning(|request| {
            let body = if request.url.contains("page3") {
                serde_json::json!({
                    "items": [playlist_json_inner("p3")],
                    "next": null,
                })
            } else if request.url.contains("page2") {
                serde_json::json!({
                    "items": [playlist_json_inner("p2")],
                    "next": "https://api.test/me/playlists?page3",
                })
            } else {
                serde_json::json!({
                    "items": [playlist_json_inner("p1")],
                    "next": "https://api.test/me/playlists?page2",
                })
            };
            Ok(response(200, &body.to_string()))
        });

        fn playlist_json_inner(id: &str) -> serde_json::Value {
            serde_json::json!({
                "id": id,
                "name": id,
                "description": null,
                "images": [],
                "owner": { "id": "user-1" },
            })
        }

        let playlists = connector(mock).get_user_playlists("user-1").await.unwrap();
        assert_eq!(playlists.len(), 3);
        assert_eq!(playlists[0].id, "p1");
        assert_eq!(playlists[2].id, "p3");
    }

    #[tokio::test]
    async fn test_playlist_listing_filters_other_owners() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            let body = serde_json::json!({
                "items": [
                    playlist_json_static("mine", "user-1"),
                    playlist_json_static("followed", "someone-else"),
                ],
                "next": null,
            });
            Ok(response(200, &body.to_string()))
        });

        fn playlist_json_static(id: &str, owner: &str) -> serde_json::Value {
            serde_json::json!({
                "id": id,
                "name": id,
                "description": null,
                "images": [],
                "owner": { "id": owner },
            })
        }

        let playlists = connector(mock).get_user_playlists("user-1").await.unwrap();
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].id, "mine");
    }

    #[tokio::test]
    async fn test_get_artists_batches_by_fifty() {
        let ids: Vec<String> = (0..120).map(|i| format!("a{}", i)).collect();

        let mut mock = MockHttp::new();
        mock.expect_execute().times(3).returning(|request| {
            let id_list = request
                .url
                .split("ids=")
                .nth(1)
                .unwrap_or_default()
                .to_string();
            let artists: Vec<serde_json::Value> = id_list
                .split(',')
                .map(|id| {
                    serde_json::json!({ "id": id, "name": id.to_uppercase(), "genres": [] })
                })
                .collect();
            assert!(artists.len() <= 50);
            Ok(response(
                200,
                &serde_json::json!({ "artists": artists }).to_string(),
            ))
        });

        let artists = connector(mock).get_artists(&ids).await.unwrap();
        assert_eq!(artists.len(), 120);
    }

    #[tokio::test]
    async fn test_get_artists_skips_failed_batch() {
        let ids: Vec<String> = (0..60).map(|i| format!("a{}", i)).collect();

        let mut mock = MockHttp::new();
        mock.expect_execute().returning(|request| {
            if request.url.contains("a0,") {
                // First batch fails outright
                Ok(response(400, r#"{"error":{"status":400,"message":"bad"}}"#))
            } else {
                let id_list = request
                    .url
                    .split("ids=")
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                let artists: Vec<serde_json::Value> = id_list
                    .split(',')
                    .map(|id| {
                        serde_json::json!({ "id": id, "name": id, "genres": ["rock"] })
                    })
                    .collect();
                Ok(response(
                    200,
                    &serde_json::json!({ "artists": artists }).to_string(),
                ))
            }
        });

        let artists = connector(mock).get_artists(&ids).await.unwrap();
        assert_eq!(artists.len(), 10);
        assert_eq!(artists[0].genres, vec!["rock".to_string()]);
    }

    #[tokio::test]
    async fn test_get_artists_drops_null_entries() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            let body = serde_json::json!({
                "artists": [
                    { "id": "a1", "name": "Daft Punk", "genres": ["house"] },
                    null,
                ],
            });
            Ok(response(200, &body.to_string()))
        });

        let artists = connector(mock)
            .get_artists(&["a1".to_string(), "gone".to_string()])
            .await
            .unwrap();
        assert_eq!(artists.len(), 1);
    }

    #[tokio::test]
    async fn test_add_tracks_batches_by_hundred() {
        let ids: Vec<String> = (0..250).map(|i| format!("t{}", i)).collect();

        let mut mock = MockHttp::new();
        mock.expect_execute().times(3).returning(|request| {
            let body: serde_json::Value =
                serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
            let uris = body["uris"].as_array().unwrap();
            assert!(uris.len() <= 100);
            assert!(uris[0].as_str().unwrap().starts_with("spotify:track:"));
            Ok(response(201, r#"{"snapshot_id":"s"}"#))
        });

        connector(mock).add_tracks("p1", &ids).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_tracks_failed_batch_is_not_fatal() {
        let ids: Vec<String> = (0..150).map(|i| format!("t{}", i)).collect();

        let mut mock = MockHttp::new();
        let mut first = true;
        mock.expect_execute().times(2).returning(move |_| {
            if first {
                first = false;
                Ok(response(400, r#"{"error":{"status":400,"message":"bad"}}"#))
            } else {
                Ok(response(201, r#"{"snapshot_id":"s"}"#))
            }
        });

        assert!(connector(mock).add_tracks("p1", &ids).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_playlist_is_private() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|request| {
            assert!(request.url.ends_with("/users/user-1/playlists"));
            let body: serde_json::Value =
                serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["name"], "Road Trip");
            assert_eq!(body["public"], false);
            Ok(response(201, r#"{"id":"37i9abc"}"#))
        });

        let id = connector(mock)
            .create_playlist("user-1", "Road Trip", Some("songs"))
            .await
            .unwrap();
        assert_eq!(id, "37i9abc");
    }

    #[tokio::test]
    async fn test_remove_track_treats_404_as_success() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(response(
                404,
                r#"{"error":{"status":404,"message":"Not found."}}"#,
            ))
        });

        assert!(connector(mock).remove_track("p1", "t1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_playlist_treats_404_as_success() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|request| {
            assert!(request.url.ends_with("/playlists/p1/followers"));
            assert_eq!(request.method, HttpMethod::Delete);
            Ok(response(404, ""))
        });

        assert!(connector(mock).delete_playlist("p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_scope_marker_detected_before_auth_status() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(response(
                403,
                r#"{"error":{"status":403,"message":"Insufficient client scope"}}"#,
            ))
        });

        let error = connector(mock).get_saved_tracks().await.unwrap_err();
        assert!(matches!(error, SpotifyError::InsufficientScope));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(response(
                401,
                r#"{"error":{"status":401,"message":"The access token expired"}}"#,
            ))
        });

        let error = connector(mock).get_current_user().await.unwrap_err();
        assert!(matches!(error, SpotifyError::Auth { status: 401 }));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut mock = MockHttp::new();
        let mut calls = 0;
        mock.expect_execute().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(response(429, ""))
            } else {
                Ok(response(
                    200,
                    r#"{"id":"user-1","display_name":"Alice","images":[],"product":"premium"}"#,
                ))
            }
        });

        let user = connector(mock).get_current_user().await.unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.product.as_deref(), Some("premium"));
    }

    #[tokio::test]
    async fn test_max_retries_override_limits_attempts() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, "oops")));

        let error = connector(mock)
            .with_max_retries(1)
            .get_current_user()
            .await
            .unwrap_err();
        assert!(matches!(error, SpotifyError::Api { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn test_page_size_override_reaches_listing_urls() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|request| {
            assert!(request.url.contains("limit=10"));
            Ok(response(200, r#"{"items":[],"next":null}"#))
        });

        let tracks = connector(mock)
            .with_page_size(10)
            .get_saved_tracks()
            .await
            .unwrap();
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(3)
            .returning(|_| Ok(response(500, "oops")));

        let error = connector(mock).get_current_user().await.unwrap_err();
        match error {
            SpotifyError::Api {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "oops");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_playlist_tracks_skip_unavailable_entries() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|_| {
            let body = serde_json::json!({
                "items": [
                    { "track": null },
                    { "track": { "id": null, "name": "Local", "duration_ms": 1, "artists": [] } },
                    {
                        "track": {
                            "id": "t1",
                            "name": "One More Time",
                            "duration_ms": 320000,
                            "popularity": 80,
                            "album": { "name": "Discovery", "images": [] },
                            "artists": [{ "id": "a1", "name": "Daft Punk" }],
                        }
                    },
                ],
                "next": null,
            });
            Ok(response(200, &body.to_string()))
        });

        let tracks = connector(mock).get_playlist_tracks("p1").await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "t1");
    }

    #[tokio::test]
    async fn test_get_playlist_parses_header() {
        let mut mock = MockHttp::new();
        mock.expect_execute().times(1).returning(|request| {
            assert!(request.url.ends_with("/playlists/p1"));
            assert_eq!(
                request.headers.get("Authorization"),
                Some(&"Bearer token".to_string())
            );
            let body = serde_json::json!({
                "id": "p1",
                "name": "Mix",
                "description": "desc",
                "images": [{ "url": "https://img/p1" }],
                "owner": { "id": "user-1" },
            });
            Ok(response(200, &body.to_string()))
        });

        let playlist = connector(mock).get_playlist("p1").await.unwrap();
        assert_eq!(playlist.name, "Mix");
        assert_eq!(playlist.image_url.as_deref(), Some("https://img/p1"));
        assert_eq!(playlist.owner_id, "user-1");
    }
}
