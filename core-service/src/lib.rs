//! # Service Module
//!
//! The facade host applications talk to.
//!
//! ## Overview
//!
//! [`LibraryService`] wires the whole stack together: configuration,
//! the SQLite mirror, credential storage and refresh, the remote
//! catalog connector, and the reconciliation engine. Every operation
//! reads from the mirror; operations that touch the remote catalog
//! obtain a fresh access token first and reconcile queued edits before
//! pulling new state.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::AppConfig;
//! use core_service::LibraryService;
//!
//! let config = AppConfig::builder()
//!     .database_path("library.db")
//!     .client_id(client_id)
//!     .client_secret(client_secret)
//!     .build()?;
//! let service = LibraryService::connect(config).await?;
//!
//! let view = service.open_playlist("user-1", "37i9abc").await?;
//! ```

pub mod error;

pub use error::{Result, ServiceError};

use std::sync::Arc;

use core_auth::{SqliteCredentialStore, TokenGuardian, TokenRefresher};
use core_mirror::{
    create_pool, is_local_playlist_id, DatabaseConfig, LibraryQuery, LibraryStats, Page,
    PageRequest, PendingChange, Playlist, PlaylistRepository, PlaylistStats,
    SqliteArtistRepository, SqlitePendingChangeRepository, SqlitePlaylistRepository,
    SqliteTrackRepository, SqliteUserRepository, Track, TrackFilter, TrackRepository, User,
    UserRepository,
};
use core_runtime::{AppConfig, HttpClient, ReqwestHttpClient};
use core_sync::{
    CatalogMirror, ChangeLog, ReconcileOutcome, ReconciliationEngine, RemoteCatalog, SyncError,
};
use provider_spotify::{SpotifyConnector, SpotifyError};
use sqlx::SqlitePool;
use tracing::{info, instrument};

/// A playlist and its tracks in playlist order.
#[derive(Debug, Clone)]
pub struct PlaylistView {
    pub playlist: Playlist,
    pub tracks: Vec<Track>,
}

/// A user's profile and their playlists.
#[derive(Debug, Clone)]
pub struct UserView {
    pub user: User,
    pub playlists: Vec<Playlist>,
}

/// The library service facade.
pub struct LibraryService {
    config: AppConfig,
    pool: SqlitePool,
    http_client: Arc<dyn HttpClient>,
    guardian: TokenGuardian,
    playlists: Arc<SqlitePlaylistRepository>,
    tracks: Arc<SqliteTrackRepository>,
    users: Arc<SqliteUserRepository>,
    changelog: ChangeLog,
    query: LibraryQuery,
    stats: LibraryStats,
}

impl LibraryService {
    /// Open (or create) the mirror database at the configured path and
    /// assemble the service.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        let http_client: Arc<dyn HttpClient> =
            Arc::new(ReqwestHttpClient::with_timeout(config.sync.request_timeout));
        Ok(Self::assemble(config, pool, http_client))
    }

    /// Assemble the service over an existing pool and HTTP client.
    /// Tests use this with an in-memory pool and a mock client.
    pub fn with_pool(
        config: AppConfig,
        pool: SqlitePool,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self::assemble(config, pool, http_client)
    }

    fn assemble(config: AppConfig, pool: SqlitePool, http_client: Arc<dyn HttpClient>) -> Self {
        let store = Arc::new(SqliteCredentialStore::new(pool.clone()));
        let refresher = TokenRefresher::new(
            http_client.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );
        let guardian = TokenGuardian::new(store, refresher);

        let playlists = Arc::new(SqlitePlaylistRepository::new(pool.clone()));
        let pending = Arc::new(SqlitePendingChangeRepository::new(pool.clone()));
        let changelog = ChangeLog::new(pending, playlists.clone());

        Self {
            guardian,
            playlists,
            tracks: Arc::new(SqliteTrackRepository::new(pool.clone())),
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            changelog,
            query: LibraryQuery::new(pool.clone()),
            stats: LibraryStats::new(pool.clone()),
            http_client,
            config,
            pool,
        }
    }

    /// The underlying mirror pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The configuration the service was assembled with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build a connector carrying a fresh access token for the user.
    async fn authorized(&self, user_id: &str) -> Result<Arc<dyn RemoteCatalog>> {
        let token = self
            .guardian
            .ensure_valid_token(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotAuthenticated {
                user_id: user_id.to_string(),
            })?;
        Ok(Arc::new(
            SpotifyConnector::new(self.http_client.clone(), token)
                .with_max_retries(self.config.sync.max_retries)
                .with_page_size(self.config.sync.page_size),
        ))
    }

    fn engine(&self, remote: Arc<dyn RemoteCatalog>) -> ReconciliationEngine {
        ReconciliationEngine::new(
            remote,
            self.playlists.clone(),
            Arc::new(SqlitePendingChangeRepository::new(self.pool.clone())),
        )
    }

    fn mirror(&self, remote: Arc<dyn RemoteCatalog>) -> CatalogMirror {
        CatalogMirror::new(
            remote,
            self.users.clone(),
            self.playlists.clone(),
            self.tracks.clone(),
            Arc::new(SqliteArtistRepository::new(self.pool.clone())),
        )
    }

    /// Map a scope failure to revocation; everything else passes
    /// through.
    async fn check_scope<T>(
        &self,
        user_id: &str,
        result: core_sync::Result<T>,
    ) -> Result<T> {
        match result {
            Err(SyncError::Provider(SpotifyError::InsufficientScope)) => {
                self.guardian.revoke(user_id).await?;
                Err(ServiceError::ScopeRevoked {
                    user_id: user_id.to_string(),
                })
            }
            other => Ok(other?),
        }
    }

    /// Refresh a user's profile and playlist headers from the remote
    /// catalog. Queued playlist deletions are drained first so a
    /// deleted playlist does not reappear in the refreshed listing.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn refresh_user(&self, user_id: &str) -> Result<UserView> {
        let remote = self.authorized(user_id).await?;

        let drained = self
            .check_scope(user_id, self.engine(remote.clone()).drain_playlist_deletes(user_id).await)
            .await?;
        if drained > 0 {
            info!(drained, "Drained queued playlist deletions");
        }

        let mirror = self.mirror(remote);
        let profile = self.check_scope(user_id, mirror.mirror_user().await).await?;
        self.check_scope(user_id, mirror.mirror_playlist_headers(&profile.id).await)
            .await?;

        let user = self.users.find_by_id(&profile.id).await?.ok_or_else(|| {
            core_mirror::MirrorError::NotFound {
                entity_type: "User".to_string(),
                id: profile.id.clone(),
            }
        })?;
        let playlists = self.playlists.list_by_user(&user.user_id).await?;
        Ok(UserView { user, playlists })
    }

    /// Open a playlist: reconcile its queued edits, pull fresh remote
    /// state, and return the mirrored view.
    ///
    /// Opening a local-only playlist serves the mirror directly. When
    /// reconciliation pushed a local playlist to the remote catalog,
    /// the view returned is the playlist under its new remote id; the
    /// id the caller passed no longer exists.
    #[instrument(skip(self), fields(user_id = %user_id, playlist_id = %playlist_id))]
    pub async fn open_playlist(&self, user_id: &str, playlist_id: &str) -> Result<PlaylistView> {
        let remote = self.authorized(user_id).await?;

        let outcome = self
            .check_scope(
                user_id,
                self.engine(remote.clone())
                    .reconcile_playlist(user_id, playlist_id)
                    .await,
            )
            .await?;

        let resolved_id = match &outcome {
            ReconcileOutcome::Recreated { remote_id } => {
                let mirror = self.mirror(remote);
                self.check_scope(user_id, mirror.mirror_playlist(remote_id).await)
                    .await?;
                remote_id.clone()
            }
            _ if is_local_playlist_id(playlist_id) => playlist_id.to_string(),
            _ => {
                let mirror = self.mirror(remote);
                self.check_scope(user_id, mirror.mirror_playlist(playlist_id).await)
                    .await?;
                playlist_id.to_string()
            }
        };

        self.playlist_view(&resolved_id).await
    }

    /// Mirror the user's saved tracks into the synthetic liked-songs
    /// playlist and return its view.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn sync_liked_songs(&self, user_id: &str) -> Result<PlaylistView> {
        let remote = self.authorized(user_id).await?;
        let playlist = self
            .check_scope(user_id, self.mirror(remote).mirror_liked_songs(user_id).await)
            .await?;
        self.playlist_view(&playlist.playlist_id).await
    }

    /// Create a local-only playlist; its remote creation is queued.
    pub async fn create_local_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        track_ids: &[String],
    ) -> Result<Playlist> {
        Ok(self
            .playlists
            .create_local(user_id, name, description, track_ids)
            .await?)
    }

    /// Delete a playlist from the mirror, queueing the remote deletion
    /// for synced playlists.
    pub async fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> Result<()> {
        self.owned_playlist(user_id, playlist_id).await?;
        Ok(self.playlists.delete_recording_change(playlist_id).await?)
    }

    /// Remove a track from a playlist, queueing the remote removal for
    /// synced playlists. Returns `false` when the track was not a
    /// member.
    pub async fn remove_track(
        &self,
        user_id: &str,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<bool> {
        self.owned_playlist(user_id, playlist_id).await?;
        Ok(self
            .playlists
            .remove_track_recording_change(playlist_id, track_id)
            .await?)
    }

    /// The user's queued offline edits, newest first.
    pub async fn pending_changes(&self, user_id: &str) -> Result<Vec<PendingChange>> {
        Ok(self.changelog.list_pending(user_id).await?)
    }

    /// Cancel a queued edit, undoing its local effect.
    pub async fn cancel_change(&self, user_id: &str, change_id: i64) -> Result<()> {
        Ok(self.changelog.cancel(user_id, change_id).await?)
    }

    /// Search mirrored tracks, optionally scoped to one playlist.
    pub async fn search_tracks(
        &self,
        playlist_id: Option<&str>,
        input: &str,
        page: PageRequest,
    ) -> Result<Page<Track>> {
        let filter = TrackFilter::parse(input);
        Ok(self.query.search_tracks(playlist_id, &filter, page).await?)
    }

    /// Aggregate statistics for one playlist.
    pub async fn playlist_stats(&self, playlist_id: &str) -> Result<PlaylistStats> {
        if self.playlists.find_by_id(playlist_id).await?.is_none() {
            return Err(core_mirror::MirrorError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist_id.to_string(),
            }
            .into());
        }
        Ok(self.stats.playlist_stats(playlist_id).await?)
    }

    async fn owned_playlist(&self, user_id: &str, playlist_id: &str) -> Result<Playlist> {
        self.playlists
            .find_by_id(playlist_id)
            .await?
            .filter(|playlist| playlist.user_id == user_id)
            .ok_or_else(|| {
                // A foreign playlist reads the same as a missing one.
                core_mirror::MirrorError::NotFound {
                    entity_type: "Playlist".to_string(),
                    id: playlist_id.to_string(),
                }
                .into()
            })
    }

    async fn playlist_view(&self, playlist_id: &str) -> Result<PlaylistView> {
        let playlist = self.playlists.find_by_id(playlist_id).await?.ok_or_else(|| {
            core_mirror::MirrorError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist_id.to_string(),
            }
        })?;

        let mut tracks = Vec::new();
        for track_id in self.playlists.track_ids(playlist_id).await? {
            if let Some(track) = self.tracks.find_by_id(&track_id).await? {
                tracks.push(track);
            }
        }
        Ok(PlaylistView { playlist, tracks })
    }
}
