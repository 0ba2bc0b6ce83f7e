//! # Application Configuration
//!
//! Configuration for the Spotify library core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! [`AppConfig`] holding the database location, Spotify API credentials,
//! and sync tuning knobs. The builder enforces fail-fast validation so a
//! misconfigured deployment errors at startup with an actionable message
//! instead of failing mid-sync.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .client_id("spotify-client-id")
//!     .client_secret("spotify-client-secret")
//!     .build()
//!     .expect("Failed to build config");
//! assert_eq!(config.client_id, "spotify-client-id");
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Token endpoint used for refresh grants.
pub const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Web API base URL.
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Tuning knobs for remote synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTuning {
    /// Page size requested from paginated endpoints.
    pub page_size: u32,
    /// Maximum retry attempts for retryable API failures (429/5xx).
    pub max_retries: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Application configuration.
///
/// Use [`AppConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct AppConfig {
    /// Path to the SQLite mirror database.
    pub database_path: PathBuf,
    /// Spotify application client id.
    pub client_id: String,
    /// Spotify application client secret.
    pub client_secret: String,
    /// OAuth redirect URI registered with the application.
    pub redirect_uri: Option<String>,
    /// Sync tuning knobs.
    pub sync: SyncTuning,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_path", &self.database_path)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("sync", &self.sync)
            .finish()
    }
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Client credentials are not empty
    /// - Sync tuning values are usable
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.client_id.is_empty() {
            return Err(Error::Config(
                "Spotify client id cannot be empty".to_string(),
            ));
        }

        if self.client_secret.is_empty() {
            return Err(Error::Config(
                "Spotify client secret cannot be empty".to_string(),
            ));
        }

        if self.sync.page_size == 0 || self.sync.page_size > 50 {
            return Err(Error::Config(
                "Page size must be between 1 and 50 (Spotify API limit)".to_string(),
            ));
        }

        if self.sync.max_retries == 0 {
            return Err(Error::Config(
                "Max retries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`AppConfig`] instances.
#[derive(Default)]
pub struct AppConfigBuilder {
    database_path: Option<PathBuf>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    sync: SyncTuning,
}

impl AppConfigBuilder {
    /// Sets the mirror database path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the Spotify application client id.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the Spotify application client secret.
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the OAuth redirect URI.
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Sets the page size requested from paginated endpoints.
    ///
    /// Default: 50 (the API maximum).
    pub fn page_size(mut self, size: u32) -> Self {
        self.sync.page_size = size;
        self
    }

    /// Sets the maximum retry attempts for retryable failures.
    ///
    /// Default: 3
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.sync.max_retries = retries;
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.sync.request_timeout = timeout;
        self
    }

    /// Builds the final `AppConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or validation
    /// fails.
    pub fn build(self) -> Result<AppConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let client_id = self.client_id.ok_or_else(|| {
            Error::Config("Spotify client id is required. Use .client_id() to set it.".to_string())
        })?;

        let client_secret = self.client_secret.ok_or_else(|| {
            Error::Config(
                "Spotify client secret is required. Use .client_secret() to set it.".to_string(),
            )
        })?;

        let config = AppConfig {
            database_path,
            client_id,
            client_secret,
            redirect_uri: self.redirect_uri,
            sync: self.sync,
        };

        config.validate()?;

        Ok(config)
    }
}
