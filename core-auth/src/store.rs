//! Credential Persistence
//!
//! Tokens live on the user row in the mirror database, so a user's
//! credentials travel with the rest of their library state. The
//! [`CredentialStore`] trait keeps callers off the concrete storage;
//! [`InMemoryCredentialStore`] backs unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::instrument;

use crate::error::Result;
use crate::types::{OAuthTokens, StoredCredentials};

/// Persistence seam for per-user OAuth credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credentials stored for a user, if any row exists.
    async fn get(&self, user_id: &str) -> Result<Option<StoredCredentials>>;

    /// Persist a freshly obtained token set for a user.
    async fn save_tokens(&self, user_id: &str, tokens: &OAuthTokens) -> Result<()>;

    /// Clear both tokens for a user.
    ///
    /// Called when a refresh is rejected: keeping a dead refresh token
    /// around would make every later sync re-fail the same way.
    async fn clear_tokens(&self, user_id: &str) -> Result<()>;
}

/// SQLite-backed credential store over the `users` table.
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get(&self, user_id: &str) -> Result<Option<StoredCredentials>> {
        let row = sqlx::query(
            "SELECT user_id, access_token, refresh_token, token_expires_at
             FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| StoredCredentials {
            user_id: row.get("user_id"),
            access_token: row.get("access_token"),
            refresh_token: row.get("refresh_token"),
            token_expires_at: row.get::<Option<DateTime<Utc>>, _>("token_expires_at"),
        }))
    }

    #[instrument(skip(self, tokens), fields(user_id = %user_id))]
    async fn save_tokens(&self, user_id: &str, tokens: &OAuthTokens) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (user_id, access_token, refresh_token, token_expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 access_token = excluded.access_token,
                 refresh_token = excluded.refresh_token,
                 token_expires_at = excluded.token_expires_at",
        )
        .bind(user_id)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Saved refreshed tokens");
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn clear_tokens(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users
             SET access_token = NULL, refresh_token = NULL, token_expires_at = NULL
             WHERE user_id = ?",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::warn!("Cleared stored tokens");
        Ok(())
    }
}

/// In-memory credential store for tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: Mutex<HashMap<String, StoredCredentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a credentials row.
    pub fn insert(&self, credentials: StoredCredentials) {
        if let Ok(mut map) = self.credentials.lock() {
            map.insert(credentials.user_id.clone(), credentials);
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredCredentials>> {
        let map = self
            .credentials
            .lock()
            .map_err(|_| crate::error::AuthError::Network("credential lock poisoned".to_string()))?;
        Ok(map.get(user_id).cloned())
    }

    async fn save_tokens(&self, user_id: &str, tokens: &OAuthTokens) -> Result<()> {
        let mut map = self
            .credentials
            .lock()
            .map_err(|_| crate::error::AuthError::Network("credential lock poisoned".to_string()))?;
        map.insert(
            user_id.to_string(),
            StoredCredentials {
                user_id: user_id.to_string(),
                access_token: Some(tokens.access_token.clone()),
                refresh_token: Some(tokens.refresh_token.clone()),
                token_expires_at: Some(tokens.expires_at),
            },
        );
        Ok(())
    }

    async fn clear_tokens(&self, user_id: &str) -> Result<()> {
        let mut map = self
            .credentials
            .lock()
            .map_err(|_| crate::error::AuthError::Network("credential lock poisoned".to_string()))?;
        if let Some(creds) = map.get_mut(user_id) {
            creds.access_token = None;
            creds.refresh_token = None;
            creds.token_expires_at = None;
        }
        Ok(())
    }
}
