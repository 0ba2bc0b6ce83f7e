//! Token Guardian
//!
//! Single entry point the rest of the workspace uses to obtain an
//! access token. Callers never see refresh mechanics; they ask for a
//! token and get back:
//!
//! - `Ok(Some(token))` - a usable access token (possibly just refreshed)
//! - `Ok(None)` - the user has no credentials at all; the consent flow
//!   has to run before any remote call can happen
//! - `Err(_)` - a refresh was attempted and failed; the stored tokens
//!   have been cleared

use std::sync::Arc;
use tracing::instrument;

use crate::error::Result;
use crate::refresh::TokenRefresher;
use crate::store::CredentialStore;

/// Guards access-token freshness for every remote call.
pub struct TokenGuardian {
    store: Arc<dyn CredentialStore>,
    refresher: TokenRefresher,
}

impl TokenGuardian {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: TokenRefresher) -> Self {
        Self { store, refresher }
    }

    /// Return a valid access token for the user, refreshing if needed.
    ///
    /// When the stored access token is missing or expired and a refresh
    /// token exists, a refresh is attempted and the new token set is
    /// persisted before returning. A rejected refresh clears both
    /// stored tokens so the next sync reports "not authorized" instead
    /// of re-failing the same dead grant, then propagates the error.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn ensure_valid_token(&self, user_id: &str) -> Result<Option<String>> {
        let Some(credentials) = self.store.get(user_id).await? else {
            tracing::debug!("No credentials row for user");
            return Ok(None);
        };

        if credentials.has_valid_access_token() {
            return Ok(credentials.access_token);
        }

        let Some(refresh_token) = credentials.refresh_token else {
            tracing::debug!("No refresh token stored; user must re-authorize");
            return Ok(None);
        };

        tracing::info!("Access token missing or expired, refreshing");

        match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.store.save_tokens(user_id, &tokens).await?;
                Ok(Some(tokens.access_token))
            }
            Err(error) => {
                self.store.clear_tokens(user_id).await?;
                Err(error)
            }
        }
    }

    /// Drop the user's stored tokens.
    ///
    /// Used when the API reports the granted scopes no longer cover an
    /// operation; the user has to re-authorize with the right scopes.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn revoke(&self, user_id: &str) -> Result<()> {
        self.store.clear_tokens(user_id).await
    }
}
