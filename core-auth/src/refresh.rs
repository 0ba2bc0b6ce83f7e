//! Token Refresh
//!
//! Exchanges a refresh token for a new access token against the
//! accounts token endpoint (RFC 6749 §6). The client authenticates with
//! HTTP Basic using its id and secret.
//!
//! # Retry Policy
//!
//! - 4xx responses fail immediately: the grant itself was rejected and
//!   repeating the request cannot succeed
//! - 5xx responses retry up to 3 times with exponential backoff
//! - Transport errors fail immediately

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use core_runtime::config::ACCOUNTS_TOKEN_URL;
use core_runtime::http::{HttpClient, HttpMethod, HttpRequest};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{instrument, warn};

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;

const MAX_RETRIES: u32 = 3;

/// Refreshes access tokens for a single OAuth application.
pub struct TokenRefresher {
    http_client: Arc<dyn HttpClient>,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl TokenRefresher {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: ACCOUNTS_TOKEN_URL.to_string(),
        }
    }

    /// Override the token endpoint. Used by tests.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// Exchange a refresh token for a fresh access token.
    ///
    /// The endpoint may omit `refresh_token` from its response; in that
    /// case the old refresh token is carried forward unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenRefreshFailed`] when the endpoint
    /// rejects the grant (4xx) or keeps failing (5xx) past the retry
    /// limit.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to encode request: {}", e)))?;
        let body = Bytes::from(encoded_body);

        let mut attempts = 0;

        loop {
            attempts += 1;

            let request = HttpRequest::new(HttpMethod::Post, self.token_url.clone())
                .header("Authorization", self.basic_auth_header())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body.clone());

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| AuthError::Network(e.to_string()))?;

            if response.is_success() {
                let token_response: TokenResponse = response.json().map_err(|e| {
                    AuthError::InvalidResponse(format!("Failed to parse token response: {}", e))
                })?;

                tracing::info!(
                    expires_in = token_response.expires_in,
                    "Refreshed access token"
                );

                return Ok(OAuthTokens::new(
                    token_response.access_token,
                    token_response
                        .refresh_token
                        .unwrap_or_else(|| refresh_token.to_string()),
                    token_response.expires_in,
                ));
            }

            let status = response.status;

            if response.is_client_error() {
                let error_body = response
                    .text()
                    .unwrap_or_else(|_| "Unable to read error response".to_string());

                warn!(
                    status = status,
                    error = %error_body,
                    "Token refresh rejected without retry"
                );

                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token endpoint returned {}: {}",
                    status, error_body
                )));
            }

            if attempts >= MAX_RETRIES {
                let error_body = response
                    .text()
                    .unwrap_or_else(|_| "Unable to read error response".to_string());

                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {} - {}",
                    attempts, status, error_body
                )));
            }

            let delay = Duration::from_millis(100 * 2u64.pow(attempts - 1));
            warn!(
                status = status,
                attempts = attempts,
                delay_ms = delay.as_millis(),
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}
