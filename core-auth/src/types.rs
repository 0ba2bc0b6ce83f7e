use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth 2.0 token set.
///
/// # Security
///
/// Tokens must never reach the log stream. The `Debug` implementation
/// redacts both token fields.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
///
/// let tokens = OAuthTokens::new("access".to_string(), "refresh".to_string(), 3600);
/// assert!(!tokens.is_expired());
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token sent as a bearer credential on API requests
    pub access_token: String,
    /// The long-lived refresh token
    pub refresh_token: String,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Create a token set expiring `expires_in` seconds from now.
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// Check expiry with the default 60-second buffer.
    ///
    /// The buffer keeps a token from expiring mid-pagination: a token
    /// that is technically valid but about to lapse is treated as
    /// expired so it gets refreshed before the next batch of calls.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(60)
    }

    /// Check expiry with a custom buffer in seconds.
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(buffer_seconds)
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Credentials as persisted for a single user.
///
/// Either token may be absent: a user who never completed authorization
/// has neither, and a user whose refresh was rejected has both cleared.
#[derive(Clone)]
pub struct StoredCredentials {
    pub user_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Expiry of the stored access token, when known.
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    /// True when a usable (present and unexpired) access token exists.
    ///
    /// A token with no recorded expiry is treated as expired so it gets
    /// refreshed rather than sent and bounced with a 401.
    pub fn has_valid_access_token(&self) -> bool {
        match (&self.access_token, self.token_expires_at) {
            (Some(_), Some(expires_at)) => {
                Utc::now() < expires_at - Duration::seconds(60)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("user_id", &self.user_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_expires_at", &self.token_expires_at)
            .finish()
    }
}
