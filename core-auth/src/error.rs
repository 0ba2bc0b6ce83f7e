use thiserror::Error;

/// Errors produced by credential storage and token refresh.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The token endpoint rejected the refresh, or all retries were
    /// exhausted. Callers should treat the stored credentials as stale.
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// No credentials exist for the user.
    #[error("User '{user_id}' has no stored credentials")]
    NotAuthenticated { user_id: String },

    /// The request never reached the token endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The token endpoint answered with a body we could not parse.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Credential persistence failed.
    #[error("Credential storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;
