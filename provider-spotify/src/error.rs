use thiserror::Error;

/// Errors produced by the Spotify Web API connector.
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// The API rejected the bearer credential (401/403). The caller
    /// should refresh the token and retry the operation.
    #[error("Authentication failed (status {status})")]
    Auth { status: u16 },

    /// The granted scopes do not cover this operation. Refreshing the
    /// token cannot help; the user has to re-authorize.
    #[error("Insufficient authorization scope")]
    InsufficientScope,

    /// Non-success API response that is neither an auth nor a scope
    /// failure.
    #[error("API error {status_code}: {message}")]
    Api { status_code: u16, message: String },

    /// The response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The request never reached the API.
    #[error("Network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, SpotifyError>;
