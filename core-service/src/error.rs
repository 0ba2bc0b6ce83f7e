use thiserror::Error;

/// Errors surfaced by the library service facade.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The user has no usable credentials; run the consent flow.
    #[error("User {user_id} is not authenticated")]
    NotAuthenticated { user_id: String },

    /// The stored authorization no longer covers the library scopes.
    /// Credentials have been cleared; the user must re-authorize.
    #[error("Authorization for {user_id} lacks the required scopes and was revoked")]
    ScopeRevoked { user_id: String },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error(transparent)]
    Auth(#[from] core_auth::AuthError),

    #[error(transparent)]
    Mirror(#[from] core_mirror::MirrorError),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),

    #[error(transparent)]
    Provider(#[from] provider_spotify::SpotifyError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
