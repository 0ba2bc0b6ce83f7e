use thiserror::Error;

/// Errors produced by change replay and reconciliation.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The change id does not exist or belongs to another user.
    #[error("Pending change {change_id} not found")]
    ChangeNotFound { change_id: i64 },

    #[error("Remote catalog error: {0}")]
    Provider(#[from] provider_spotify::SpotifyError),

    #[error("Auth error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] core_mirror::MirrorError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
