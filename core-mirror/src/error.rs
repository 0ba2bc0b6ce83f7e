use thiserror::Error;

/// Errors produced by the mirror store.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;
