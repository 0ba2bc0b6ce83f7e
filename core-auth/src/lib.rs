//! # Authentication Module
//!
//! Token storage and refresh for the Spotify library core.
//!
//! ## Overview
//!
//! Every remote call needs a fresh access token. This crate owns that
//! concern end to end:
//!
//! - [`CredentialStore`] persists per-user access and refresh tokens
//! - [`TokenRefresher`] exchanges a refresh token for a new access token
//!   against the accounts token endpoint
//! - [`TokenGuardian`] ties the two together: callers ask it for a valid
//!   access token and it transparently refreshes (or clears stale
//!   credentials) as needed
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{TokenGuardian, TokenRefresher, SqliteCredentialStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteCredentialStore::new(pool));
//! let refresher = TokenRefresher::new(http_client, client_id, client_secret);
//! let guardian = TokenGuardian::new(store, refresher);
//!
//! match guardian.ensure_valid_token("user-1").await? {
//!     Some(token) => { /* call the API */ }
//!     None => { /* user never authorized; run the consent flow */ }
//! }
//! ```

pub mod error;
pub mod guardian;
pub mod refresh;
pub mod store;
pub mod types;

pub use error::{AuthError, Result};
pub use guardian::TokenGuardian;
pub use refresh::TokenRefresher;
pub use store::{CredentialStore, InMemoryCredentialStore, SqliteCredentialStore};
pub use types::{OAuthTokens, StoredCredentials};
