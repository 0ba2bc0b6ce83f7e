//! Workspace umbrella crate.
//!
//! Re-exports the service facade so host applications can depend on
//! `spotlib` alone. The individual workspace crates remain usable
//! directly when an embedder only needs one layer (e.g. `core-mirror`
//! for read-only access to an existing library database).

pub use core_service::{LibraryService, PlaylistView, Result, ServiceError, UserView};
