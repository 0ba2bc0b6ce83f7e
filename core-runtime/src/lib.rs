//! # Runtime Module
//!
//! Shared runtime infrastructure for the Spotify library core.
//!
//! ## Overview
//!
//! This crate owns the concerns every other workspace crate leans on:
//! - Application configuration with fail-fast validation
//! - Logging and tracing setup
//! - The HTTP client abstraction used by the remote catalog client and
//!   the token guardian

pub mod config;
pub mod error;
pub mod http;
pub mod logging;

pub use config::{AppConfig, AppConfigBuilder, SyncTuning};
pub use error::{Error, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use logging::{init_logging, LogFormat, LoggingConfig};
