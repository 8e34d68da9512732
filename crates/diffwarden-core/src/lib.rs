//! Core configuration and error handling for diffwarden.
//!
//! This crate provides the shared foundation used by the other crates:
//! - [`DiffwardenError`]: unified error type using `thiserror`
//! - [`DiffwardenConfig`]: configuration loaded from `.diffwarden.toml`

mod config;
mod error;

pub use config::{AppConfig, DiffwardenConfig, LlmConfig, ReviewConfig, CONFIG_FILE_NAME};
pub use error::DiffwardenError;

/// A convenience `Result` type for diffwarden operations.
pub type Result<T> = std::result::Result<T, DiffwardenError>;
