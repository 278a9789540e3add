//! # Artcat Common Library
//!
//! Shared code for the artwork catalog crates including:
//! - Error type and result alias
//! - Configuration loading (TOML bootstrap, environment, OS defaults)
//! - Logging initialisation
//! - Catalog event types and the broadcast EventBus
//! - SQLite database initialisation

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
