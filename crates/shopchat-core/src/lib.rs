//! # shopchat-core
//!
//! Core types and configuration for ShopChat.
//!
//! This crate provides shared functionality used across all ShopChat crates:
//!
//! - **Types**: Chat messages, session identifiers, and answer provenance
//! - **Configuration**: Loading, validation, and defaults for the engine

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::ConfigError;
pub use types::{ChatMessage, Role, SessionId, Source};
