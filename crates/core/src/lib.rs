//! Core types and shared functionality for shltr.
//!
//! This crate provides:
//! - Response store with SQLite backend
//! - Request key canonicalization and hashing
//! - App descriptor model
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod manifest;
pub mod origin;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::Descriptor;
pub use origin::{Origin, OriginResponse};
pub use store::{CacheName, RequestKey, ResponseStore, StoredResponse};
