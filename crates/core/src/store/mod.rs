//! SQLite-backed durable response store.
//!
//! This module provides the persistent request-to-response mapping shared
//! by the interception pipeline and the identity detector, using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Content-addressed entries keyed by method + canonical URL
//! - Explicit cache names so one database can hold multiple generations
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - A best-effort precache batch with a per-item failure report

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod connection;
pub mod key;
pub mod meta;
pub mod migrations;
pub mod responses;

pub use crate::Error;

pub use connection::ResponseStore;
pub use key::{KeyError, RequestKey};
pub use responses::{PrecacheFailure, PrecacheReport, StoredResponse};

/// Explicit name of one cache generation within the store.
///
/// Threaded into the pipeline and the detector at construction time;
/// bumping the name is how a deployment abandons the previous generation's
/// entries wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheName(String);

impl CacheName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
