//! Unified error types for shltr.
//!
//! Every fallible operation in the workspace funnels into this enum so the
//! gateway and its host see a single error surface.

use tokio_rusqlite::rusqlite;

/// Unified error type for the shltr workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty precache list entry).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A request key could not be built from its method/URL parts.
    #[error("invalid request key: {0}")]
    InvalidKey(String),

    /// Database operation failed.
    #[error("store error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("store error: migration failed: {0}")]
    MigrationFailed(String),

    /// Descriptor could not be parsed or serialized.
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// Origin returned a protocol-level failure (connect error, bad status).
    #[error("origin error: {0}")]
    Http(String),

    /// Origin fetch timed out.
    #[error("origin timeout: {0}")]
    Timeout(String),

    /// Origin response exceeded the configured byte limit.
    #[error("origin response too large: {0}")]
    TooLarge(String),

    /// A lifecycle transition was requested out of order.
    #[error("invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    /// A request was intercepted before the pipeline reached Serving.
    #[error("pipeline is not serving: {0}")]
    NotServing(String),

    /// Internal failure with no better category (e.g., a panicked task).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
