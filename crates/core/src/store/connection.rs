//! Store open paths and pragma configuration.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

// WAL so the interception and reconciliation contexts can hold separate
// handles on one file; busy_timeout instead of surfacing SQLITE_BUSY to
// whichever context loses a write race.
const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;
     PRAGMA foreign_keys=ON;";

/// Durable response store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Handles are cheap to clone; clones address the same
/// underlying store, which is the only resource the interception pipeline
/// and the identity detector are allowed to share.
#[derive(Clone, Debug)]
pub struct ResponseStore {
    pub(crate) conn: Connection,
}

impl ResponseStore {
    /// Open a store at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and runs any
    /// pending migrations. Opening is idempotent: a second open of the same
    /// path lands on the same durable state.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory store for testing.
    ///
    /// Same configuration as file-based stores, but nothing survives the
    /// handle.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        let version = store
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_same_path_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        let first = ResponseStore::open(&path).await.unwrap();
        drop(first);
        ResponseStore::open(&path).await.unwrap();
    }
}
