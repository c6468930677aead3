//! Durable meta records stored beside the response cache.
//!
//! Meta keys are deliberately not scoped by cache name: the installed-app
//! baseline has to survive a cache-generation bump, which only replaces
//! the named response cache.

use super::connection::ResponseStore;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl ResponseStore {
    /// Get a meta value by key.
    ///
    /// Returns None if the key has never been written.
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a meta value.
    ///
    /// Uses UPSERT semantics; writing the same value twice is a no-op
    /// apart from the refreshed timestamp.
    pub async fn put_meta(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO meta (key, value, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get_meta() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        store.put_meta("installed_identity", "My App").await.unwrap();
        assert_eq!(store.get_meta("installed_identity").await.unwrap().as_deref(), Some("My App"));
    }

    #[tokio::test]
    async fn test_get_missing_meta() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        assert!(store.get_meta("never_written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_meta_replaces() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        store.put_meta("installed_identity", "Old").await.unwrap();
        store.put_meta("installed_identity", "New").await.unwrap();
        assert_eq!(store.get_meta("installed_identity").await.unwrap().as_deref(), Some("New"));
    }
}
