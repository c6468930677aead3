//! Stored response CRUD and the best-effort precache batch.
//!
//! A `put` is total: no merge semantics, last-write-wins. Concurrent
//! writers to the same key race under last-write-wins; the store does not
//! lock around them.

use super::CacheName;
use super::connection::ResponseStore;
use super::key::RequestKey;
use crate::Error;
use crate::origin::{Origin, OriginResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Upper bound on concurrent precache fetches.
const PRECACHE_CONCURRENCY: usize = 4;

/// One cached response, addressed by its request key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Convert a live origin response into its storable form.
    pub fn from_origin(key: &RequestKey, response: &OriginResponse) -> Self {
        let headers_json =
            if response.headers.is_empty() { None } else { serde_json::to_string(&response.headers).ok() };

        Self {
            method: key.method().to_string(),
            url: key.url().to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            headers_json,
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Outcome of a precache batch. One member's failure never aborts the
/// batch, so the report carries per-key failures next to the totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrecacheReport {
    pub attempted: u32,
    pub stored: u32,
    pub failed: u32,
    pub failures: Vec<PrecacheFailure>,
}

/// A single failed precache member.
#[derive(Debug, Clone, Serialize)]
pub struct PrecacheFailure {
    pub key: String,
    pub error: String,
}

impl ResponseStore {
    /// Insert or replace the entry for a request key.
    ///
    /// Uses UPSERT semantics: inserts if the key has no entry, replaces
    /// all fields if it does.
    pub async fn put(&self, cache: &CacheName, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let cache = cache.as_str().to_string();
        let key_hash = key.store_hash();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (
                    cache, key_hash, method, url, status, content_type,
                    headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(cache, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    content_type = excluded.content_type,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        cache,
                        key_hash,
                        &response.method,
                        &response.url,
                        response.status as i64,
                        &response.content_type,
                        &response.headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a request key.
    ///
    /// Returns None if the key has no entry in this cache.
    pub async fn match_key(&self, cache: &CacheName, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let cache = cache.as_str().to_string();
        let key_hash = key.store_hash();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, content_type, headers_json, body, stored_at
                FROM responses WHERE cache = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![cache, key_hash], |row| {
                    Ok(StoredResponse {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status: row.get::<_, i64>(2)? as u16,
                        content_type: row.get(3)?,
                        headers_json: row.get(4)?,
                        body: row.get(5)?,
                        stored_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries held under a cache name.
    pub async fn entry_count(&self, cache: &CacheName) -> Result<u64, Error> {
        let cache = cache.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM responses WHERE cache = ?1", params![cache], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Fetch and store every key in the list, best-effort.
    ///
    /// Each key's fetch/store attempt is independent: a failure is logged,
    /// recorded in the report and skipped, never fatal to sibling keys.
    /// Fetches run with bounded concurrency.
    pub async fn add_all(
        &self,
        cache: &CacheName,
        origin: Arc<dyn Origin>,
        keys: &[RequestKey],
    ) -> Result<PrecacheReport, Error> {
        let semaphore = Arc::new(Semaphore::new(PRECACHE_CONCURRENCY));
        let mut join_set = JoinSet::new();

        for key in keys.iter().cloned() {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let store = self.clone();
            let origin = origin.clone();
            let cache = cache.clone();

            join_set.spawn(async move {
                // NOTE: the permit rides with the task, capping in-flight fetches
                let _permit = permit;
                let result = async {
                    let response = origin.fetch(&key).await?;
                    let stored = StoredResponse::from_origin(&key, &response);
                    store.put(&cache, &key, &stored).await
                }
                .await;
                (key, result)
            });
        }

        let mut report = PrecacheReport::default();

        while let Some(joined) = join_set.join_next().await {
            let (key, result) = joined.map_err(|e| Error::Internal(e.to_string()))?;
            report.attempted += 1;
            match result {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "precache item failed");
                    report.failed += 1;
                    report.failures.push(PrecacheFailure { key: key.to_string(), error: e.to_string() });
                }
            }
        }

        Ok(report)
    }
}
