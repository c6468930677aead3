//! Request interception pipeline.
//!
//! Requests reach the origin only through this pipeline once a version is
//! serving. The baseline route is cache-first: a stored response is
//! returned as-is with no revalidation, and a miss is filled from the
//! network with the persist spawned off the reply path. Network-first is
//! available to callers that need a fresh read with a cached fallback.

use std::sync::Arc;

use url::Url;

use shltr_core::store::{PrecacheReport, RequestKey};
use shltr_core::{CacheName, Error, Origin, ResponseStore, StoredResponse};

use crate::lifecycle::{Lifecycle, LifecycleState};

/// How the store is consulted when filling a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    /// Hit returns the stored entry untouched; miss fetches live and
    /// persists as a background side effect.
    CacheFirst,
    /// Fetch live, persist before replying; fall back to the stored
    /// entry when the network fails.
    NetworkFirst,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
}

/// One fulfilled interception.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: StoredResponse,
    pub from: ServedFrom,
}

/// The interception pipeline for one cache generation.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and may be
/// called concurrently once the version is serving.
pub struct Pipeline {
    store: ResponseStore,
    cache: CacheName,
    origin: Arc<dyn Origin>,
    lifecycle: Lifecycle,
    base: Url,
    precache: Vec<String>,
}

impl Pipeline {
    pub fn new(
        store: ResponseStore,
        cache: CacheName,
        origin: Arc<dyn Origin>,
        base: Url,
        precache: Vec<String>,
    ) -> Self {
        Self { store, cache, origin, lifecycle: Lifecycle::new(), base, precache }
    }

    /// The lifecycle handle, for observing or awaiting state changes.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.current()
    }

    /// Install this version: precache the configured resource list.
    ///
    /// Runs once per version. Individual precache failures are recorded in
    /// the report and never abort the batch; completion leaves the version
    /// immediately eligible to activate. A store-level failure is fatal and
    /// leaves the lifecycle in `Installing`.
    pub async fn install(&self) -> Result<PrecacheReport, Error> {
        self.lifecycle.begin_install()?;

        let keys = self
            .precache
            .iter()
            .map(|path| RequestKey::from_path(&self.base, path))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidKey(e.to_string()))?;

        let report = self.store.add_all(&self.cache, Arc::clone(&self.origin), &keys).await?;

        tracing::info!(
            cache = %self.cache,
            attempted = report.attempted,
            stored = report.stored,
            failed = report.failed,
            "precache complete"
        );

        self.lifecycle.finish_install()?;
        Ok(report)
    }

    /// Activate this version: start serving and claim current subscribers.
    pub fn activate(&self) -> Result<(), Error> {
        self.lifecycle.claim()?;
        tracing::info!(cache = %self.cache, "pipeline serving");
        Ok(())
    }

    /// Intercept one request. Serving state only; re-entrant.
    ///
    /// Baseline routing is cache-first for every key. A network failure on
    /// a miss propagates to the caller.
    pub async fn handle(&self, key: &RequestKey) -> Result<Served, Error> {
        self.lifecycle.require_serving()?;
        self.fetch_with(FillStrategy::CacheFirst, key).await
    }

    /// Fill one request with an explicit strategy.
    ///
    /// This is the engine underneath [`Pipeline::handle`]; it does not
    /// check lifecycle state, so callers that bypass `handle` own that
    /// decision.
    pub async fn fetch_with(&self, strategy: FillStrategy, key: &RequestKey) -> Result<Served, Error> {
        match strategy {
            FillStrategy::CacheFirst => self.cache_first(key).await,
            FillStrategy::NetworkFirst => self.network_first(key).await,
        }
    }

    async fn cache_first(&self, key: &RequestKey) -> Result<Served, Error> {
        if let Some(hit) = self.store.match_key(&self.cache, key).await? {
            tracing::debug!(key = %key, "cache hit");
            return Ok(Served { response: hit, from: ServedFrom::Cache });
        }

        let fetched = self.origin.fetch(key).await?;
        let response = StoredResponse::from_origin(key, &fetched);

        // Persist off the reply path; a failed write costs a future refetch,
        // nothing else.
        let store = self.store.clone();
        let cache = self.cache.clone();
        let write_key = key.clone();
        let clone = response.clone();
        tokio::spawn(async move {
            if let Err(e) = store.put(&cache, &write_key, &clone).await {
                tracing::warn!(key = %write_key, error = %e, "background cache write failed");
            }
        });

        Ok(Served { response, from: ServedFrom::Network })
    }

    async fn network_first(&self, key: &RequestKey) -> Result<Served, Error> {
        match self.origin.fetch(key).await {
            Ok(fetched) => {
                let response = StoredResponse::from_origin(key, &fetched);
                self.store.put(&self.cache, key, &response).await?;
                Ok(Served { response, from: ServedFrom::Network })
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "network-first fetch failed, trying cache");
                match self.store.match_key(&self.cache, key).await? {
                    Some(hit) => Ok(Served { response: hit, from: ServedFrom::Cache }),
                    None => Err(e),
                }
            }
        }
    }
}
