//! Identity change detection.
//!
//! Compares the identity in the cached descriptor against the one the
//! origin currently publishes, then refreshes the cached copy. The cached
//! entry doubles as the comparison baseline, so a change is reported
//! exactly once: the check that detects it also persists the new
//! descriptor, and the next check finds both sides equal.

use std::sync::Arc;

use serde::Serialize;

use shltr_core::store::RequestKey;
use shltr_core::{CacheName, Descriptor, Error, Origin, ResponseStore, StoredResponse};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityCheck {
    /// True when a previously known identity differs from the live one.
    pub changed: bool,
    /// Identity the origin currently publishes, when it parsed.
    pub identity: Option<String>,
    /// Identity from the cached descriptor, when one parsed.
    pub previous: Option<String>,
}

/// Watches the well-known descriptor key for identity changes.
pub struct IdentityDetector {
    store: ResponseStore,
    cache: CacheName,
    origin: Arc<dyn Origin>,
    descriptor_key: RequestKey,
}

impl IdentityDetector {
    pub fn new(
        store: ResponseStore,
        cache: CacheName,
        origin: Arc<dyn Origin>,
        descriptor_key: RequestKey,
    ) -> Self {
        Self { store, cache, origin, descriptor_key }
    }

    /// The key this detector reconciles.
    pub fn descriptor_key(&self) -> &RequestKey {
        &self.descriptor_key
    }

    /// Run one reconciliation pass.
    ///
    /// Reads the cached descriptor and fetches the live one concurrently,
    /// compares identities, then persists the live payload. Ordering is
    /// load-bearing: the comparison uses the pre-refresh baseline, and the
    /// refresh makes the following check quiescent.
    ///
    /// An unparseable live payload reports `changed = false` and leaves the
    /// store untouched. An unparseable cached entry is treated as absent
    /// and overwritten by a parseable live one. Network and store failures
    /// propagate; there are no retries here, the next pass recovers.
    pub async fn check_and_refresh(&self) -> Result<IdentityCheck, Error> {
        let (prior, live) = tokio::join!(
            self.store.match_key(&self.cache, &self.descriptor_key),
            self.origin.fetch(&self.descriptor_key),
        );
        let prior = prior?;
        let live = live?;

        let previous = match &prior {
            None => None,
            Some(entry) => match Descriptor::from_slice(&entry.body) {
                Ok(d) => Some(d.identity().to_string()),
                Err(e) => {
                    tracing::warn!(
                        key = %self.descriptor_key,
                        error = %e,
                        "cached descriptor unparseable, re-seeding baseline"
                    );
                    None
                }
            },
        };

        let live_descriptor = match Descriptor::from_slice(&live.body) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    key = %self.descriptor_key,
                    error = %e,
                    "live descriptor unparseable, baseline untouched"
                );
                return Ok(IdentityCheck { changed: false, identity: None, previous });
            }
        };
        let identity = live_descriptor.identity().to_string();

        // Exact string comparison, no normalization. First sight is never a
        // change.
        let changed = previous.as_deref().is_some_and(|old| old != identity);

        let refreshed = StoredResponse::from_origin(&self.descriptor_key, &live);
        self.store.put(&self.cache, &self.descriptor_key, &refreshed).await?;

        if changed {
            tracing::info!(
                key = %self.descriptor_key,
                previous = previous.as_deref().unwrap_or(""),
                identity = %identity,
                "identity change detected"
            );
        } else {
            tracing::debug!(key = %self.descriptor_key, identity = %identity, "identity unchanged");
        }

        Ok(IdentityCheck { changed, identity: Some(identity), previous })
    }

    /// Identity from the cached descriptor, if one is stored and parses.
    pub async fn cached_identity(&self) -> Result<Option<String>, Error> {
        let entry = self.store.match_key(&self.cache, &self.descriptor_key).await?;
        Ok(entry
            .and_then(|e| Descriptor::from_slice(&e.body).ok())
            .map(|d| d.identity().to_string()))
    }
}
