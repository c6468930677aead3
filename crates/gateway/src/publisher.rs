//! Ephemeral descriptor publishing.
//!
//! Synthesized descriptors are handed to the host through opaque,
//! process-local references. The publisher holds at most one live
//! serialization; publishing again supersedes the previous reference,
//! which then resolves to nothing.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use shltr_core::{Descriptor, Error};

/// Opaque handle to one published descriptor serialization.
///
/// Only the publisher that issued a reference can resolve it, and only
/// while it has not been superseded or revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ManifestRef(Uuid);

impl ManifestRef {
    /// The value a host's manifest link adopts for this reference.
    pub fn href(&self) -> String {
        format!("shltr-manifest:{}", self.0)
    }
}

impl fmt::Display for ManifestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

/// Single-slot, in-process store of the current descriptor serialization.
pub struct ManifestPublisher {
    base: Url,
    slot: RwLock<Option<(Uuid, Bytes)>>,
}

impl ManifestPublisher {
    /// Create a publisher synthesizing descriptors against `base`.
    pub fn new(base: Url) -> Self {
        Self { base, slot: RwLock::new(None) }
    }

    /// Synthesize and publish a descriptor for `identity`.
    ///
    /// The returned reference is the only live one; whatever was published
    /// before stops resolving. Serialization failure is fatal to this call
    /// and leaves the previous reference in place.
    pub async fn publish(&self, identity: &str) -> Result<ManifestRef, Error> {
        let descriptor = Descriptor::for_identity(identity, &self.base);
        let bytes = Bytes::from(descriptor.to_bytes()?);
        let reference = ManifestRef(Uuid::new_v4());

        let mut slot = self.slot.write().await;
        if let Some((superseded, _)) = slot.replace((reference.0, bytes)) {
            tracing::debug!(superseded = %superseded, href = %reference, "republished descriptor");
        } else {
            tracing::debug!(href = %reference, "published descriptor");
        }

        Ok(reference)
    }

    /// The serialized descriptor behind `reference`, if it is still live.
    pub async fn resolve(&self, reference: &ManifestRef) -> Option<Bytes> {
        let slot = self.slot.read().await;
        match &*slot {
            Some((id, bytes)) if *id == reference.0 => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Drop `reference` if it is the live one. Returns whether anything
    /// was revoked.
    pub async fn revoke(&self, reference: &ManifestRef) -> bool {
        let mut slot = self.slot.write().await;
        match &*slot {
            Some((id, _)) if *id == reference.0 => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// The currently live reference, if any.
    pub async fn current(&self) -> Option<ManifestRef> {
        self.slot.read().await.as_ref().map(|(id, _)| ManifestRef(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher() -> ManifestPublisher {
        ManifestPublisher::new(Url::parse("https://app.example").unwrap())
    }

    #[tokio::test]
    async fn test_publish_then_resolve() {
        let publisher = publisher();
        let reference = publisher.publish("My App").await.unwrap();

        let bytes = publisher.resolve(&reference).await.unwrap();
        let descriptor = Descriptor::from_slice(&bytes).unwrap();
        assert_eq!(descriptor.identity(), "My App");
        assert_eq!(publisher.current().await, Some(reference));
    }

    #[tokio::test]
    async fn test_republish_supersedes_previous_reference() {
        let publisher = publisher();
        let first = publisher.publish("My App").await.unwrap();
        let second = publisher.publish("Renamed App").await.unwrap();

        assert_ne!(first, second);
        assert!(publisher.resolve(&first).await.is_none());

        let bytes = publisher.resolve(&second).await.unwrap();
        let descriptor = Descriptor::from_slice(&bytes).unwrap();
        assert_eq!(descriptor.identity(), "Renamed App");
    }

    #[tokio::test]
    async fn test_revoke_live_reference() {
        let publisher = publisher();
        let reference = publisher.publish("My App").await.unwrap();

        assert!(publisher.revoke(&reference).await);
        assert!(publisher.resolve(&reference).await.is_none());
        assert_eq!(publisher.current().await, None);

        // Second revoke is a no-op.
        assert!(!publisher.revoke(&reference).await);
    }

    #[tokio::test]
    async fn test_revoke_superseded_reference_is_noop() {
        let publisher = publisher();
        let first = publisher.publish("My App").await.unwrap();
        let second = publisher.publish("Renamed App").await.unwrap();

        assert!(!publisher.revoke(&first).await);
        assert!(publisher.resolve(&second).await.is_some());
    }

    #[tokio::test]
    async fn test_published_payload_shape() {
        let publisher = publisher();
        let reference = publisher.publish("My App").await.unwrap();

        let bytes = publisher.resolve(&reference).await.unwrap();
        let descriptor = Descriptor::from_slice(&bytes).unwrap();
        assert_eq!(descriptor.short_name, "My App");
        assert_eq!(descriptor.start_url, "https://app.example");
        assert_eq!(descriptor.icons.len(), 8);
    }

    #[tokio::test]
    async fn test_href_scheme() {
        let publisher = publisher();
        let reference = publisher.publish("My App").await.unwrap();
        assert!(reference.href().starts_with("shltr-manifest:"));
        assert_eq!(reference.to_string(), reference.href());
    }
}
