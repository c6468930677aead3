//! Install-state tracking.
//!
//! Two signals tell us the client runs the installed app: the platform's
//! post-install notification, and a standalone display-mode probe checked
//! on page load and when visibility returns. Both funnel into the same
//! idempotent action: persist the current identity as the installed
//! baseline and clear any pending change warning.

use tokio::sync::watch;

use shltr_core::{Error, ResponseStore};

/// Meta key the installed-identity baseline is stored under.
///
/// Not scoped by cache name: what the client has installed outlives any
/// one cache generation.
const INSTALLED_IDENTITY_KEY: &str = "installed_identity";

/// Host-supplied answer to "is this client running standalone?".
pub trait DisplayModeProbe: Send + Sync {
    fn standalone(&self) -> bool;
}

/// Probe with a fixed answer, for hosts that already know and for tests.
pub struct FixedDisplayMode(pub bool);

impl DisplayModeProbe for FixedDisplayMode {
    fn standalone(&self) -> bool {
        self.0
    }
}

/// Tracks the installed-identity baseline and the pending change warning.
///
/// The baseline is durable (store meta); the warning is in-memory state
/// published through a watch channel.
pub struct InstallTracker {
    store: ResponseStore,
    warning: watch::Sender<Option<String>>,
}

impl InstallTracker {
    pub fn new(store: ResponseStore) -> Self {
        let (warning, _) = watch::channel(None);
        Self { store, warning }
    }

    /// The identity recorded when the app was last installed, if any.
    pub async fn installed_identity(&self) -> Result<Option<String>, Error> {
        self.store.get_meta(INSTALLED_IDENTITY_KEY).await
    }

    /// Subscribe to pending-warning changes.
    pub fn subscribe_warnings(&self) -> watch::Receiver<Option<String>> {
        self.warning.subscribe()
    }

    /// The identity a pending warning points at, if one is set.
    pub fn pending_warning(&self) -> Option<String> {
        self.warning.borrow().clone()
    }

    /// Record a detected identity change for the host to surface.
    ///
    /// Cleared by any install signal.
    pub fn note_change(&self, identity: &str) {
        self.warning.send_replace(Some(identity.to_string()));
    }

    /// Platform reported the app was just installed.
    pub async fn on_app_installed(&self, identity: &str) -> Result<(), Error> {
        self.mark_installed(identity).await
    }

    /// Page load finished; record the baseline when running standalone.
    ///
    /// Returns whether the baseline was recorded.
    pub async fn on_page_load(
        &self,
        probe: &dyn DisplayModeProbe,
        identity: &str,
    ) -> Result<bool, Error> {
        self.probe_and_mark(probe, identity).await
    }

    /// Client became visible again; same probe as page load.
    pub async fn on_visibility_regained(
        &self,
        probe: &dyn DisplayModeProbe,
        identity: &str,
    ) -> Result<bool, Error> {
        self.probe_and_mark(probe, identity).await
    }

    async fn probe_and_mark(
        &self,
        probe: &dyn DisplayModeProbe,
        identity: &str,
    ) -> Result<bool, Error> {
        if !probe.standalone() {
            return Ok(false);
        }
        self.mark_installed(identity).await?;
        Ok(true)
    }

    async fn mark_installed(&self, identity: &str) -> Result<(), Error> {
        self.store.put_meta(INSTALLED_IDENTITY_KEY, identity).await?;
        self.warning.send_replace(None);
        tracing::info!(identity = %identity, "installed identity baseline recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shltr_core::store::RequestKey;
    use shltr_core::{CacheName, StoredResponse};

    async fn tracker() -> InstallTracker {
        let store = ResponseStore::open_in_memory().await.unwrap();
        InstallTracker::new(store)
    }

    #[tokio::test]
    async fn test_page_load_standalone_records_baseline() {
        let tracker = tracker().await;
        assert_eq!(tracker.installed_identity().await.unwrap(), None);

        let recorded = tracker.on_page_load(&FixedDisplayMode(true), "My App").await.unwrap();
        assert!(recorded);
        assert_eq!(tracker.installed_identity().await.unwrap().as_deref(), Some("My App"));
    }

    #[tokio::test]
    async fn test_browser_tab_load_records_nothing() {
        let tracker = tracker().await;

        let recorded = tracker.on_page_load(&FixedDisplayMode(false), "My App").await.unwrap();
        assert!(!recorded);
        assert_eq!(tracker.installed_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_install_signal_clears_pending_warning() {
        let tracker = tracker().await;

        tracker.note_change("Renamed App");
        assert_eq!(tracker.pending_warning().as_deref(), Some("Renamed App"));

        tracker.on_app_installed("Renamed App").await.unwrap();
        assert_eq!(tracker.pending_warning(), None);
        assert_eq!(tracker.installed_identity().await.unwrap().as_deref(), Some("Renamed App"));
    }

    #[tokio::test]
    async fn test_visibility_signal_is_idempotent() {
        let tracker = tracker().await;
        let probe = FixedDisplayMode(true);

        assert!(tracker.on_visibility_regained(&probe, "My App").await.unwrap());
        assert!(tracker.on_visibility_regained(&probe, "My App").await.unwrap());
        assert_eq!(tracker.installed_identity().await.unwrap().as_deref(), Some("My App"));
    }

    #[tokio::test]
    async fn test_warning_subscription_observes_change_and_clear() {
        let tracker = tracker().await;
        let mut rx = tracker.subscribe_warnings();

        tracker.note_change("Renamed App");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_deref(), Some("Renamed App"));

        tracker.on_app_installed("Renamed App").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
    }

    #[tokio::test]
    async fn test_reinstall_overwrites_baseline() {
        let tracker = tracker().await;
        tracker.on_app_installed("My App").await.unwrap();
        tracker.on_app_installed("Renamed App").await.unwrap();
        assert_eq!(tracker.installed_identity().await.unwrap().as_deref(), Some("Renamed App"));
    }

    #[tokio::test]
    async fn test_baseline_outlives_tracker_instance() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        let first = InstallTracker::new(store.clone());
        first.on_app_installed("My App").await.unwrap();
        drop(first);

        // The baseline is store meta, not tracker state; the warning is not.
        let second = InstallTracker::new(store);
        assert_eq!(second.installed_identity().await.unwrap().as_deref(), Some("My App"));
        assert_eq!(second.pending_warning(), None);
    }

    #[tokio::test]
    async fn test_baseline_survives_cache_name_bump() {
        let store = ResponseStore::open_in_memory().await.unwrap();
        let tracker = InstallTracker::new(store.clone());
        tracker.on_app_installed("My App").await.unwrap();

        // A new cache generation fills next to the old one.
        let key = RequestKey::get("https://app.example/shell.js").unwrap();
        let entry = StoredResponse {
            method: key.method().to_string(),
            url: key.url().to_string(),
            status: 200,
            content_type: Some("text/javascript".to_string()),
            headers_json: None,
            body: b"console.log(1)".to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        store.put(&CacheName::new("app-shell-v1"), &key, &entry).await.unwrap();
        store.put(&CacheName::new("app-shell-v2"), &key, &entry).await.unwrap();
        assert_eq!(store.entry_count(&CacheName::new("app-shell-v2")).await.unwrap(), 1);

        // The baseline read is not scoped by either generation.
        assert_eq!(tracker.installed_identity().await.unwrap().as_deref(), Some("My App"));
    }
}
