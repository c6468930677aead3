//! shltr gateway entry point.
//!
//! Boots the interception pipeline (install, activate), then reconciles the
//! application identity on an interval. Logging goes to stderr; identity
//! change events are emitted on stdout as JSON lines for the host.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use shltr_client::{HttpOrigin, OriginConfig};
use shltr_core::store::RequestKey;
use shltr_core::{AppConfig, Origin, ResponseStore};
use shltr_gateway::{IdentityDetector, InstallTracker, ManifestPublisher, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let base = config.require_origin()?;
    let cache = config.cache();

    tracing::info!(
        db = %config.db_path.display(),
        cache = %cache,
        origin = %base,
        "starting shltr gateway"
    );

    let store = ResponseStore::open(&config.db_path).await?;
    let origin: Arc<dyn Origin> = Arc::new(HttpOrigin::new(OriginConfig::from(&config))?);

    let pipeline = Pipeline::new(
        store.clone(),
        cache.clone(),
        Arc::clone(&origin),
        base.clone(),
        config.precache.clone(),
    );
    let report = pipeline.install().await?;
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "some precache items failed");
    }
    pipeline.activate()?;

    let entries = store.entry_count(&cache).await?;
    tracing::info!(entries, "store ready");

    let descriptor_key = RequestKey::from_path(&base, &config.descriptor_path)?;
    let detector = IdentityDetector::new(store.clone(), cache, Arc::clone(&origin), descriptor_key);
    let tracker = InstallTracker::new(store);
    let publisher = ManifestPublisher::new(base);

    if config.check_interval_secs == 0 {
        reconcile_once(&detector, &tracker, &publisher).await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.check_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = reconcile_once(&detector, &tracker, &publisher).await {
                    tracing::error!(
                        key = %detector.descriptor_key(),
                        error = %e,
                        "identity check failed"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// One reconciliation pass. On a change: warn the tracker, republish the
/// descriptor and emit the event for the host.
async fn reconcile_once(
    detector: &IdentityDetector,
    tracker: &InstallTracker,
    publisher: &ManifestPublisher,
) -> Result<()> {
    let check = detector.check_and_refresh().await?;

    if check.changed
        && let Some(identity) = check.identity.as_deref()
    {
        tracker.note_change(identity);
        let reference = publisher.publish(identity).await?;
        let installed = tracker.installed_identity().await?;

        tracing::warn!(
            previous = check.previous.as_deref().unwrap_or(""),
            identity = %identity,
            href = %reference,
            "identity changed; descriptor republished"
        );

        println!(
            "{}",
            serde_json::json!({
                "event": "identity_changed",
                "previous": check.previous,
                "identity": identity,
                "installed": installed,
                "manifest": reference.href(),
                "at": chrono::Utc::now().to_rfc3339(),
            })
        );
    }

    Ok(())
}
