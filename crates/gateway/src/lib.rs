//! Gateway logic for shltr.
//!
//! This crate provides:
//! - The request interception pipeline and its lifecycle state machine
//! - Identity change detection against the cached descriptor
//! - Ephemeral descriptor publishing and install-state tracking

pub mod detector;
pub mod install;
pub mod lifecycle;
pub mod pipeline;
pub mod publisher;

pub use detector::{IdentityCheck, IdentityDetector};
pub use install::{DisplayModeProbe, FixedDisplayMode, InstallTracker};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use pipeline::{FillStrategy, Pipeline, Served, ServedFrom};
pub use publisher::{ManifestPublisher, ManifestRef};
