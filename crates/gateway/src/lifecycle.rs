//! Pipeline lifecycle state machine.
//!
//! A deployed version moves strictly `Uninitialized -> Installing ->
//! Activating -> Serving`. Out-of-order transitions are rejected as
//! errors, and subscribers observe each change on the same receiver
//! without re-subscribing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use shltr_core::Error;

/// Pipeline lifecycle states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Installing,
    Activating,
    Serving,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Installing => "installing",
            Self::Activating => "activating",
            Self::Serving => "serving",
        };
        f.write_str(s)
    }
}

/// Shared handle onto one version's lifecycle.
///
/// Clones drive and observe the same state machine. State is published
/// through a watch channel, so a subscriber that was handed a receiver
/// before `claim` still sees the transition to `Serving`.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Uninitialized);
        Self { tx: Arc::new(tx) }
    }

    /// The state right now.
    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// `Uninitialized -> Installing`, entered when precaching starts.
    pub fn begin_install(&self) -> Result<(), Error> {
        self.advance(LifecycleState::Uninitialized, LifecycleState::Installing)
    }

    /// `Installing -> Activating`. The version is immediately eligible to
    /// supersede its predecessor; there is no waiting state.
    pub fn finish_install(&self) -> Result<(), Error> {
        self.advance(LifecycleState::Installing, LifecycleState::Activating)
    }

    /// `Activating -> Serving`. Every live subscriber observes this.
    pub fn claim(&self) -> Result<(), Error> {
        self.advance(LifecycleState::Activating, LifecycleState::Serving)
    }

    /// Guard for request handling.
    pub fn require_serving(&self) -> Result<(), Error> {
        let current = self.current();
        if current == LifecycleState::Serving {
            Ok(())
        } else {
            Err(Error::NotServing(current.to_string()))
        }
    }

    // Checks and swaps under the channel lock so two racing callers cannot
    // both pass the same transition.
    fn advance(&self, from: LifecycleState, to: LifecycleState) -> Result<(), Error> {
        let mut result = Ok(());
        self.tx.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                result =
                    Err(Error::InvalidTransition(format!("{state} -> {to} (requires {from})")));
                false
            }
        });
        if result.is_ok() {
            tracing::debug!(%from, %to, "lifecycle transition");
        }
        result
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_transition_order() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current(), LifecycleState::Uninitialized);

        lifecycle.begin_install().unwrap();
        assert_eq!(lifecycle.current(), LifecycleState::Installing);

        lifecycle.finish_install().unwrap();
        assert_eq!(lifecycle.current(), LifecycleState::Activating);

        lifecycle.claim().unwrap();
        assert_eq!(lifecycle.current(), LifecycleState::Serving);
    }

    #[test]
    fn test_claim_before_install_rejected() {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.claim();
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
        assert_eq!(lifecycle.current(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_double_install_rejected() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_install().unwrap();
        assert!(lifecycle.begin_install().is_err());
    }

    #[test]
    fn test_require_serving() {
        let lifecycle = Lifecycle::new();
        let result = lifecycle.require_serving();
        assert!(matches!(result, Err(Error::NotServing(s)) if s == "uninitialized"));

        lifecycle.begin_install().unwrap();
        lifecycle.finish_install().unwrap();
        lifecycle.claim().unwrap();
        assert!(lifecycle.require_serving().is_ok());
    }

    #[tokio::test]
    async fn test_subscriber_observes_claim_without_resubscribing() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.subscribe();

        lifecycle.begin_install().unwrap();
        lifecycle.finish_install().unwrap();
        lifecycle.claim().unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), LifecycleState::Serving);
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&LifecycleState::Serving).unwrap();
        assert_eq!(json, "\"serving\"");
    }
}
