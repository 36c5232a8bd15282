//! Authenticated owner identity.
//!
//! The owner is an observable value: `None` is the signed-out steady state,
//! not an error. Collection stores subscribe and clear their records whenever
//! the value changes, so nothing from a previous owner stays visible.

use tokio::sync::watch;

use crate::store::OwnerId;

/// Holds the current owner identity and notifies subscribers of changes.
#[derive(Debug)]
pub struct AuthSession {
    tx: watch::Sender<Option<OwnerId>>,
}

impl AuthSession {
    /// Starts signed out.
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// Starts with `owner` already signed in.
    pub fn signed_in(owner: OwnerId) -> Self {
        Self {
            tx: watch::Sender::new(Some(owner)),
        }
    }

    /// The current owner, if any.
    pub fn current(&self) -> Option<OwnerId> {
        self.tx.borrow().clone()
    }

    pub fn sign_in(&self, owner: OwnerId) {
        self.tx.send_replace(Some(owner));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Subscription handed to collection stores and trackers.
    pub fn subscribe(&self) -> watch::Receiver<Option<OwnerId>> {
        self.tx.subscribe()
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
