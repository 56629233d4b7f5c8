//! Auth state - sign-in/sign-out published to subscribers

use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::{AUTH_TOKEN_KEY, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn,
}

/// Shared handle; clones publish to the same subscribers
#[derive(Clone)]
pub struct AuthWatch {
    tx: watch::Sender<AuthState>,
}

impl Default for AuthWatch {
    fn default() -> Self {
        Self::new(AuthState::SignedOut)
    }
}

impl AuthWatch {
    pub fn new(initial: AuthState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Signed in when a token is stored
    pub fn from_store(store: &dyn KeyValueStore) -> Self {
        let state = match store.get_item(AUTH_TOKEN_KEY) {
            Ok(Some(_)) => AuthState::SignedIn,
            Ok(None) => AuthState::SignedOut,
            Err(e) => {
                warn!("Failed to read auth token: {}", e);
                AuthState::SignedOut
            }
        };
        Self::new(state)
    }

    pub fn state(&self) -> AuthState {
        *self.tx.borrow()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state() == AuthState::SignedIn
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self) {
        self.publish(AuthState::SignedIn);
    }

    pub fn sign_out(&self) {
        self.publish(AuthState::SignedOut);
    }

    /// Subscribers only wake on an actual change
    fn publish(&self, state: AuthState) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            info!("Auth state changed: {:?}", state);
        }
    }
}
