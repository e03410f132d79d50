pub mod wallet;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::FeedError;
use crate::models::Identity;

pub use wallet::{StaticWallet, WalletError, WalletProvider};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "identity", rename_all = "lowercase")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Connected(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Tracks wallet authentication. The only writer of `SessionState`.
pub struct SessionManager {
    wallet: Arc<dyn WalletProvider>,
    state: RwLock<SessionState>,
}

enum Attempt {
    Start,
    AlreadyConnected(Identity),
    Busy,
}

impl SessionManager {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self {
            wallet,
            state: RwLock::new(SessionState::Disconnected),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.read().identity().cloned()
    }

    fn begin_attempt(&self) -> Attempt {
        let mut state = self.state.write();
        match &*state {
            SessionState::Connected(identity) => Attempt::AlreadyConnected(identity.clone()),
            SessionState::Connecting => Attempt::Busy,
            SessionState::Disconnected => {
                *state = SessionState::Connecting;
                Attempt::Start
            }
        }
    }

    fn finish_attempt(&self, result: Option<Identity>) -> SessionState {
        let next = match result {
            Some(identity) => SessionState::Connected(identity),
            None => SessionState::Disconnected,
        };
        *self.state.write() = next.clone();
        next
    }

    /// Silent reconnect using the wallet's remembered trust. Failure is normal
    /// (first visit, no extension) and leaves the session disconnected.
    pub async fn try_restore_session(&self) -> Option<Identity> {
        match self.begin_attempt() {
            Attempt::AlreadyConnected(identity) => return Some(identity),
            Attempt::Busy => return None,
            Attempt::Start => {}
        }

        let result = if self.wallet.detect() {
            self.wallet.connect_silently().await
        } else {
            Err(WalletError::Absent)
        };

        match result {
            Ok(identity) => {
                tracing::info!(identity = identity.short(), "session restored");
                self.finish_attempt(Some(identity.clone()));
                Some(identity)
            }
            Err(e) => {
                tracing::info!("no session to restore: {}", e);
                self.finish_attempt(None);
                None
            }
        }
    }

    /// Prompt the wallet for authorization. Never retried automatically.
    pub async fn connect(&self) -> Result<Identity, FeedError> {
        match self.begin_attempt() {
            Attempt::AlreadyConnected(identity) => return Ok(identity),
            Attempt::Busy => return Err(FeedError::ConnectInProgress),
            Attempt::Start => {}
        }

        let result = if self.wallet.detect() {
            self.wallet.connect_interactive().await
        } else {
            Err(WalletError::Absent)
        };

        match result {
            Ok(identity) => {
                tracing::info!(identity = identity.short(), "wallet connected");
                self.finish_attempt(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!("wallet connect refused: {}", e);
                self.finish_attempt(None);
                Err(FeedError::AuthRefused {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Returns false if there was no session to end.
    pub fn disconnect(&self) -> bool {
        let mut state = self.state.write();
        let was_connected = matches!(*state, SessionState::Connected(_));
        *state = SessionState::Disconnected;
        if was_connected {
            tracing::info!("wallet disconnected");
        }
        was_connected
    }
}
