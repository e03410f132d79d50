use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;

use crate::models::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet extension detected")]
    Absent,
    #[error("site was not previously trusted by the wallet")]
    NotTrusted,
    #[error("user rejected the connection request")]
    Rejected,
}

/// Browser wallet extension, as seen by the session manager.
pub trait WalletProvider: Send + Sync {
    fn detect(&self) -> bool;

    /// Connect using only trust the wallet already granted; never prompts.
    fn connect_silently(&self) -> BoxFuture<'_, Result<Identity, WalletError>>;

    /// Prompt the user for authorization.
    fn connect_interactive(&self) -> BoxFuture<'_, Result<Identity, WalletError>>;
}

/// Wallet with a fixed address, driven from configuration.
///
/// `trusted` is the wallet's own remembered approval: it starts as configured
/// and flips to true after an approved interactive connect.
#[derive(Debug)]
pub struct StaticWallet {
    identity: Option<Identity>,
    trusted: AtomicBool,
    approve_prompts: bool,
}

impl StaticWallet {
    pub fn new(identity: Identity, trusted: bool, approve_prompts: bool) -> Self {
        Self {
            identity: Some(identity),
            trusted: AtomicBool::new(trusted),
            approve_prompts,
        }
    }

    /// No extension installed.
    pub fn absent() -> Self {
        Self {
            identity: None,
            trusted: AtomicBool::new(false),
            approve_prompts: false,
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::SeqCst)
    }
}

impl WalletProvider for StaticWallet {
    fn detect(&self) -> bool {
        self.identity.is_some()
    }

    fn connect_silently(&self) -> BoxFuture<'_, Result<Identity, WalletError>> {
        Box::pin(async move {
            let identity = self.identity.clone().ok_or(WalletError::Absent)?;
            if !self.is_trusted() {
                return Err(WalletError::NotTrusted);
            }
            Ok(identity)
        })
    }

    fn connect_interactive(&self) -> BoxFuture<'_, Result<Identity, WalletError>> {
        Box::pin(async move {
            let identity = self.identity.clone().ok_or(WalletError::Absent)?;
            if !self.approve_prompts {
                return Err(WalletError::Rejected);
            }
            self.trusted.store(true, Ordering::SeqCst);
            Ok(identity)
        })
    }
}
