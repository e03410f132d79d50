use std::sync::Arc;

use super::{Instruction, LedgerTransport, TxReceipt};
use crate::config::FeedTarget;
use crate::error::FeedError;
use crate::models::{FetchOutcome, Identity, LikeDelta};

/// Typed wrapper over the ledger transport.
///
/// Every method is a single round trip with no retry; retry policy (there is
/// none) belongs to the action queue.
pub struct FeedStoreAdapter {
    transport: Arc<dyn LedgerTransport>,
    target: FeedTarget,
}

impl FeedStoreAdapter {
    pub fn new(transport: Arc<dyn LedgerTransport>, target: FeedTarget) -> Self {
        Self { transport, target }
    }

    pub fn target(&self) -> &FeedTarget {
        &self.target
    }

    pub async fn fetch_account(&self, identity: &Identity) -> Result<FetchOutcome, FeedError> {
        tracing::debug!(
            account = %self.target.feed_account,
            identity = identity.short(),
            "fetching feed account"
        );
        match self.transport.fetch_account(&self.target, identity).await {
            Ok(Some(account)) => Ok(FetchOutcome::Account(account)),
            Ok(None) => Ok(FetchOutcome::NotInitialized),
            Err(e) => {
                tracing::warn!("fetch_account failed: {}", e);
                Err(FeedError::remote("fetch_account", e))
            }
        }
    }

    pub async fn initialize_account(&self, identity: &Identity) -> Result<TxReceipt, FeedError> {
        self.submit("initialize_account", identity, Instruction::Initialize)
            .await
    }

    pub async fn submit_add_item(
        &self,
        identity: &Identity,
        link: &str,
    ) -> Result<TxReceipt, FeedError> {
        let instruction = Instruction::AddItem {
            link: link.to_string(),
        };
        self.submit("submit_add_item", identity, instruction).await
    }

    pub async fn submit_like_delta(
        &self,
        identity: &Identity,
        link: &str,
        delta: LikeDelta,
    ) -> Result<TxReceipt, FeedError> {
        let link = link.to_string();
        let instruction = match delta {
            LikeDelta::Add => Instruction::AddLike { link },
            LikeDelta::Remove => Instruction::RemoveLike { link },
        };
        self.submit("submit_like_delta", identity, instruction).await
    }

    async fn submit(
        &self,
        operation: &'static str,
        identity: &Identity,
        instruction: Instruction,
    ) -> Result<TxReceipt, FeedError> {
        tracing::debug!(
            instruction = instruction.name(),
            signer = identity.short(),
            "sending instruction"
        );
        self.transport
            .send_instruction(&self.target, identity, instruction)
            .await
            .map_err(|e| {
                tracing::warn!("{} failed: {}", operation, e);
                FeedError::remote(operation, e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryLedger;

    fn setup() -> (Arc<MemoryLedger>, FeedStoreAdapter, Identity) {
        let ledger = Arc::new(MemoryLedger::new());
        let adapter = FeedStoreAdapter::new(ledger.clone(), FeedTarget::default());
        (ledger, adapter, Identity::parse("A").unwrap())
    }

    #[tokio::test]
    async fn test_fetch_maps_missing_account() {
        let (_, adapter, me) = setup();
        assert_eq!(
            adapter.fetch_account(&me).await.unwrap(),
            FetchOutcome::NotInitialized
        );
    }

    #[tokio::test]
    async fn test_like_delta_maps_to_instructions() {
        let (ledger, adapter, me) = setup();
        adapter.initialize_account(&me).await.unwrap();
        adapter.submit_add_item(&me, "x").await.unwrap();

        adapter
            .submit_like_delta(&me, "x", LikeDelta::Add)
            .await
            .unwrap();
        let account = ledger.account(adapter.target()).unwrap();
        assert_eq!(account.items[0].like_count, 1);

        adapter
            .submit_like_delta(&me, "x", LikeDelta::Remove)
            .await
            .unwrap();
        let account = ledger.account(adapter.target()).unwrap();
        assert_eq!(account.items[0].like_count, 0);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_remote_call_failed() {
        let (ledger, adapter, me) = setup();
        ledger.fail_next_fetch("node is behind");
        let err = adapter.fetch_account(&me).await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::RemoteCallFailed {
                operation: "fetch_account",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_target_is_injected() {
        let ledger = Arc::new(MemoryLedger::new());
        let me = Identity::parse("A").unwrap();
        let a = FeedStoreAdapter::new(ledger.clone(), FeedTarget::new("p", "mem", "feed-a"));
        let b = FeedStoreAdapter::new(ledger.clone(), FeedTarget::new("p", "mem", "feed-b"));

        a.initialize_account(&me).await.unwrap();
        assert!(matches!(
            a.fetch_account(&me).await.unwrap(),
            FetchOutcome::Account(_)
        ));
        assert_eq!(
            b.fetch_account(&me).await.unwrap(),
            FetchOutcome::NotInitialized
        );
    }
}
