use std::sync::Arc;

use parking_lot::Mutex;

use super::{ActionKey, ActionOutcome, InFlightGuard, InFlightSet};
use crate::error::FeedError;
use crate::events::EventSink;
use crate::models::{Identity, LikeDelta};
use crate::remote::FeedStoreAdapter;
use crate::stats::SharedSyncStats;
use crate::store::{AccountState, MergeReport, Reconciler};

/// Runs user mutations against the ledger with the optimistic
/// apply-then-confirm protocol. The only caller of the store adapter.
///
/// No automatic retries anywhere: a failed like/unlike is rolled back and the
/// user has to issue it again.
pub struct ActionQueue {
    adapter: FeedStoreAdapter,
    reconciler: Arc<Mutex<Reconciler>>,
    in_flight: InFlightSet,
    stats: SharedSyncStats,
    events: EventSink,
}

fn ensure_ready(state: AccountState) -> Result<(), FeedError> {
    match state {
        AccountState::Ready => Ok(()),
        AccountState::Unknown | AccountState::NotInitialized => {
            Err(FeedError::AccountUninitialized)
        }
    }
}

impl ActionQueue {
    pub fn new(
        adapter: FeedStoreAdapter,
        reconciler: Arc<Mutex<Reconciler>>,
        stats: SharedSyncStats,
        events: EventSink,
    ) -> Self {
        Self {
            adapter,
            reconciler,
            in_flight: InFlightSet::new(),
            stats,
            events,
        }
    }

    pub fn adapter(&self) -> &FeedStoreAdapter {
        &self.adapter
    }

    pub fn is_in_flight(&self, key: &ActionKey) -> bool {
        self.in_flight.contains(key)
    }

    fn surface<T>(&self, result: Result<T, FeedError>) -> Result<T, FeedError> {
        if let Err(e) = &result {
            self.events.error(e);
        }
        result
    }

    fn acquire(&self, key: ActionKey) -> Result<InFlightGuard, FeedError> {
        self.in_flight.try_acquire(key).map_err(|key| {
            tracing::debug!(%key, "rejected, already in flight");
            self.stats.record_rejected();
            FeedError::ConcurrentActionRejected { key }
        })
    }

    /// Fetch the account and merge it into the reconciler.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self, identity: &Identity) -> Result<MergeReport, FeedError> {
        let epoch = self.epoch();
        let result = self.fetch_and_merge(identity, epoch).await;
        self.surface(result.map(Option::unwrap_or_default))
    }

    fn epoch(&self) -> u64 {
        self.reconciler.lock().epoch()
    }

    /// `None` when the reconciler was reset after `epoch` was taken; the
    /// fetch is then skipped or its result discarded.
    async fn fetch_and_merge(
        &self,
        identity: &Identity,
        epoch: u64,
    ) -> Result<Option<MergeReport>, FeedError> {
        if self.epoch() != epoch {
            return Ok(None);
        }
        let outcome = match self.adapter.fetch_account(identity).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.record_fetch(false, 0);
                return Err(e);
            }
        };

        let merged = self.reconciler.lock().apply_fetch_for(epoch, outcome.into());
        let Some(report) = merged else {
            tracing::debug!("discarding fetch issued before session reset");
            return Ok(None);
        };

        tracing::debug!(
            cleared = report.cleared,
            retained = report.retained,
            "fetch merged"
        );
        self.stats.record_fetch(true, report.cleared);
        self.events.projection_changed();
        Ok(Some(report))
    }

    /// Follow-up fetch after a confirmed mutation. A failure here does not
    /// undo the mutation; it is reported and the old snapshot kept.
    ///
    /// Nothing is fetched if the session was reset while the mutation ran.
    async fn refresh_after(&self, identity: &Identity, epoch: u64) -> bool {
        match self.fetch_and_merge(identity, epoch).await {
            Ok(merged) => merged.is_some(),
            Err(e) => {
                self.events.error(&e);
                false
            }
        }
    }

    pub async fn like(&self, identity: &Identity, link: &str) -> Result<ActionOutcome, FeedError> {
        let result = self.set_like(identity, link, LikeDelta::Add).await;
        self.surface(result)
    }

    pub async fn unlike(
        &self,
        identity: &Identity,
        link: &str,
    ) -> Result<ActionOutcome, FeedError> {
        let result = self.set_like(identity, link, LikeDelta::Remove).await;
        self.surface(result)
    }

    /// Like if the projection shows not-liked, unlike otherwise.
    pub async fn toggle_like(
        &self,
        identity: &Identity,
        link: &str,
    ) -> Result<ActionOutcome, FeedError> {
        let liked = self.reconciler.lock().affinity(Some(identity), link);
        let result = self
            .set_like(identity, link, LikeDelta::toward(!liked))
            .await;
        self.surface(result)
    }

    async fn set_like(
        &self,
        identity: &Identity,
        link: &str,
        delta: LikeDelta,
    ) -> Result<ActionOutcome, FeedError> {
        let guard = self.acquire(ActionKey::LikeToggle(link.to_string()))?;

        let epoch = {
            let mut reconciler = self.reconciler.lock();
            ensure_ready(reconciler.account_state())?;
            if !reconciler.has_item(link) {
                return Err(FeedError::UnknownItem {
                    link: link.to_string(),
                });
            }
            if reconciler.affinity(Some(identity), link) == delta.liked() {
                return Ok(ActionOutcome::Unchanged);
            }
            reconciler.begin_like(link, delta);
            reconciler.epoch()
        };
        self.events.projection_changed();

        let result = self.adapter.submit_like_delta(identity, link, delta).await;
        match result {
            Ok(receipt) => {
                let current = {
                    let mut reconciler = self.reconciler.lock();
                    reconciler.epoch() == epoch && reconciler.settle_like(link)
                };
                drop(guard);
                self.stats.record_confirmed();
                if !current {
                    tracing::debug!(link, "session reset while like was in flight");
                }

                let refreshed = self.refresh_after(identity, epoch).await;
                Ok(ActionOutcome::Confirmed {
                    signature: receipt.signature,
                    refreshed,
                })
            }
            Err(e) => {
                let rolled_back = {
                    let mut reconciler = self.reconciler.lock();
                    reconciler.epoch() == epoch && reconciler.rollback_like(link)
                };
                drop(guard);
                if rolled_back {
                    self.stats.record_rollback();
                    tracing::warn!(link, delta = delta.as_i8(), "like rolled back: {}", e);
                    self.events.projection_changed();
                }
                Err(e)
            }
        }
    }

    /// Current epoch, if the account is ready for mutations.
    fn ready_epoch(&self) -> Result<u64, FeedError> {
        let reconciler = self.reconciler.lock();
        ensure_ready(reconciler.account_state())?;
        Ok(reconciler.epoch())
    }

    /// Submit a new link. Nothing is inserted locally; the item appears once
    /// the follow-up fetch returns it.
    pub async fn add_item(
        &self,
        identity: &Identity,
        link: &str,
    ) -> Result<ActionOutcome, FeedError> {
        let result = self.submit_item(identity, link).await;
        self.surface(result)
    }

    async fn submit_item(
        &self,
        identity: &Identity,
        link: &str,
    ) -> Result<ActionOutcome, FeedError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(FeedError::EmptyLink);
        }
        let guard = self.acquire(ActionKey::AddItem(link.to_string()))?;
        let epoch = self.ready_epoch()?;

        let receipt = self.adapter.submit_add_item(identity, link).await?;
        drop(guard);
        self.stats.record_confirmed();

        let refreshed = self.refresh_after(identity, epoch).await;
        Ok(ActionOutcome::Confirmed {
            signature: receipt.signature,
            refreshed,
        })
    }

    /// One-time creation of the feed account.
    pub async fn initialize_account(
        &self,
        identity: &Identity,
    ) -> Result<ActionOutcome, FeedError> {
        let result = self.bootstrap(identity).await;
        self.surface(result)
    }

    async fn bootstrap(&self, identity: &Identity) -> Result<ActionOutcome, FeedError> {
        let guard = self.acquire(ActionKey::InitializeAccount)?;
        let epoch = {
            let reconciler = self.reconciler.lock();
            if reconciler.account_state() == AccountState::Ready {
                return Ok(ActionOutcome::Unchanged);
            }
            reconciler.epoch()
        };

        let receipt = self.adapter.initialize_account(identity).await?;
        drop(guard);
        self.stats.record_confirmed();
        tracing::info!(identity = identity.short(), "feed account initialized");

        let refreshed = self.refresh_after(identity, epoch).await;
        Ok(ActionOutcome::Confirmed {
            signature: receipt.signature,
            refreshed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedTarget;
    use crate::events::FeedEvent;
    use crate::models::{FeedAccount, FeedItem};
    use crate::remote::MemoryLedger;

    fn id(s: &str) -> Identity {
        Identity::parse(s).unwrap()
    }

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        queue: ActionQueue,
        reconciler: Arc<Mutex<Reconciler>>,
        events: tokio::sync::mpsc::UnboundedReceiver<FeedEvent>,
        me: Identity,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        let target = FeedTarget::default();
        let mut item = FeedItem::new("x", id("A"));
        item.like_count = 3;
        ledger.seed_account(
            &target,
            FeedAccount {
                total_items: 1,
                items: vec![item],
            },
        );

        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let queue = ActionQueue::new(
            FeedStoreAdapter::new(ledger.clone(), target),
            reconciler.clone(),
            SharedSyncStats::new(),
            EventSink::new(tx),
        );
        Fixture {
            ledger,
            queue,
            reconciler,
            events: rx,
            me: id("me"),
        }
    }

    #[tokio::test]
    async fn test_like_confirms_and_refreshes() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();

        let outcome = f.queue.like(&f.me, "x").await.unwrap();
        assert!(matches!(
            outcome,
            ActionOutcome::Confirmed {
                refreshed: true,
                ..
            }
        ));

        let rec = f.reconciler.lock();
        assert!(rec.overlay().is_empty());
        let item = rec.project(Some(&f.me)).items.remove(0);
        assert_eq!(item.like_count, 4);
        assert!(item.liked);
    }

    #[tokio::test]
    async fn test_failed_like_rolls_back_and_notifies() {
        let mut f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        f.ledger.fail_next_instruction("simulated outage");

        let err = f.queue.like(&f.me, "x").await.unwrap_err();
        assert!(matches!(err, FeedError::RemoteCallFailed { .. }));
        assert!(f.reconciler.lock().overlay().is_empty());
        assert!(!f.queue.is_in_flight(&ActionKey::LikeToggle("x".to_string())));

        let mut saw_notice = false;
        while let Ok(event) = f.events.try_recv() {
            if let FeedEvent::Notice(notice) = event {
                saw_notice |= notice.message.contains("simulated outage");
            }
        }
        assert!(saw_notice);
    }

    #[tokio::test]
    async fn test_like_when_already_liked_is_unchanged() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        f.queue.like(&f.me, "x").await.unwrap();
        let calls = f.ledger.instruction_calls();

        assert_eq!(
            f.queue.like(&f.me, "x").await.unwrap(),
            ActionOutcome::Unchanged
        );
        assert_eq!(f.ledger.instruction_calls(), calls);
    }

    #[tokio::test]
    async fn test_toggle_flips_affinity() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();

        f.queue.toggle_like(&f.me, "x").await.unwrap();
        assert!(f.reconciler.lock().affinity(Some(&f.me), "x"));
        f.queue.toggle_like(&f.me, "x").await.unwrap();
        assert!(!f.reconciler.lock().affinity(Some(&f.me), "x"));
        let account = f.ledger.account(f.queue.adapter().target()).unwrap();
        assert_eq!(account.items[0].like_count, 3);
    }

    #[tokio::test]
    async fn test_unknown_link_is_rejected_locally() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        let err = f.queue.like(&f.me, "missing").await.unwrap_err();
        assert_eq!(
            err,
            FeedError::UnknownItem {
                link: "missing".to_string()
            }
        );
        assert_eq!(f.ledger.instruction_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_item_trims_and_refreshes() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();

        f.queue.add_item(&f.me, "  https://y  ").await.unwrap();
        let projection = f.reconciler.lock().project(Some(&f.me));
        assert_eq!(projection.items.len(), 2);
        assert_eq!(projection.items[1].link, "https://y");
        assert_eq!(projection.total_items, 2);
    }

    #[tokio::test]
    async fn test_empty_link_rejected() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        assert_eq!(
            f.queue.add_item(&f.me, "   ").await.unwrap_err(),
            FeedError::EmptyLink
        );
        assert_eq!(f.ledger.instruction_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        let before = f.reconciler.lock().project(Some(&f.me));

        f.ledger.fail_next_fetch("rpc down");
        assert!(f.queue.refresh(&f.me).await.is_err());
        assert_eq!(f.reconciler.lock().project(Some(&f.me)), before);
    }

    #[tokio::test]
    async fn test_confirmed_mutation_with_failed_refresh() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        f.ledger.fail_next_fetch("rpc down");

        let outcome = f.queue.like(&f.me, "x").await.unwrap();
        assert!(matches!(
            outcome,
            ActionOutcome::Confirmed {
                refreshed: false,
                ..
            }
        ));
        // Settled entry stays until a fetch succeeds
        let rec = f.reconciler.lock();
        assert_eq!(rec.overlay().len(), 1);
        assert!(rec.affinity(Some(&f.me), "x"));
    }

    #[tokio::test]
    async fn test_initialize_when_ready_is_unchanged() {
        let f = fixture();
        f.queue.refresh(&f.me).await.unwrap();
        assert_eq!(
            f.queue.initialize_account(&f.me).await.unwrap(),
            ActionOutcome::Unchanged
        );
        assert_eq!(f.ledger.instruction_calls(), 0);
    }
}
