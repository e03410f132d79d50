use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::actions::{ActionOutcome, ActionQueue};
use crate::config::CoreConfig;
use crate::error::FeedError;
use crate::events::{EventSink, FeedEvent, Notice};
use crate::models::Identity;
use crate::remote::{FeedStoreAdapter, LedgerTransport};
use crate::session::{SessionManager, SessionState, WalletProvider};
use crate::stats::{SharedSyncStats, SyncStats};
use crate::store::{MergeReport, Projection, Reconciler};

/// Composition root: session, reconciler and action queue behind one handle.
///
/// Everything here is memory-only and starts empty; `start` is the only
/// continuity mechanism and relies on the wallet's own remembered trust.
pub struct FeedRuntime {
    session: SessionManager,
    reconciler: Arc<Mutex<Reconciler>>,
    actions: ActionQueue,
    draft: Mutex<String>,
    events: EventSink,
    event_rx: Mutex<Option<UnboundedReceiver<FeedEvent>>>,
    stats: SharedSyncStats,
}

impl FeedRuntime {
    pub fn new(
        config: CoreConfig,
        wallet: Arc<dyn WalletProvider>,
        transport: Arc<dyn LedgerTransport>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let events = EventSink::new(event_tx);
        let stats = SharedSyncStats::new();
        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let actions = ActionQueue::new(
            FeedStoreAdapter::new(transport, config.target),
            reconciler.clone(),
            stats.clone(),
            events.clone(),
        );

        Self {
            session: SessionManager::new(wallet),
            reconciler,
            actions,
            draft: Mutex::new(String::new()),
            events,
            event_rx: Mutex::new(Some(event_rx)),
            stats,
        }
    }

    /// Take the event receiver. Returns `None` after the first call.
    pub fn take_event_rx(&self) -> Option<UnboundedReceiver<FeedEvent>> {
        self.event_rx.lock().take()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    pub fn actions(&self) -> &ActionQueue {
        &self.actions
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.snapshot()
    }

    pub fn projection(&self) -> Projection {
        let viewer = self.session.identity();
        self.reconciler.lock().project(viewer.as_ref())
    }

    fn require_identity(&self) -> Result<Identity, FeedError> {
        self.session.identity().ok_or(FeedError::NotConnected)
    }

    fn guarded<T>(&self, result: Result<T, FeedError>) -> Result<T, FeedError> {
        if let Err(e) = &result {
            self.events.error(e);
        }
        result
    }

    fn session_changed(&self) {
        self.events.send(FeedEvent::SessionChanged(self.session.state()));
    }

    /// Application startup: silent session restore, then the initial fetch.
    pub async fn start(&self) -> Option<Identity> {
        let restored = self.session.try_restore_session().await;
        self.session_changed();
        match &restored {
            Some(identity) => self.initial_fetch(identity).await,
            None => self
                .events
                .notice(Notice::info("Connect a wallet to see the feed")),
        }
        restored
    }

    /// Prompt the wallet, then fetch the feed for the new identity.
    pub async fn connect(&self) -> Result<Identity, FeedError> {
        let result = self.session.connect().await;
        self.session_changed();
        let identity = self.guarded(result)?;
        self.initial_fetch(&identity).await;
        Ok(identity)
    }

    /// A failed first fetch does not fail the session: the error already went
    /// out as a notice and the account stays `Unknown` until a refresh works.
    async fn initial_fetch(&self, identity: &Identity) {
        if let Err(e) = self.actions.refresh(identity).await {
            tracing::debug!("initial fetch failed: {}", e);
        }
    }

    /// End the session and drop all memory-only feed state.
    pub fn disconnect(&self) {
        self.session.disconnect();
        self.reconciler.lock().reset();
        self.draft.lock().clear();
        self.session_changed();
        self.events.projection_changed();
    }

    pub async fn refresh(&self) -> Result<MergeReport, FeedError> {
        let identity = self.guarded(self.require_identity())?;
        self.actions.refresh(&identity).await
    }

    pub async fn like(&self, link: &str) -> Result<ActionOutcome, FeedError> {
        let identity = self.guarded(self.require_identity())?;
        self.actions.like(&identity, link).await
    }

    pub async fn unlike(&self, link: &str) -> Result<ActionOutcome, FeedError> {
        let identity = self.guarded(self.require_identity())?;
        self.actions.unlike(&identity, link).await
    }

    pub async fn toggle_like(&self, link: &str) -> Result<ActionOutcome, FeedError> {
        let identity = self.guarded(self.require_identity())?;
        self.actions.toggle_like(&identity, link).await
    }

    pub async fn add_item(&self, link: &str) -> Result<ActionOutcome, FeedError> {
        let identity = self.guarded(self.require_identity())?;
        self.actions.add_item(&identity, link).await
    }

    pub async fn initialize_account(&self) -> Result<ActionOutcome, FeedError> {
        let identity = self.guarded(self.require_identity())?;
        self.actions.initialize_account(&identity).await
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        *self.draft.lock() = text.into();
    }

    pub fn draft(&self) -> String {
        self.draft.lock().clone()
    }

    /// Submit the composer draft. The draft is cleared only once the ledger
    /// accepted the submission, and only if it was not edited meanwhile.
    pub async fn submit_draft(&self) -> Result<ActionOutcome, FeedError> {
        let submitted = self.draft();
        let outcome = self.add_item(&submitted).await?;

        let mut draft = self.draft.lock();
        if *draft == submitted {
            draft.clear();
        }
        Ok(outcome)
    }
}
