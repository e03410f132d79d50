use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::{Instruction, LedgerFuture, LedgerTransport, TransportError, TxReceipt};
use crate::config::FeedTarget;
use crate::models::{FeedAccount, FeedItem, Identity};

/// Serializable copy of every account held by a `MemoryLedger`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Keyed by `<program_id>/<feed_account>`
    pub accounts: BTreeMap<String, FeedAccount>,
}

/// Holds calls at an await point while closed.
#[derive(Debug)]
struct Gate {
    closed: watch::Sender<bool>,
    waiting: AtomicUsize,
}

impl Gate {
    fn new() -> Self {
        Self {
            closed: watch::Sender::new(false),
            waiting: AtomicUsize::new(0),
        }
    }

    fn set_closed(&self, closed: bool) {
        self.closed.send_replace(closed);
    }

    async fn pass(&self) {
        let mut rx = self.closed.subscribe();
        if !*rx.borrow_and_update() {
            return;
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-process ledger implementing the feed program rules.
///
/// Besides backing the ledger server, it lets tests add latency, script
/// failures, and hold calls in flight.
#[derive(Debug)]
pub struct MemoryLedger {
    accounts: Mutex<BTreeMap<String, FeedAccount>>,
    latency: Mutex<Duration>,
    failing_fetches: Mutex<VecDeque<String>>,
    failing_instructions: Mutex<VecDeque<String>>,
    fetch_gate: Gate,
    instruction_gate: Gate,
    fetch_calls: AtomicU64,
    instruction_calls: AtomicU64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn account_key(target: &FeedTarget) -> String {
    format!("{}/{}", target.program_id, target.feed_account)
}

fn rejected(msg: &str) -> TransportError {
    TransportError::Rejected(msg.to_string())
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(BTreeMap::new()),
            latency: Mutex::new(Duration::ZERO),
            failing_fetches: Mutex::new(VecDeque::new()),
            failing_instructions: Mutex::new(VecDeque::new()),
            fetch_gate: Gate::new(),
            instruction_gate: Gate::new(),
            fetch_calls: AtomicU64::new(0),
            instruction_calls: AtomicU64::new(0),
        }
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::new();
        *ledger.accounts.lock() = snapshot.accounts;
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: self.accounts.lock().clone(),
        }
    }

    /// Replace (or create) the account for `target` directly.
    pub fn seed_account(&self, target: &FeedTarget, account: FeedAccount) {
        self.accounts.lock().insert(account_key(target), account);
    }

    pub fn account(&self, target: &FeedTarget) -> Option<FeedAccount> {
        self.accounts.lock().get(&account_key(target)).cloned()
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// The next fetch fails with `message` instead of reading the account.
    pub fn fail_next_fetch(&self, message: impl Into<String>) {
        self.failing_fetches.lock().push_back(message.into());
    }

    /// The next instruction fails with `message` and changes nothing.
    pub fn fail_next_instruction(&self, message: impl Into<String>) {
        self.failing_instructions.lock().push_back(message.into());
    }

    pub fn pause_fetches(&self) {
        self.fetch_gate.set_closed(true);
    }

    pub fn resume_fetches(&self) {
        self.fetch_gate.set_closed(false);
    }

    pub fn pause_instructions(&self) {
        self.instruction_gate.set_closed(true);
    }

    pub fn resume_instructions(&self) {
        self.instruction_gate.set_closed(false);
    }

    /// Fetches currently held by `pause_fetches`.
    pub fn held_fetches(&self) -> usize {
        self.fetch_gate.waiting.load(Ordering::SeqCst)
    }

    /// Instructions currently held by `pause_instructions`.
    pub fn held_instructions(&self) -> usize {
        self.instruction_gate.waiting.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn instruction_calls(&self) -> u64 {
        self.instruction_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Apply `instruction` signed by `signer`. Either fully applies or changes nothing.
    pub fn execute(
        &self,
        target: &FeedTarget,
        signer: &Identity,
        instruction: &Instruction,
    ) -> Result<TxReceipt, TransportError> {
        let key = account_key(target);
        let mut accounts = self.accounts.lock();

        match accounts.get_mut(&key) {
            None if matches!(instruction, Instruction::Initialize) => {
                accounts.insert(key, FeedAccount::default());
            }
            None => return Err(rejected("account not initialized")),
            Some(account) => apply(account, signer, instruction)?,
        }

        Ok(new_receipt())
    }
}

fn apply(
    account: &mut FeedAccount,
    signer: &Identity,
    instruction: &Instruction,
) -> Result<(), TransportError> {
    match instruction {
        Instruction::Initialize => return Err(rejected("account already initialized")),
        Instruction::AddItem { link } => {
            let link = link.trim();
            if link.is_empty() {
                return Err(rejected("link is empty"));
            }
            if account
                .items
                .iter()
                .any(|item| item.creator == *signer && item.link == link)
            {
                return Err(rejected("link already submitted by this creator"));
            }
            account.items.push(FeedItem::new(link, signer.clone()));
            account.total_items += 1;
        }
        Instruction::AddLike { link } => {
            let item = find_item(account, link)?;
            if !item.likers.insert(signer.clone()) {
                return Err(rejected("item already liked by signer"));
            }
            item.like_count += 1;
        }
        Instruction::RemoveLike { link } => {
            let item = find_item(account, link)?;
            if !item.likers.remove(signer) {
                return Err(rejected("item not liked by signer"));
            }
            item.like_count = item.like_count.saturating_sub(1);
        }
    }
    Ok(())
}

fn find_item<'a>(
    account: &'a mut FeedAccount,
    link: &str,
) -> Result<&'a mut FeedItem, TransportError> {
    account
        .items
        .iter_mut()
        .find(|item| item.link == link)
        .ok_or_else(|| rejected("no item with that link"))
}

fn new_receipt() -> TxReceipt {
    TxReceipt {
        signature: uuid::Uuid::new_v4().simple().to_string(),
    }
}

impl LedgerTransport for MemoryLedger {
    fn fetch_account<'a>(
        &'a self,
        target: &'a FeedTarget,
        _owner: &'a Identity,
    ) -> LedgerFuture<'a, Option<FeedAccount>> {
        Box::pin(async move {
            // Read when the call arrives; latency and the gate delay the response.
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let account = self.account(target);
            self.simulate_latency().await;
            self.fetch_gate.pass().await;

            let scripted = self.failing_fetches.lock().pop_front();
            if let Some(message) = scripted {
                return Err(TransportError::Unavailable(message));
            }
            Ok(account)
        })
    }

    fn send_instruction<'a>(
        &'a self,
        target: &'a FeedTarget,
        signer: &'a Identity,
        instruction: Instruction,
    ) -> LedgerFuture<'a, TxReceipt> {
        Box::pin(async move {
            self.instruction_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_latency().await;
            self.instruction_gate.pass().await;

            let scripted = self.failing_instructions.lock().pop_front();
            if let Some(message) = scripted {
                return Err(TransportError::Unavailable(message));
            }
            self.execute(target, signer, &instruction)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::parse(s).unwrap()
    }

    fn add(link: &str) -> Instruction {
        Instruction::AddItem {
            link: link.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_missing_account() {
        let ledger = MemoryLedger::new();
        let target = FeedTarget::default();
        let account = ledger.fetch_account(&target, &id("A")).await.unwrap();
        assert!(account.is_none());
        assert_eq!(ledger.fetch_calls(), 1);
    }

    #[test]
    fn test_initialize_once() {
        let ledger = MemoryLedger::new();
        let target = FeedTarget::default();
        ledger.execute(&target, &id("A"), &Instruction::Initialize).unwrap();
        let err = ledger
            .execute(&target, &id("B"), &Instruction::Initialize)
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[test]
    fn test_mutation_requires_account() {
        let ledger = MemoryLedger::new();
        let err = ledger
            .execute(&FeedTarget::default(), &id("A"), &add("x"))
            .unwrap_err();
        assert_eq!(err.to_string(), "ledger rejected instruction: account not initialized");
    }

    #[test]
    fn test_add_item_rules() {
        let ledger = MemoryLedger::new();
        let target = FeedTarget::default();
        ledger.execute(&target, &id("A"), &Instruction::Initialize).unwrap();

        ledger.execute(&target, &id("A"), &add("x")).unwrap();
        assert!(ledger.execute(&target, &id("A"), &add("x")).is_err());
        assert!(ledger.execute(&target, &id("A"), &add("  ")).is_err());
        // Same link from a different creator is a distinct item
        ledger.execute(&target, &id("B"), &add("x")).unwrap();

        let account = ledger.account(&target).unwrap();
        assert_eq!(account.total_items, 2);
        assert_eq!(account.items.len(), 2);
    }

    #[test]
    fn test_likes_are_not_double_counted() {
        let ledger = MemoryLedger::new();
        let target = FeedTarget::default();
        ledger.execute(&target, &id("A"), &Instruction::Initialize).unwrap();
        ledger.execute(&target, &id("A"), &add("x")).unwrap();

        let like = Instruction::AddLike {
            link: "x".to_string(),
        };
        let unlike = Instruction::RemoveLike {
            link: "x".to_string(),
        };
        ledger.execute(&target, &id("B"), &like).unwrap();
        assert!(ledger.execute(&target, &id("B"), &like).is_err());
        ledger.execute(&target, &id("C"), &like).unwrap();
        assert_eq!(ledger.account(&target).unwrap().items[0].like_count, 2);

        ledger.execute(&target, &id("B"), &unlike).unwrap();
        assert!(ledger.execute(&target, &id("B"), &unlike).is_err());
        let item = &ledger.account(&target).unwrap().items[0];
        assert_eq!(item.like_count, 1);
        assert!(item.is_liked_by(&id("C")));
        assert!(!item.is_liked_by(&id("B")));
    }

    #[tokio::test]
    async fn test_scripted_failure_changes_nothing() {
        let ledger = MemoryLedger::new();
        let target = FeedTarget::default();
        ledger.fail_next_instruction("blockhash expired");
        let err = ledger
            .send_instruction(&target, &id("A"), Instruction::Initialize)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("blockhash expired"));
        assert!(ledger.account(&target).is_none());

        ledger
            .send_instruction(&target, &id("A"), Instruction::Initialize)
            .await
            .unwrap();
        assert_eq!(ledger.instruction_calls(), 2);
    }

    #[tokio::test]
    async fn test_paused_instruction_waits_for_resume() {
        let ledger = std::sync::Arc::new(MemoryLedger::new());
        let target = FeedTarget::default();
        ledger.pause_instructions();

        let task = {
            let ledger = ledger.clone();
            let target = target.clone();
            tokio::spawn(async move {
                ledger
                    .send_instruction(&target, &id("A"), Instruction::Initialize)
                    .await
            })
        };

        while ledger.held_instructions() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(ledger.account(&target).is_none());

        ledger.resume_instructions();
        task.await.unwrap().unwrap();
        assert!(ledger.account(&target).is_some());
        assert_eq!(ledger.held_instructions(), 0);
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_accounts() {
        let ledger = MemoryLedger::new();
        let target = FeedTarget::default();
        ledger.execute(&target, &id("A"), &Instruction::Initialize).unwrap();
        ledger.execute(&target, &id("A"), &add("x")).unwrap();

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let restored = MemoryLedger::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.account(&target), ledger.account(&target));
    }
}
