use super::views::{self, AccountState, Projection};
use super::PendingOverlay;
use crate::models::{CanonicalFeedState, Identity, LikeDelta};

/// Outcome of merging a fetch into the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Settled overlay entries the fetch made authoritative
    pub cleared: usize,
    /// In-flight entries left untouched
    pub retained: usize,
}

/// Owns canonical state and the pending overlay.
///
/// Canonical state is only ever replaced as a whole by `apply_fetch`; a failed
/// fetch simply never reaches here, so the previous snapshot stays intact.
#[derive(Debug, Default)]
pub struct Reconciler {
    canonical: Option<CanonicalFeedState>,
    overlay: PendingOverlay,
    /// Bumped by `reset`; fetches issued under an older epoch are discarded
    epoch: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical(&self) -> Option<&CanonicalFeedState> {
        self.canonical.as_ref()
    }

    pub fn overlay(&self) -> &PendingOverlay {
        &self.overlay
    }

    pub fn account_state(&self) -> AccountState {
        views::account_state(self.canonical.as_ref())
    }

    /// Replace canonical state with a fetch result and clear settled intentions.
    ///
    /// Later calls win regardless of when their fetch was issued.
    pub fn apply_fetch(&mut self, state: CanonicalFeedState) -> MergeReport {
        self.canonical = Some(state);
        let cleared = self.overlay.drop_settled();
        MergeReport {
            cleared,
            retained: self.overlay.len(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// `apply_fetch`, unless the reconciler was reset after the fetch was issued.
    pub fn apply_fetch_for(
        &mut self,
        epoch: u64,
        state: CanonicalFeedState,
    ) -> Option<MergeReport> {
        if epoch != self.epoch {
            return None;
        }
        Some(self.apply_fetch(state))
    }

    pub fn has_item(&self, link: &str) -> bool {
        self.canonical
            .as_ref()
            .is_some_and(|state| state.contains_link(link))
    }

    pub fn affinity(&self, viewer: Option<&Identity>, link: &str) -> bool {
        views::affinity(self.canonical.as_ref(), &self.overlay, viewer, link)
    }

    pub fn begin_like(&mut self, link: &str, delta: LikeDelta) {
        self.overlay.begin(link, delta);
    }

    pub fn settle_like(&mut self, link: &str) -> bool {
        self.overlay.settle(link)
    }

    pub fn rollback_like(&mut self, link: &str) -> bool {
        self.overlay.rollback(link).is_some()
    }

    pub fn project(&self, viewer: Option<&Identity>) -> Projection {
        views::project(self.canonical.as_ref(), &self.overlay, viewer)
    }

    /// Forget everything; used when the session ends.
    pub fn reset(&mut self) {
        self.canonical = None;
        self.overlay.clear();
        self.epoch += 1;
    }
}
