use std::collections::HashMap;

use crate::models::LikeDelta;

/// The local user's unconfirmed like intention for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLike {
    pub delta: LikeDelta,
    /// Remote call issued and not yet resolved
    pub in_flight: bool,
}

/// Optimistic like intentions of the local user, keyed by link.
///
/// An entry lives from the moment a like/unlike is issued until either the
/// remote call fails (rollback) or a fetch completes after the call succeeded.
#[derive(Debug, Clone, Default)]
pub struct PendingOverlay {
    entries: HashMap<String, PendingLike>,
}

impl PendingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, link: &str) -> Option<&PendingLike> {
        self.entries.get(link)
    }

    pub fn is_in_flight(&self, link: &str) -> bool {
        self.entries.get(link).is_some_and(|p| p.in_flight)
    }

    /// Record a new in-flight intention, replacing any settled one.
    pub fn begin(&mut self, link: &str, delta: LikeDelta) {
        self.entries.insert(
            link.to_string(),
            PendingLike {
                delta,
                in_flight: true,
            },
        );
    }

    /// Remote call succeeded; keep showing the intention until the next fetch.
    pub fn settle(&mut self, link: &str) -> bool {
        match self.entries.get_mut(link) {
            Some(pending) => {
                pending.in_flight = false;
                true
            }
            None => false,
        }
    }

    /// Remote call failed; forget the intention entirely.
    pub fn rollback(&mut self, link: &str) -> Option<PendingLike> {
        self.entries.remove(link)
    }

    /// Drop every settled entry, returning how many were removed.
    pub fn drop_settled(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, pending| pending.in_flight);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
