//! Render projection: what the user sees, derived from canonical state plus
//! the pending overlay. Pure functions only.

use serde::Serialize;

use super::PendingOverlay;
use crate::models::{CanonicalFeedState, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountState {
    /// No fetch has completed yet
    Unknown,
    NotInitialized,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleItem {
    pub link: String,
    pub creator: Identity,
    /// Count from the last fetch; optimistic likes never change it
    pub like_count: u64,
    /// Whether the viewer likes this item, overlay first
    pub liked: bool,
    /// A like/unlike for this link is awaiting the ledger
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub account: AccountState,
    /// Offer the one-time account initialization action
    pub bootstrap_available: bool,
    pub total_items: u64,
    pub items: Vec<VisibleItem>,
}

impl Projection {
    pub fn item(&self, link: &str) -> Option<&VisibleItem> {
        self.items.iter().find(|item| item.link == link)
    }
}

/// Viewer's like affinity for `link`.
pub fn affinity(
    canonical: Option<&CanonicalFeedState>,
    overlay: &PendingOverlay,
    viewer: Option<&Identity>,
    link: &str,
) -> bool {
    if let Some(pending) = overlay.get(link) {
        return pending.delta.liked();
    }
    match (canonical.and_then(|state| state.find(link)), viewer) {
        (Some(item), Some(viewer)) => item.is_liked_by(viewer),
        _ => false,
    }
}

pub fn account_state(canonical: Option<&CanonicalFeedState>) -> AccountState {
    match canonical {
        None => AccountState::Unknown,
        Some(state) if !state.account_initialized => AccountState::NotInitialized,
        Some(_) => AccountState::Ready,
    }
}

pub fn project(
    canonical: Option<&CanonicalFeedState>,
    overlay: &PendingOverlay,
    viewer: Option<&Identity>,
) -> Projection {
    let account = account_state(canonical);

    let items = canonical
        .map(|state| {
            state
                .items
                .iter()
                .map(|item| {
                    // Likes land on the first item with a link; the overlay
                    // only describes that one.
                    let targeted = state
                        .find(&item.link)
                        .is_some_and(|first| first.creator == item.creator);
                    let pending = overlay.get(&item.link).filter(|_| targeted);
                    let liked = match pending {
                        Some(pending) => pending.delta.liked(),
                        None => viewer.is_some_and(|viewer| item.is_liked_by(viewer)),
                    };
                    VisibleItem {
                        link: item.link.clone(),
                        creator: item.creator.clone(),
                        like_count: item.like_count,
                        liked,
                        pending: pending.is_some_and(|pending| pending.in_flight),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Projection {
        account,
        bootstrap_available: account == AccountState::NotInitialized,
        total_items: canonical.map(|state| state.total_items).unwrap_or(0),
        items,
    }
}
