use serde::{Deserialize, Serialize};

use super::FeedItem;

/// Raw feed account as stored on the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAccount {
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

/// Result of fetching the feed account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    NotInitialized,
    Account(FeedAccount),
}

/// Snapshot returned by the last successful fetch.
///
/// Only ever replaced as a whole; see `Reconciler::apply_fetch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFeedState {
    pub account_initialized: bool,
    pub items: Vec<FeedItem>,
    pub total_items: u64,
}

impl CanonicalFeedState {
    pub fn not_initialized() -> Self {
        Self::default()
    }

    /// First item carrying `link`, in ledger order.
    pub fn find(&self, link: &str) -> Option<&FeedItem> {
        self.items.iter().find(|item| item.link == link)
    }

    pub fn contains_link(&self, link: &str) -> bool {
        self.find(link).is_some()
    }
}

impl From<FetchOutcome> for CanonicalFeedState {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::NotInitialized => CanonicalFeedState::not_initialized(),
            FetchOutcome::Account(account) => CanonicalFeedState {
                account_initialized: true,
                items: account.items,
                total_items: account.total_items,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    #[test]
    fn test_from_not_initialized() {
        let state = CanonicalFeedState::from(FetchOutcome::NotInitialized);
        assert!(!state.account_initialized);
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_find_returns_first_match() {
        let a = Identity::parse("A").unwrap();
        let b = Identity::parse("B").unwrap();
        let mut first = FeedItem::new("x", a);
        first.like_count = 3;
        let state = CanonicalFeedState::from(FetchOutcome::Account(FeedAccount {
            total_items: 2,
            items: vec![first, FeedItem::new("x", b)],
        }));
        assert!(state.account_initialized);
        assert_eq!(state.find("x").map(|i| i.like_count), Some(3));
        assert!(!state.contains_link("y"));
    }

    #[test]
    fn test_account_without_likers_deserializes() {
        let json = r#"{"totalItems":1,"items":[{"link":"x","creator":"A","likeCount":2}]}"#;
        let account: FeedAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.items[0].like_count, 2);
        assert!(account.items[0].likers.is_empty());
    }
}
