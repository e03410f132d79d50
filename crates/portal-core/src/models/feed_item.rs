use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Identity;

/// A submitted link as recorded by the ledger.
///
/// Items are identified by `(creator, link)`; the same link submitted by two
/// creators yields two distinct items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub link: String,
    pub creator: Identity,
    #[serde(default)]
    pub like_count: u64,
    /// Wallets that currently like this item. Ledgers that only keep the
    /// aggregate count send nothing here.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub likers: BTreeSet<Identity>,
}

impl FeedItem {
    pub fn new(link: impl Into<String>, creator: Identity) -> Self {
        Self {
            link: link.into(),
            creator,
            like_count: 0,
            likers: BTreeSet::new(),
        }
    }

    pub fn is_liked_by(&self, identity: &Identity) -> bool {
        self.likers.contains(identity)
    }
}

/// Direction of a like mutation. An absent overlay entry stands for "no change".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LikeDelta {
    Add,
    Remove,
}

impl LikeDelta {
    pub fn as_i8(self) -> i8 {
        match self {
            LikeDelta::Add => 1,
            LikeDelta::Remove => -1,
        }
    }

    /// Affinity the user ends up with once this delta lands.
    pub fn liked(self) -> bool {
        matches!(self, LikeDelta::Add)
    }

    pub fn toward(liked: bool) -> Self {
        if liked {
            LikeDelta::Add
        } else {
            LikeDelta::Remove
        }
    }
}
