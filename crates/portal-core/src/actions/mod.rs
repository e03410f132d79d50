//! Action queue: supervised, single-in-flight-per-key mutations.

pub mod guard;
pub mod queue;

use std::fmt;

pub use guard::{InFlightGuard, InFlightSet};
pub use queue::ActionQueue;

/// Concurrency key: at most one action per key is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    /// like/unlike of one link
    LikeToggle(String),
    AddItem(String),
    InitializeAccount,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::LikeToggle(link) => write!(f, "like/unlike of {}", link),
            ActionKey::AddItem(link) => write!(f, "submission of {}", link),
            ActionKey::InitializeAccount => f.write_str("account initialization"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ActionOutcome {
    /// The ledger accepted the mutation. `refreshed` is false when the
    /// follow-up fetch failed and the previous snapshot is still shown.
    Confirmed { signature: String, refreshed: bool },
    /// Nothing to do; no remote call was made.
    Unchanged,
}
