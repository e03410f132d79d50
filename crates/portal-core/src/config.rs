use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{DEFAULT_ENDPOINT, DEFAULT_PROGRAM_ID, FEED_ACCOUNT_SEED};

/// Where the feed lives on the remote ledger.
///
/// Injected into the store adapter at construction; nothing in the crate
/// reads a process-wide account address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedTarget {
    /// Program the feed account belongs to
    pub program_id: String,
    /// Ledger endpoint (base URL for HTTP transports)
    pub endpoint: String,
    /// Address of the shared feed account
    pub feed_account: String,
}

impl FeedTarget {
    pub fn new(
        program_id: impl Into<String>,
        endpoint: impl Into<String>,
        feed_account: impl Into<String>,
    ) -> Self {
        Self {
            program_id: program_id.into(),
            endpoint: endpoint.into(),
            feed_account: feed_account.into(),
        }
    }

    /// Target whose feed account is derived from the program id.
    pub fn derived(program_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let program_id = program_id.into();
        let feed_account = derive_feed_account(&program_id);
        Self::new(program_id, endpoint, feed_account)
    }
}

impl Default for FeedTarget {
    fn default() -> Self {
        Self::derived(DEFAULT_PROGRAM_ID, DEFAULT_ENDPOINT)
    }
}

/// Deterministic feed account address for a program (hex sha256 of seed + program id).
pub fn derive_feed_account(program_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FEED_ACCOUNT_SEED.as_bytes());
    hasher.update(b":");
    hasher.update(program_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub target: FeedTarget,
}

impl CoreConfig {
    pub fn new(target: FeedTarget) -> Self {
        Self { target }
    }
}
