//! Remote feed store: the ledger transport seam and the typed adapter over it.

pub mod adapter;
pub mod http;
pub mod memory;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::FeedTarget;
use crate::models::{FeedAccount, Identity};

pub use adapter::FeedStoreAdapter;
pub use http::HttpLedger;
pub use memory::{LedgerSnapshot, MemoryLedger};

/// Mutation sent to the feed program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Instruction {
    Initialize,
    AddItem { link: String },
    AddLike { link: String },
    RemoveLike { link: String },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Initialize => "initialize",
            Instruction::AddItem { .. } => "addItem",
            Instruction::AddLike { .. } => "addLike",
            Instruction::RemoveLike { .. } => "removeLike",
        }
    }
}

/// Acknowledgement for an accepted instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub signature: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("ledger request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ledger rejected instruction: {0}")]
    Rejected(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected ledger response: {0}")]
    Malformed(String),
}

pub type LedgerFuture<'a, T> = BoxFuture<'a, Result<T, TransportError>>;

/// One network round trip per call, no retries.
pub trait LedgerTransport: Send + Sync {
    /// `Ok(None)` when the feed account was never initialized.
    fn fetch_account<'a>(
        &'a self,
        target: &'a FeedTarget,
        owner: &'a Identity,
    ) -> LedgerFuture<'a, Option<FeedAccount>>;

    fn send_instruction<'a>(
        &'a self,
        target: &'a FeedTarget,
        signer: &'a Identity,
        instruction: Instruction,
    ) -> LedgerFuture<'a, TxReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_wire_form() {
        let ix = Instruction::AddLike {
            link: "https://x".to_string(),
        };
        let json = serde_json::to_value(&ix).unwrap();
        assert_eq!(json["type"], "addLike");
        assert_eq!(json["link"], "https://x");

        let init: Instruction = serde_json::from_str(r#"{"type":"initialize"}"#).unwrap();
        assert_eq!(init, Instruction::Initialize);
        assert_eq!(init.name(), "initialize");
    }
}
