use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Instruction, LedgerFuture, LedgerTransport, TransportError, TxReceipt};
use crate::config::FeedTarget;
use crate::constants::routes;
use crate::models::{FeedAccount, Identity};

/// Body of `POST /v1/accounts/fetch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAccountRequest {
    pub program_id: String,
    pub feed_account: String,
    pub owner: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAccountResponse {
    pub account: Option<FeedAccount>,
}

/// Body of `POST /v1/instructions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInstructionRequest {
    pub program_id: String,
    pub feed_account: String,
    pub signer: Identity,
    pub instruction: Instruction,
}

/// Error body returned with any non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerErrorBody {
    pub error: String,
}

/// Ledger reached over HTTP at `FeedTarget::endpoint`.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
}

impl HttpLedger {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn url(target: &FeedTarget, route: &str) -> String {
        format!("{}{}", target.endpoint.trim_end_matches('/'), route)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> Result<R, TransportError> {
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| TransportError::Malformed(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<LedgerErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        if status.is_client_error() {
            Err(TransportError::Rejected(message))
        } else {
            Err(TransportError::Unavailable(format!("{}: {}", status, message)))
        }
    }
}

impl LedgerTransport for HttpLedger {
    fn fetch_account<'a>(
        &'a self,
        target: &'a FeedTarget,
        owner: &'a Identity,
    ) -> LedgerFuture<'a, Option<FeedAccount>> {
        Box::pin(async move {
            let body = FetchAccountRequest {
                program_id: target.program_id.clone(),
                feed_account: target.feed_account.clone(),
                owner: owner.clone(),
            };
            let response: FetchAccountResponse = self
                .post(Self::url(target, routes::FETCH_ACCOUNT), &body)
                .await?;
            Ok(response.account)
        })
    }

    fn send_instruction<'a>(
        &'a self,
        target: &'a FeedTarget,
        signer: &'a Identity,
        instruction: Instruction,
    ) -> LedgerFuture<'a, TxReceipt> {
        Box::pin(async move {
            let body = SendInstructionRequest {
                program_id: target.program_id.clone(),
                feed_account: target.feed_account.clone(),
                signer: signer.clone(),
                instruction,
            };
            self.post(Self::url(target, routes::SEND_INSTRUCTION), &body)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let target = FeedTarget::new("p", "http://127.0.0.1:8899/", "acct");
        assert_eq!(
            HttpLedger::url(&target, routes::FETCH_ACCOUNT),
            "http://127.0.0.1:8899/v1/accounts/fetch"
        );
    }

    #[test]
    fn test_send_request_wire_form() {
        let body = SendInstructionRequest {
            program_id: "p".to_string(),
            feed_account: "acct".to_string(),
            signer: Identity::parse("A").unwrap(),
            instruction: Instruction::RemoveLike {
                link: "x".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["feedAccount"], "acct");
        assert_eq!(json["instruction"]["type"], "removeLike");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let ledger = HttpLedger::new(Duration::from_millis(500)).unwrap();
        // Port 9 (discard) is not expected to run an HTTP server
        let target = FeedTarget::new("p", "http://127.0.0.1:9", "acct");
        let result = ledger
            .fetch_account(&target, &Identity::parse("A").unwrap())
            .await;
        assert!(result.is_err());
    }
}
