//! Token ledger reached over HTTP.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET /balance/{principal}` → `{"balance": <number>}`
//! - `GET /total-supply` → `{"total_supply": <number>}`

use crate::tracing_spans::ledger_request_span;
use crate::NodeError;
use agora_governance::{LedgerError, TokenLedger};
use agora_types::Principal;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::Instrument;

#[derive(Deserialize)]
struct BalanceResponse {
    balance: u128,
}

#[derive(Deserialize)]
struct TotalSupplyResponse {
    total_supply: u128,
}

#[derive(Clone)]
pub struct HttpLedger {
    base: String,
    client: Client,
}

impl HttpLedger {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, NodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Http(e.to_string()))?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Unavailable(format!("{url}: {status} {body}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TokenLedger for HttpLedger {
    async fn balance_of(&self, principal: &Principal) -> Result<u128, LedgerError> {
        let path = format!("/balance/{}", principal.to_hex());
        let resp: BalanceResponse = self
            .get_json(&path)
            .instrument(ledger_request_span("balance_of"))
            .await?;
        Ok(resp.balance)
    }

    async fn total_supply(&self) -> Result<u128, LedgerError> {
        let resp: TotalSupplyResponse = self
            .get_json("/total-supply")
            .instrument(ledger_request_span("total_supply"))
            .await?;
        Ok(resp.total_supply)
    }
}
