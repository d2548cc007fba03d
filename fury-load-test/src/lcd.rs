//! Terra LCD Client
//!
//! Talks to the light client daemon's legacy REST endpoints:
//! - account number and sequence lookup
//! - fee estimation for an unsigned message list
//! - `block` mode broadcast
//! - smart contract queries and treasury tax parameters
//!
//! Everything the engine needs from the chain goes through the
//! [`ChainClient`] trait so flows can be exercised without a node.

use crate::tx::{de_u64, parse_decimal, Coins, Msg, StdFee, StdTx, TxError, TxResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::{collections::BTreeMap, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

/// Default timeout for LCD requests
pub const LCD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum LcdError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LCD returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed LCD response: {0}")]
    Decode(String),

    #[error("transaction {txhash} failed with code {code}: {raw_log}")]
    TxFailed {
        txhash: String,
        code: u32,
        raw_log: String,
    },

    #[error(transparent)]
    Tx(#[from] TxError),
}

/// On-chain account number and next sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Gas pricing used when estimating fees
#[derive(Clone, Debug, PartialEq)]
pub struct FeeOptions {
    pub gas_prices: Coins,
    pub gas_adjustment: f64,
}

/// The chain operations the load harness depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> &str;

    async fn account(&self, address: &str) -> Result<AccountInfo, LcdError>;

    async fn estimate_fee(
        &self,
        sender: &str,
        msgs: &[Msg],
        options: &FeeOptions,
    ) -> Result<StdFee, LcdError>;

    async fn broadcast(&self, tx: &StdTx) -> Result<TxResult, LcdError>;

    async fn contract_query(&self, contract: &str, query: &Value) -> Result<Value, LcdError>;

    /// Current stability tax rate, scaled by [`crate::tx::DECIMAL_FRACTIONAL`].
    async fn tax_rate(&self) -> Result<u128, LcdError>;

    async fn tax_cap(&self, denom: &str) -> Result<u128, LcdError>;
}

/// LCD responses wrap their payload as `{"height": ..., "result": ...}`.
#[derive(Debug, Deserialize)]
struct LcdResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    #[serde(default)]
    value: Option<AccountValue>,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    #[serde(default, deserialize_with = "de_u64")]
    account_number: u64,
    #[serde(default, deserialize_with = "de_u64")]
    sequence: u64,
}

#[derive(Debug, Deserialize)]
struct EstimateFeeResult {
    fees: Coins,
    #[serde(deserialize_with = "de_u64")]
    gas: u64,
}

/// HTTP implementation of [`ChainClient`]
#[derive(Debug, Clone)]
pub struct LcdClient {
    client: reqwest::Client,
    base_url: String,
    chain_id: String,
}

impl LcdClient {
    pub fn new(base_url: &str, chain_id: &str, timeout: Duration) -> Result<Self, LcdError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id: chain_id.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, LcdError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "LCD GET");

        let response = self.client.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, LcdError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "LCD POST");

        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LcdError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LcdError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| LcdError::Decode(format!("{e}: {body}")))
    }
}

#[async_trait]
impl ChainClient for LcdClient {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn account(&self, address: &str) -> Result<AccountInfo, LcdError> {
        let response: LcdResponse<AccountEnvelope> =
            self.get(&format!("/auth/accounts/{address}"), &[]).await?;

        // Accounts that never received funds come back with empty fields
        Ok(response
            .result
            .value
            .map(|value| AccountInfo {
                account_number: value.account_number,
                sequence: value.sequence,
            })
            .unwrap_or_default())
    }

    async fn estimate_fee(
        &self,
        sender: &str,
        msgs: &[Msg],
        options: &FeeOptions,
    ) -> Result<StdFee, LcdError> {
        debug!(sender, msgs = msgs.len(), "Estimating fee");

        let body = json!({
            "tx": {
                "msg": msgs,
                "fee": StdFee::new(Coins::new(), 0),
                "signatures": [],
                "memo": "",
            },
            "gas_prices": options.gas_prices,
            "gas_adjustment": options.gas_adjustment.to_string(),
        });

        let response: LcdResponse<EstimateFeeResult> = self.post("/txs/estimate_fee", &body).await?;
        Ok(StdFee::new(response.result.fees, response.result.gas))
    }

    async fn broadcast(&self, tx: &StdTx) -> Result<TxResult, LcdError> {
        let body = json!({ "tx": tx, "mode": "block" });
        let result: TxResult = self.post("/txs", &body).await?;

        match result.code {
            Some(code) if code != 0 => {
                warn!(txhash = %result.txhash, code, "Transaction failed");
                Err(LcdError::TxFailed {
                    txhash: result.txhash,
                    code,
                    raw_log: result.raw_log,
                })
            }
            _ => Ok(result),
        }
    }

    async fn contract_query(&self, contract: &str, query: &Value) -> Result<Value, LcdError> {
        let query_msg = serde_json::to_string(query).map_err(TxError::from)?;
        let response: LcdResponse<Value> = self
            .get(
                &format!("/wasm/contracts/{contract}/store"),
                &[("query_msg", query_msg)],
            )
            .await?;
        Ok(response.result)
    }

    async fn tax_rate(&self) -> Result<u128, LcdError> {
        let response: LcdResponse<String> = self.get("/treasury/tax_rate", &[]).await?;
        parse_decimal(&response.result)
            .map_err(|_| LcdError::Decode(format!("tax rate {:?}", response.result)))
    }

    async fn tax_cap(&self, denom: &str) -> Result<u128, LcdError> {
        let response: LcdResponse<String> =
            self.get(&format!("/treasury/tax_cap/{denom}"), &[]).await?;
        response
            .result
            .parse()
            .map_err(|_| LcdError::Decode(format!("tax cap {:?}", response.result)))
    }
}

/// Fetch the FCD gas price table (`{"uusd": "0.15", ...}`).
pub async fn fetch_gas_prices(url: &str, timeout: Duration) -> Result<Coins, LcdError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    debug!(%url, "Fetching gas prices");

    let response = client.get(url).send().await?;
    let prices: BTreeMap<String, String> = LcdClient::decode(response).await?;

    let mut coins = Coins::new();
    for (denom, price) in prices {
        coins = coins.with(denom, price);
    }
    Ok(coins)
}
