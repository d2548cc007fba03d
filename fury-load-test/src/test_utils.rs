//! In-memory chain used by unit tests.
//!
//! Tracks account sequences, checks every signature against the sign doc
//! the chain expects, and emits the log events the engine reads back.

use crate::{
    config::{Config, Deployment},
    engine::Engine,
    lcd::{AccountInfo, ChainClient, FeeOptions, LcdError},
    tx::{
        Attribute, Event, Msg, StdFee, StdSignDoc, StdTx, TxLog, TxResult, DECIMAL_FRACTIONAL,
    },
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fury_crypto_secp256k1::{verify_sha256, Secp256k1Keypair};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

#[derive(Debug, Clone)]
pub struct BroadcastRecord {
    pub tx: StdTx,
    pub signer: String,
    pub sequence: u64,
}

impl BroadcastRecord {
    /// Contract targeted by the first execute message.
    pub fn contract(&self) -> Option<&str> {
        self.tx.msg.iter().find_map(|msg| match msg {
            Msg::ExecuteContract { contract, .. } => Some(contract.as_str()),
            _ => None,
        })
    }
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, AccountInfo>,
    broadcasts: Vec<BroadcastRecord>,
    queries: Vec<(String, Value)>,
    failing: HashSet<String>,
    next_code_id: u64,
    next_contract: u8,
    next_pool_id: u64,
}

type QueryHandler = Box<dyn Fn(&str, &Value) -> Value + Send + Sync>;

pub struct MockChain {
    state: Mutex<State>,
    account_lookups: AtomicUsize,
    fee_estimates: AtomicUsize,
    query_handler: QueryHandler,
}

impl MockChain {
    pub fn new() -> Self {
        Self::with_query_handler(|_, _| json!("1000"))
    }

    pub fn with_query_handler(
        handler: impl Fn(&str, &Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(State::default()),
            account_lookups: AtomicUsize::new(0),
            fee_estimates: AtomicUsize::new(0),
            query_handler: Box::new(handler),
        }
    }

    pub fn set_account(&self, address: &str, account_number: u64, sequence: u64) {
        self.state.lock().unwrap().accounts.insert(
            address.to_string(),
            AccountInfo {
                account_number,
                sequence,
            },
        );
    }

    /// Reject every broadcast signed by `address`.
    pub fn fail_broadcasts_from(&self, address: &str) {
        self.state.lock().unwrap().failing.insert(address.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    pub fn account_lookups(&self) -> usize {
        self.account_lookups.load(Ordering::SeqCst)
    }

    pub fn fee_estimates(&self) -> usize {
        self.fee_estimates.load(Ordering::SeqCst)
    }

    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn queries(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().queries.clone()
    }

    /// Bodies of every executed message named `name`, in broadcast order.
    pub fn executed(&self, name: &str) -> Vec<Value> {
        self.executed_with_sender(name)
            .into_iter()
            .map(|(_, body)| body)
            .collect()
    }

    /// Like [`Self::executed`] but paired with the message sender.
    pub fn executed_with_sender(&self, name: &str) -> Vec<(String, Value)> {
        let state = self.state.lock().unwrap();
        state
            .broadcasts
            .iter()
            .flat_map(|record| record.tx.msg.iter())
            .filter_map(|msg| match msg {
                Msg::ExecuteContract {
                    sender,
                    execute_msg,
                    ..
                } => execute_msg
                    .get(name)
                    .map(|body| (sender.clone(), body.clone())),
                _ => None,
            })
            .collect()
    }

    fn events_for(state: &mut State, msg: &Msg) -> Vec<Event> {
        let mut events = vec![event("message", &[("sender", msg.signer())])];

        match msg {
            Msg::StoreCode { .. } => {
                state.next_code_id += 1;
                let code_id = state.next_code_id.to_string();
                events.push(event("store_code", &[("code_id", &code_id)]));
            }
            Msg::InstantiateContract { .. } => {
                state.next_contract += 1;
                let address = Secp256k1Keypair::from_bytes(&[state.next_contract; 32])
                    .and_then(|key| key.account_address("terra"))
                    .unwrap_or_default();
                events.push(event(
                    "instantiate_contract",
                    &[("contract_address", &address)],
                ));
            }
            Msg::ExecuteContract { execute_msg, .. } if execute_msg.get("create_pool").is_some() => {
                state.next_pool_id += 1;
                let pool_id = state.next_pool_id.to_string();
                events.push(event("wasm", &[("pool_id", &pool_id)]));
            }
            _ => {}
        }

        events
    }

    fn verify(tx: &StdTx, chain_id: &str, account: AccountInfo) -> bool {
        let Some(signature) = tx.signatures.first() else {
            return false;
        };
        let doc = StdSignDoc {
            account_number: account.account_number.to_string(),
            chain_id,
            fee: &tx.fee,
            memo: &tx.memo,
            msgs: &tx.msg,
            sequence: account.sequence.to_string(),
        };
        let (Ok(bytes), Ok(public_key), Ok(sig)) = (
            doc.sign_bytes(),
            STANDARD.decode(&signature.pub_key.value),
            STANDARD.decode(&signature.signature),
        ) else {
            return false;
        };
        verify_sha256(&public_key, &bytes, &sig).is_ok()
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

fn event(kind: &str, attributes: &[(&str, &str)]) -> Event {
    Event {
        kind: kind.to_string(),
        attributes: attributes
            .iter()
            .map(|(key, value)| Attribute {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect(),
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> &str {
        "localterra"
    }

    async fn account(&self, address: &str) -> Result<AccountInfo, LcdError> {
        self.account_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.accounts.get(address).copied().unwrap_or_default())
    }

    async fn estimate_fee(
        &self,
        _sender: &str,
        msgs: &[Msg],
        options: &FeeOptions,
    ) -> Result<StdFee, LcdError> {
        self.fee_estimates.fetch_add(1, Ordering::SeqCst);
        let gas = 150_000 * msgs.len().max(1) as u64;
        let denom = options
            .gas_prices
            .iter()
            .next()
            .map(|coin| coin.denom.clone())
            .unwrap_or_else(|| "uluna".to_string());
        Ok(StdFee::new(
            crate::tx::Coins::new().with(denom, gas / 50),
            gas,
        ))
    }

    async fn broadcast(&self, tx: &StdTx) -> Result<TxResult, LcdError> {
        let mut state = self.state.lock().unwrap();
        let signer = tx
            .msg
            .first()
            .map(|msg| msg.signer().to_string())
            .ok_or_else(|| LcdError::Decode("empty transaction".to_string()))?;

        if state.failing.contains(&signer) {
            return Err(LcdError::TxFailed {
                txhash: String::new(),
                code: 5,
                raw_log: "insufficient funds".to_string(),
            });
        }

        let account = state.accounts.get(&signer).copied().unwrap_or_default();
        if !Self::verify(tx, self.chain_id(), account) {
            return Err(LcdError::TxFailed {
                txhash: String::new(),
                code: 4,
                raw_log: format!(
                    "signature verification failed; expected sequence {}",
                    account.sequence
                ),
            });
        }

        let events: Vec<Event> = tx
            .msg
            .iter()
            .flat_map(|msg| Self::events_for(&mut state, msg))
            .collect();

        state.accounts.insert(
            signer.clone(),
            AccountInfo {
                sequence: account.sequence + 1,
                ..account
            },
        );
        state.broadcasts.push(BroadcastRecord {
            tx: tx.clone(),
            signer,
            sequence: account.sequence,
        });

        Ok(TxResult {
            height: state.broadcasts.len() as u64,
            txhash: format!("{:064X}", state.broadcasts.len()),
            code: None,
            raw_log: String::new(),
            gas_wanted: None,
            gas_used: None,
            logs: vec![TxLog { events }],
        })
    }

    async fn contract_query(&self, contract: &str, query: &Value) -> Result<Value, LcdError> {
        self.state
            .lock()
            .unwrap()
            .queries
            .push((contract.to_string(), query.clone()));
        Ok((self.query_handler)(contract, query))
    }

    async fn tax_rate(&self) -> Result<u128, LcdError> {
        // 0.001
        Ok(DECIMAL_FRACTIONAL / 1000)
    }

    async fn tax_cap(&self, _denom: &str) -> Result<u128, LcdError> {
        Ok(1_400_000)
    }
}

/// Default config with freshly generated admin and minting mnemonics.
pub fn test_config(admins: usize) -> Config {
    let phrase = || Secp256k1Keypair::generate().unwrap().0;

    let mut config = Config::default();
    config.wallets.minting_mnemonic = phrase();
    config.wallets.admin_mnemonics = (0..admins).map(|_| phrase()).collect();
    config
}

pub fn test_deployment() -> Deployment {
    Deployment {
        fury_contract_address: "terra1furytokencontract".to_string(),
        proxy_contract_address: "terra1furyswapproxy".to_string(),
    }
}

pub fn test_engine(chain: Arc<MockChain>, config: Config) -> Engine {
    let fee_options = FeeOptions {
        gas_prices: config.fee.gas_prices.parse().unwrap(),
        gas_adjustment: config.fee.gas_adjustment,
    };
    Engine::from_parts(Arc::new(config), chain, test_deployment(), fee_options, None).unwrap()
}
