//! Amino JSON transaction model
//!
//! Terra's legacy REST surface accepts `StdTx` documents encoded as amino
//! JSON. Signatures are computed over the canonical form of a
//! [`StdSignDoc`]: object keys sorted at every level, no whitespace, and
//! the HTML-sensitive characters escaped the way Go's encoder does.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Errors building or encoding transactions
#[derive(Debug, Error)]
pub enum TxError {
    #[error("invalid coin: {0}")]
    InvalidCoin(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("failed to encode transaction: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single denomination and amount.
///
/// The amount is kept as text because gas prices are decimals while
/// transfer amounts are 128-bit integers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl ToString) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| TxError::InvalidCoin(s.to_string()))?;
        let (amount, denom) = s.split_at(split);

        let valid_amount = !amount.is_empty()
            && amount.chars().all(|c| c.is_ascii_digit() || c == '.')
            && amount.matches('.').count() <= 1;
        let valid_denom = denom
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/');

        if !valid_amount || !valid_denom {
            return Err(TxError::InvalidCoin(s.to_string()));
        }

        Ok(Coin::new(denom, amount))
    }
}

/// A set of coins kept sorted by denomination, one entry per denom.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the amount for `denom`.
    pub fn with(mut self, denom: impl Into<String>, amount: impl ToString) -> Self {
        self.insert(Coin::new(denom, amount));
        self
    }

    pub fn insert(&mut self, coin: Coin) {
        match self.0.binary_search_by(|c| c.denom.cmp(&coin.denom)) {
            Ok(pos) => self.0[pos] = coin,
            Err(pos) => self.0.insert(pos, coin),
        }
    }

    pub fn get(&self, denom: &str) -> Option<&Coin> {
        self.0.iter().find(|c| c.denom == denom)
    }

    /// Keep only the given denomination.
    pub fn filter_denom(&self, denom: &str) -> Coins {
        Coins(self.0.iter().filter(|c| c.denom == denom).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Coin>> for Coins {
    fn from(coins: Vec<Coin>) -> Self {
        let mut set = Coins::new();
        for coin in coins {
            set.insert(coin);
        }
        set
    }
}

impl<'de> Deserialize<'de> for Coins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coins = Option::<Vec<Coin>>::deserialize(deserializer)?;
        Ok(Coins::from(coins.unwrap_or_default()))
    }
}

impl FromStr for Coins {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let coins = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Coins::from(coins))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Coin::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse an integer token amount such as `"100000000"`.
pub fn parse_amount(amount: &str) -> Result<u128, TxError> {
    amount
        .trim()
        .parse::<u128>()
        .map_err(|_| TxError::InvalidAmount(amount.to_string()))
}

/// One whole unit in the chain's 18-decimal fixed-point representation.
pub const DECIMAL_FRACTIONAL: u128 = 1_000_000_000_000_000_000;

/// Parse a non-negative decimal such as `"0.001000000000000000"` into an
/// integer scaled by [`DECIMAL_FRACTIONAL`].
pub fn parse_decimal(value: &str) -> Result<u128, TxError> {
    let invalid = || TxError::InvalidAmount(value.to_string());
    let trimmed = value.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits(whole) || !digits(fraction) || fraction.len() > 18 {
        return Err(invalid());
    }

    let whole: u128 = whole.parse().map_err(|_| invalid())?;
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<18}").parse().map_err(|_| invalid())?
    };
    whole
        .checked_mul(DECIMAL_FRACTIONAL)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(invalid)
}

/// `floor(amount * decimal)` for a fixed-point `decimal`, or `None` on overflow.
pub fn mul_decimal_floor(amount: u128, decimal: u128) -> Option<u128> {
    let whole = amount / DECIMAL_FRACTIONAL;
    let rest = amount % DECIMAL_FRACTIONAL;
    whole
        .checked_mul(decimal)?
        .checked_add(rest.checked_mul(decimal)? / DECIMAL_FRACTIONAL)
}

/// Messages understood by the Terra legacy REST endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    #[serde(rename = "bank/MsgSend")]
    Send {
        from_address: String,
        to_address: String,
        amount: Coins,
    },

    #[serde(rename = "wasm/MsgExecuteContract")]
    ExecuteContract {
        sender: String,
        contract: String,
        execute_msg: Value,
        coins: Coins,
    },

    #[serde(rename = "wasm/MsgInstantiateContract")]
    InstantiateContract {
        sender: String,
        admin: String,
        code_id: String,
        init_msg: Value,
        init_coins: Coins,
    },

    #[serde(rename = "wasm/MsgStoreCode")]
    StoreCode {
        sender: String,
        wasm_byte_code: String,
    },
}

impl Msg {
    pub fn send(from: &str, to: &str, amount: Coins) -> Self {
        Msg::Send {
            from_address: from.to_string(),
            to_address: to.to_string(),
            amount,
        }
    }

    pub fn execute(sender: &str, contract: &str, execute_msg: Value, coins: Coins) -> Self {
        Msg::ExecuteContract {
            sender: sender.to_string(),
            contract: contract.to_string(),
            execute_msg,
            coins,
        }
    }

    /// Instantiate with the sender as contract admin.
    pub fn instantiate(sender: &str, code_id: u64, init_msg: Value, init_coins: Coins) -> Self {
        Msg::InstantiateContract {
            sender: sender.to_string(),
            admin: sender.to_string(),
            code_id: code_id.to_string(),
            init_msg,
            init_coins,
        }
    }

    pub fn store_code(sender: &str, wasm: &[u8]) -> Self {
        Msg::StoreCode {
            sender: sender.to_string(),
            wasm_byte_code: STANDARD.encode(wasm),
        }
    }

    /// Address that must sign this message.
    pub fn signer(&self) -> &str {
        match self {
            Msg::Send { from_address, .. } => from_address,
            Msg::ExecuteContract { sender, .. }
            | Msg::InstantiateContract { sender, .. }
            | Msg::StoreCode { sender, .. } => sender,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Coins,
    pub gas: String,
}

impl StdFee {
    pub fn new(amount: Coins, gas: u64) -> Self {
        Self {
            amount,
            gas: gas.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

impl PubKey {
    pub fn secp256k1(compressed: &[u8]) -> Self {
        Self {
            key_type: "tendermint/PubKeySecp256k1".to_string(),
            value: STANDARD.encode(compressed),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub signature: String,
    pub pub_key: PubKey,
}

/// A signed transaction ready for broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<Msg>,
    pub fee: StdFee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
}

/// The document a signer commits to.
#[derive(Clone, Debug, Serialize)]
pub struct StdSignDoc<'a> {
    pub account_number: String,
    pub chain_id: &'a str,
    pub fee: &'a StdFee,
    pub memo: &'a str,
    pub msgs: &'a [Msg],
    pub sequence: String,
}

impl StdSignDoc<'_> {
    /// Canonical bytes to be hashed and signed.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, TxError> {
        let value = serde_json::to_value(self)?;
        Ok(canonical_json(&value)?.into_bytes())
    }
}

/// Render `value` with recursively sorted keys and Go-compatible escaping.
pub fn canonical_json(value: &Value) -> Result<String, TxError> {
    let mut out = String::new();
    write_sorted(value, &mut out)?;
    Ok(out
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

fn write_sorted(value: &Value, out: &mut String) -> Result<(), TxError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_sorted(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Amino JSON encodes 64-bit integers as strings; accept either form.
pub(crate) fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(0),
        Some(StringOrNumber::Number(n)) => Ok(n),
        Some(StringOrNumber::String(s)) if s.is_empty() => Ok(0),
        Some(StringOrNumber::String(s)) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TxLog {
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Result of a `block` mode broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TxResult {
    #[serde(default, deserialize_with = "de_u64")]
    pub height: u64,
    pub txhash: String,
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub raw_log: String,
    #[serde(default)]
    pub gas_wanted: Option<Value>,
    #[serde(default)]
    pub gas_used: Option<Value>,
    #[serde(default)]
    pub logs: Vec<TxLog>,
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        self.code.unwrap_or(0) == 0
    }

    fn events(&self) -> impl Iterator<Item = &Event> {
        self.logs.iter().flat_map(|log| log.events.iter())
    }

    /// First value of `key` inside an event of type `event`.
    pub fn find_attribute(&self, event: &str, key: &str) -> Option<&str> {
        self.events()
            .filter(|e| e.kind == event)
            .flat_map(|e| e.attributes.iter())
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// First value of `key` in any event.
    pub fn find_any_attribute(&self, key: &str) -> Option<&str> {
        self.events()
            .flat_map(|e| e.attributes.iter())
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    pub fn code_id(&self) -> Option<u64> {
        self.find_attribute("store_code", "code_id")
            .and_then(|id| id.parse().ok())
    }

    pub fn contract_address(&self) -> Option<&str> {
        self.find_attribute("instantiate_contract", "contract_address")
    }
}
