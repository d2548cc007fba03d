use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::lcd::LCD_TIMEOUT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse deployment file {}: {source}", path.display())]
    Deployment {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No admin account configured for admin shift {shift} ({available} available)")]
    MissingAdmin { shift: usize, available: usize },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// LocalTerra's pre-funded `test1` .. `test10` accounts
pub const LOCALTERRA_MNEMONICS: [&str; 10] = [
    "notice oak worry limit wrap speak medal online prefer cluster roof addict wrist behave treat actual wasp year salad speed social layer crew genius",
    "quality vacuum heart guard buzz spike sight swarm shove special gym robust assume sudden deposit grid alcohol choice devote leader tilt noodle tide penalty",
    "symbol force gallery make bulk round subway violin worry mixture penalty kingdom boring survey tool fringe patrol sausage hard admit remember broken alien absorb",
    "bounce success option birth apple portion aunt rural episode solution hockey pencil lend session cause hedgehog slender journey system canvas decorate razor catch empty",
    "second render cat sing soup reward cluster island bench diet lumber grocery repeat balcony perfect diesel stumble piano distance caught occur example ozone loyal",
    "spatial forest elevator battle also spoon fun skirt flight initial nasty transfer glory palm drama gossip remove fan joke shove label dune debate quick",
    "noble width taxi input there patrol clown public spell aunt wish punch moment will misery eight excess arena pen turtle minimum grain vague inmate",
    "cream sport mango believe inhale text fish rely elegant below earth april wall rug ritual blossom cherry detail length blind digital proof identify ride",
    "index light average senior silent limit usual local involve delay update rack cause inmate wall render magnet common feature laundry exact casual resource hundred",
    "prefer forget visit mistake mixture feel eyebrow autumn shop pair address airport diesel street pass vague innocent poem method awful require hurry unhappy shoulder",
];

/// Wallet holding the FURY supply on the test networks
pub const DEFAULT_MINTING_MNEMONIC: &str = "awesome festival volume rifle diagram suffer rhythm knock unlock reveal marine transfer lumber faint walnut love hover beach amazing robust oppose moon west will";

/// Which chain the harness targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Local,
    Testnet,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Local => write!(f, "local"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "localterra" => Ok(Network::Local),
            "testnet" | "bombay" => Ok(Network::Testnet),
            other => Err(ConfigError::Invalid {
                field: "network",
                reason: format!("unknown network {other:?}"),
            }),
        }
    }
}

/// Resolved connection settings for a run
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSettings {
    pub lcd_url: String,
    pub chain_id: String,
    pub gas_prices_url: Option<String>,
    pub step_delay: Duration,
    pub address_prefix: String,
    pub request_timeout: Duration,
}

impl Network {
    pub fn preset(&self) -> ChainSettings {
        match self {
            Network::Local => ChainSettings {
                lcd_url: "http://localhost:1317".to_string(),
                chain_id: "localterra".to_string(),
                gas_prices_url: None,
                step_delay: Duration::ZERO,
                address_prefix: "terra".to_string(),
                request_timeout: LCD_TIMEOUT,
            },
            Network::Testnet => ChainSettings {
                lcd_url: "https://bombay-lcd.terra.dev".to_string(),
                chain_id: "bombay-12".to_string(),
                gas_prices_url: Some("https://fcd.terra.dev/v1/txs/gas_prices".to_string()),
                step_delay: Duration::from_millis(31_000),
                address_prefix: "terra".to_string(),
                request_timeout: LCD_TIMEOUT,
            },
        }
    }
}

/// Top level configuration for a load test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: Network,

    /// JSON file with the deployed FURY and proxy contract addresses
    #[serde(default = "default_deployment_file")]
    pub deployment_file: PathBuf,

    /// Also write logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub chain: ChainOverrides,
    #[serde(default)]
    pub fee: FeeConfig,
    #[serde(default)]
    pub wallets: WalletsConfig,
    #[serde(default)]
    pub funding: FundingConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub staking: StakingConfig,
    #[serde(default)]
    pub gaming: GamingConfig,
    #[serde(default)]
    pub swap: SwapConfig,
}

/// Per-field overrides of the network preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcd_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_prices_url: Option<String>,
    /// Pause between dependent steps, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_gas_prices")]
    pub gas_prices: String,
    #[serde(default = "default_gas_adjustment")]
    pub gas_adjustment: f64,
    /// Denomination picked out of fetched gas prices
    #[serde(default = "default_fee_denom")]
    pub fee_denom: String,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_prices: default_gas_prices(),
            gas_adjustment: default_gas_adjustment(),
            fee_denom: default_fee_denom(),
        }
    }
}

fn default_gas_prices() -> String {
    "0.013uluna".to_string()
}

fn default_gas_adjustment() -> f64 {
    2.0
}

fn default_fee_denom() -> String {
    "uusd".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletsConfig {
    #[serde(default = "default_minting_mnemonic")]
    pub minting_mnemonic: String,

    /// Pre-funded admin accounts, selected by admin shift
    #[serde(default = "default_admin_mnemonics")]
    pub admin_mnemonics: Vec<String>,

    /// Use this admin regardless of admin shift
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_mnemonic: Option<String>,

    /// Wallet seeding the swap pool; the admin when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_mnemonic: Option<String>,
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self {
            minting_mnemonic: default_minting_mnemonic(),
            admin_mnemonics: default_admin_mnemonics(),
            admin_mnemonic: None,
            liquidity_mnemonic: None,
        }
    }
}

fn default_minting_mnemonic() -> String {
    DEFAULT_MINTING_MNEMONIC.to_string()
}

fn default_admin_mnemonics() -> Vec<String> {
    LOCALTERRA_MNEMONICS.iter().map(|m| m.to_string()).collect()
}

/// Amounts handed to every synthetic user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingConfig {
    #[serde(default = "default_fury_amount")]
    pub fury_amount: String,
    #[serde(default = "default_uusd_amount")]
    pub uusd_amount: String,
    #[serde(default = "default_uluna_amount")]
    pub uluna_amount: String,
    /// Recipients per funding transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            fury_amount: default_fury_amount(),
            uusd_amount: default_uusd_amount(),
            uluna_amount: default_uluna_amount(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_fury_amount() -> String {
    "100000000".to_string()
}

fn default_uusd_amount() -> String {
    "50000000".to_string()
}

fn default_uluna_amount() -> String {
    "100000000".to_string()
}

fn default_batch_size() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractsConfig {
    #[serde(default = "default_gaming_pool_wasm")]
    pub gaming_pool_wasm: PathBuf,
    #[serde(default = "default_club_staking_wasm")]
    pub club_staking_wasm: PathBuf,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            gaming_pool_wasm: default_gaming_pool_wasm(),
            club_staking_wasm: default_club_staking_wasm(),
        }
    }
}

fn default_gaming_pool_wasm() -> PathBuf {
    PathBuf::from("../artifacts/gaming_pool.wasm")
}

fn default_club_staking_wasm() -> PathBuf {
    PathBuf::from("../artifacts/club_staking.wasm")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingConfig {
    #[serde(default = "default_club_owners")]
    pub club_owners: usize,
    #[serde(default = "default_true")]
    pub auto_stake: bool,
    #[serde(default = "default_stake_amount")]
    pub amount_to_stake_per_club: String,
    #[serde(default = "default_club_price")]
    pub club_price: String,
    /// Seconds between club reward distributions
    #[serde(default = "default_reward_periodicity")]
    pub reward_periodicity: u64,
    /// Seconds a withdrawn stake stays bonded
    #[serde(default = "default_bonding_duration")]
    pub bonding_duration: u64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            club_owners: default_club_owners(),
            auto_stake: true,
            amount_to_stake_per_club: default_stake_amount(),
            club_price: default_club_price(),
            reward_periodicity: default_reward_periodicity(),
            bonding_duration: default_bonding_duration(),
        }
    }
}

fn default_club_owners() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_stake_amount() -> String {
    "100000".to_string()
}

fn default_club_price() -> String {
    "100000".to_string()
}

fn default_reward_periodicity() -> u64 {
    300
}

fn default_bonding_duration() -> u64 {
    120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamingConfig {
    #[serde(default = "default_platform_fee")]
    pub platform_fee: String,
    #[serde(default = "default_transaction_fee")]
    pub transaction_fee: String,
    #[serde(default = "default_game_id")]
    pub game_id: String,
    #[serde(default = "default_pool_type")]
    pub pool_type: String,
    /// Pool entry fee in uusd
    #[serde(default = "default_pool_fee")]
    pub pool_fee: String,
    #[serde(default = "default_teams")]
    pub min_teams_for_pool: u32,
    #[serde(default = "default_teams")]
    pub max_teams_for_pool: u32,
    #[serde(default = "default_teams")]
    pub max_teams_for_gamer: u32,
    /// uusd attached to each bid for the transaction fee
    #[serde(default = "default_bid_uusd")]
    pub bid_uusd: String,
    /// FURY paid to each winner
    #[serde(default = "default_reward_amount")]
    pub reward_amount: String,
}

impl Default for GamingConfig {
    fn default() -> Self {
        Self {
            platform_fee: default_platform_fee(),
            transaction_fee: default_transaction_fee(),
            game_id: default_game_id(),
            pool_type: default_pool_type(),
            pool_fee: default_pool_fee(),
            min_teams_for_pool: default_teams(),
            max_teams_for_pool: default_teams(),
            max_teams_for_gamer: default_teams(),
            bid_uusd: default_bid_uusd(),
            reward_amount: default_reward_amount(),
        }
    }
}

fn default_platform_fee() -> String {
    "100".to_string()
}

fn default_transaction_fee() -> String {
    "30".to_string()
}

fn default_game_id() -> String {
    "Game001".to_string()
}

fn default_pool_type() -> String {
    "H2H".to_string()
}

fn default_pool_fee() -> String {
    "10000000".to_string()
}

fn default_teams() -> u32 {
    2
}

fn default_bid_uusd() -> String {
    "1000000".to_string()
}

fn default_reward_amount() -> String {
    "5000000".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default = "default_liquidity_uusd")]
    pub liquidity_uusd: String,
    #[serde(default = "default_liquidity_fury")]
    pub liquidity_fury: String,
    /// uusd each user offers when buying FURY
    #[serde(default = "default_buy_uusd")]
    pub buy_uusd: String,
    /// FURY each user offers when selling
    #[serde(default = "default_sell_fury")]
    pub sell_fury: String,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            liquidity_uusd: default_liquidity_uusd(),
            liquidity_fury: default_liquidity_fury(),
            buy_uusd: default_buy_uusd(),
            sell_fury: default_sell_fury(),
        }
    }
}

fn default_liquidity_uusd() -> String {
    "500000000".to_string()
}

fn default_liquidity_fury() -> String {
    "5000000000".to_string()
}

fn default_buy_uusd() -> String {
    "10000".to_string()
}

fn default_sell_fury() -> String {
    "1000000".to_string()
}

fn default_deployment_file() -> PathBuf {
    PathBuf::from("json/localterra.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::default(),
            deployment_file: default_deployment_file(),
            log_file: None,
            chain: ChainOverrides::default(),
            fee: FeeConfig::default(),
            wallets: WalletsConfig::default(),
            funding: FundingConfig::default(),
            contracts: ContractsConfig::default(),
            staking: StakingConfig::default(),
            gaming: GamingConfig::default(),
            swap: SwapConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(write_err)?;

        // Mnemonics live in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).map_err(write_err)?;
        }

        Ok(())
    }

    /// Check if config file exists
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Network preset with `[chain]` overrides applied
    pub fn chain_settings(&self) -> ChainSettings {
        let mut settings = self.network.preset();
        let overrides = &self.chain;

        if let Some(url) = &overrides.lcd_url {
            settings.lcd_url = url.clone();
        }
        if let Some(chain_id) = &overrides.chain_id {
            settings.chain_id = chain_id.clone();
        }
        if let Some(url) = &overrides.gas_prices_url {
            settings.gas_prices_url = Some(url.clone()).filter(|u| !u.is_empty());
        }
        if let Some(ms) = overrides.step_delay_ms {
            settings.step_delay = Duration::from_millis(ms);
        }
        if let Some(prefix) = &overrides.address_prefix {
            settings.address_prefix = prefix.clone();
        }
        if let Some(secs) = overrides.request_timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }

        settings
    }

    /// Number of admin accounts available to concurrent workers
    pub fn admin_count(&self) -> usize {
        self.wallets.admin_mnemonics.len()
    }

    /// Pick the admin mnemonic.
    ///
    /// An explicit `admin_mnemonic` wins. Otherwise `admin_shift` `n`
    /// (1-based, like LocalTerra's `test{n}`) selects `admin_mnemonics[n - 1]`,
    /// and no shift selects the first entry.
    pub fn admin_mnemonic(&self, admin_shift: Option<usize>) -> Result<&str, ConfigError> {
        if let Some(mnemonic) = &self.wallets.admin_mnemonic {
            return Ok(mnemonic);
        }

        let shift = admin_shift.unwrap_or(1);
        let available = self.admin_count();
        if shift == 0 {
            return Err(ConfigError::MissingAdmin { shift, available });
        }

        self.wallets
            .admin_mnemonics
            .get(shift - 1)
            .map(String::as_str)
            .ok_or(ConfigError::MissingAdmin { shift, available })
    }

    /// Instantiate message for the club staking contract.
    ///
    /// `club_reward_next_timestamp` is nanoseconds since the epoch, one
    /// reward period from `now`.
    pub fn club_staking_init(&self, admin: &str, fury_contract: &str, now: Duration) -> Value {
        let staking = &self.staking;
        let next_reward = now + Duration::from_secs(staking.reward_periodicity);

        json!({
            "admin_address": admin,
            "minting_contract_address": fury_contract,
            "platform_fees_collector_wallet": admin,
            "club_fee_collector_wallet": admin,
            "club_reward_next_timestamp": next_reward.as_nanos().to_string(),
            "reward_periodicity": staking.reward_periodicity,
            "club_price": staking.club_price,
            "bonding_duration": staking.bonding_duration,
        })
    }
}

/// Addresses of the contracts deployed ahead of the run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub fury_contract_address: String,
    pub proxy_contract_address: String,
}

impl Deployment {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| ConfigError::Deployment {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    PathBuf::from("load-test.toml")
}
