//! Bridge configuration
//!
//! Loaded once at startup from the environment (optionally seeded from a
//! `.env` file) and passed by reference into every role.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};

use crate::error::BridgeError;
use crate::redact::Redacted;
use crate::tokens::{to_token_units, DEFAULT_DECIMALS};

/// Chain A defaults (BSC testnet deployment)
const DEFAULT_CHAIN_A_NAME: &str = "BSC Testnet";
const DEFAULT_CHAIN_A_ID: u64 = 97;
const DEFAULT_CHAIN_A_BRIDGE: &str = "0x0CD517ba2C211BB1bA3a33CC959FF8764EaE39af";
const DEFAULT_CHAIN_A_TOKEN: &str = "0xa2a00beCACd814DfaE89545c7109998F7fd87FB4";

/// Chain B defaults (Polygon Amoy deployment)
const DEFAULT_CHAIN_B_NAME: &str = "Polygon Amoy";
const DEFAULT_CHAIN_B_ID: u64 = 80002;
const DEFAULT_CHAIN_B_BRIDGE: &str = "0xa2a00beCACd814DfaE89545c7109998F7fd87FB4";
const DEFAULT_CHAIN_B_TOKEN: &str = "0x48d6336828Cf62e5765885192e588cbCA7465532";

const DEFAULT_SEND_AMOUNT: &str = "10";

/// RPC endpoint identity of one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    /// Human-readable name used in logs
    pub name: String,
    /// Native EVM chain ID
    pub chain_id: u64,
    pub rpc_url: String,
}

/// One side of the bridge: endpoint plus deployed contracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub endpoint: ChainEndpoint,
    pub bridge_address: Address,
    pub token_address: Address,
}

/// Which way tokens move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    AToB,
    BToA,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => f.write_str("A->B"),
            Direction::BToA => f.write_str("B->A"),
        }
    }
}

/// Event polling settings for listener roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    /// Blocks behind head treated as safe to read
    pub finality_blocks: u64,
    /// Maximum block span per eth_getLogs query
    pub max_block_range: u64,
    /// First block to scan; `None` starts at the current safe head
    pub start_block: Option<u64>,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            finality_blocks: 0,
            max_block_range: 10_000,
            start_block: None,
        }
    }
}

/// Health/metrics HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSettings {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chain_a: ChainConfig,
    pub chain_b: ChainConfig,

    /// Bridge owner key, signs `unlock`
    pub owner_private_key: Redacted<String>,
    /// End-user key, signs `approve` and `lock`
    pub client_private_key: Redacted<String>,

    pub token_decimals: u8,
    /// Default lock amount in raw token units
    pub send_amount: U256,
    /// Extra native balance required on top of "non-zero" before sending
    pub min_native_balance: U256,

    /// `None` waits for receipts indefinitely
    pub confirmation_timeout: Option<Duration>,

    pub watcher: WatcherSettings,

    /// `None` disables the health server
    pub health: Option<HealthSettings>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Callers seed the environment from `.env` first (see `main`).
    pub fn from_env() -> Result<Self, BridgeError> {
        let owner_private_key = normalize_private_key(&required("PRIVATE_KEY")?);
        let client_private_key = normalize_private_key(&required("PRIVATE_KEY_CLIENT")?);

        let chain_a = ChainConfig {
            endpoint: ChainEndpoint {
                name: env::var("CHAIN_A_NAME").unwrap_or_else(|_| DEFAULT_CHAIN_A_NAME.to_string()),
                chain_id: parse_or("CHAIN_A_ID", DEFAULT_CHAIN_A_ID)?,
                rpc_url: required_with_fallback("CHAIN_A_RPC_URL", "BSC_RPC_URL")?,
            },
            bridge_address: address_or("CHAIN_A_BRIDGE_ADDRESS", DEFAULT_CHAIN_A_BRIDGE)?,
            token_address: address_or("CHAIN_A_TOKEN_ADDRESS", DEFAULT_CHAIN_A_TOKEN)?,
        };

        let chain_b = ChainConfig {
            endpoint: ChainEndpoint {
                name: env::var("CHAIN_B_NAME").unwrap_or_else(|_| DEFAULT_CHAIN_B_NAME.to_string()),
                chain_id: parse_or("CHAIN_B_ID", DEFAULT_CHAIN_B_ID)?,
                rpc_url: required_with_fallback("CHAIN_B_RPC_URL", "POLYGON_RPC_URL")?,
            },
            bridge_address: address_or("CHAIN_B_BRIDGE_ADDRESS", DEFAULT_CHAIN_B_BRIDGE)?,
            token_address: address_or("CHAIN_B_TOKEN_ADDRESS", DEFAULT_CHAIN_B_TOKEN)?,
        };

        let token_decimals = parse_or("TOKEN_DECIMALS", DEFAULT_DECIMALS)?;
        let send_amount = to_token_units(
            &env::var("SEND_AMOUNT").unwrap_or_else(|_| DEFAULT_SEND_AMOUNT.to_string()),
            token_decimals,
        )?;

        let min_native_balance = match env::var("MIN_NATIVE_BALANCE_WEI") {
            Ok(raw) => U256::from_str(raw.trim()).map_err(|e| {
                BridgeError::Config(format!("Invalid MIN_NATIVE_BALANCE_WEI {}: {}", raw, e))
            })?,
            Err(_) => U256::ZERO,
        };

        let confirmation_timeout =
            optional::<u64>("CONFIRMATION_TIMEOUT_SECS")?.map(Duration::from_secs);
        if confirmation_timeout == Some(Duration::ZERO) {
            return Err(BridgeError::Config(
                "CONFIRMATION_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let defaults = WatcherSettings::default();
        let watcher = WatcherSettings {
            poll_interval: optional::<u64>("POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            finality_blocks: parse_or("FINALITY_BLOCKS", defaults.finality_blocks)?,
            max_block_range: parse_or("MAX_BLOCK_RANGE", defaults.max_block_range)?,
            start_block: optional("START_BLOCK")?,
        };
        if watcher.poll_interval.is_zero() {
            return Err(BridgeError::Config(
                "POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if watcher.max_block_range == 0 {
            return Err(BridgeError::Config(
                "MAX_BLOCK_RANGE must be greater than zero".to_string(),
            ));
        }

        let health = optional::<u16>("HEALTH_PORT")?.map(|port| HealthSettings {
            bind_address: env::var("HEALTH_BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
        });

        Ok(Self {
            chain_a,
            chain_b,
            owner_private_key: Redacted::new(owner_private_key),
            client_private_key: Redacted::new(client_private_key),
            token_decimals,
            send_amount,
            min_native_balance,
            confirmation_timeout,
            watcher,
            health,
        })
    }

    /// (source, destination) chains for a direction
    pub fn route(&self, direction: Direction) -> (&ChainConfig, &ChainConfig) {
        match direction {
            Direction::AToB => (&self.chain_a, &self.chain_b),
            Direction::BToA => (&self.chain_b, &self.chain_a),
        }
    }
}

/// Accept keys with or without the `0x` prefix
pub fn normalize_private_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        format!("0x{}", &trimmed[2..])
    } else {
        format!("0x{}", trimmed)
    }
}

fn required(name: &str) -> Result<String, BridgeError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(BridgeError::Config(format!("{} required", name))),
    }
}

fn required_with_fallback(name: &str, fallback: &str) -> Result<String, BridgeError> {
    required(name)
        .or_else(|_| required(fallback))
        .map_err(|_| BridgeError::Config(format!("{} (or {}) required", name, fallback)))
}

fn optional<T: FromStr>(name: &str) -> Result<Option<T>, BridgeError>
where
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BridgeError::Config(format!("Invalid {} {:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, BridgeError>
where
    T::Err: fmt::Display,
{
    Ok(optional(name)?.unwrap_or(default))
}

fn address_or(name: &str, default: &str) -> Result<Address, BridgeError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Address::from_str(raw.trim())
        .map_err(|e| BridgeError::Config(format!("Invalid {} {}: {}", name, raw, e)))
}
