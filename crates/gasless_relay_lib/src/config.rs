use serde::Deserialize;
use std::collections::btree_map::BTreeMap as Map;

use std::path::Path;

use crate::error::*;
use crate::{err_custom_create, err_from};
use tokio::fs;
use web3::types::Address;

/// 1.2 gwei, price used for every transaction on legacy chains
pub const DEFAULT_LEGACY_GAS_PRICE: u64 = 1_200_000_000;
pub const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Engine {
    /// Number of jobs processed at the same time, 1 means strictly sequential
    pub max_in_flight: usize,
    /// Capacity of the in-process transfer queue
    pub queue_capacity: usize,
    /// Resume orders left in pending/processing on startup
    pub automatic_recover: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub chain: Map<String, Chain>,
    pub engine: Engine,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct NativeToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Chain {
    pub chain_name: String,
    pub chain_id: i64,
    pub rpc_endpoint: String,
    #[serde(default)]
    pub legacy: bool,
    pub max_receipt_retries: u32,
    pub transfer_queue: String,
    pub native_token: NativeToken,
    pub legacy_gas_price: Option<u64>,
    pub receipt_poll_interval_ms: Option<u64>,
    pub block_explorer_url: Option<String>,
}

impl Config {
    pub fn load_from_str(str: &str) -> Result<Self, RelayError> {
        let config: Config = match toml::from_str(str) {
            Ok(config) => config,
            Err(e) => return Err(err_custom_create!("Failed to parse toml {}: {}", str, e)),
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn load<P: AsRef<Path> + std::fmt::Display>(path: P) -> Result<Self, RelayError> {
        let content = fs::read_to_string(&path).await.map_err(err_from!())?;
        let config: Config = match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => return Err(err_custom_create!("Failed to parse toml {}: {}", path, e)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.chain.is_empty() {
            return Err(err_custom_create!("No chains configured"));
        }
        if self.engine.max_in_flight == 0 {
            return Err(err_custom_create!("engine.max-in-flight has to be at least 1"));
        }
        if self.engine.queue_capacity == 0 {
            return Err(err_custom_create!("engine.queue-capacity has to be at least 1"));
        }
        for (name, chain) in &self.chain {
            if chain.chain_name.is_empty() {
                return Err(err_custom_create!("Chain {} has empty chain-name", name));
            }
            if chain.chain_id <= 0 {
                return Err(err_custom_create!("Chain {} has invalid chain-id", name));
            }
            if let Err(err) = url::Url::parse(&chain.rpc_endpoint) {
                return Err(err_custom_create!(
                    "Chain {} has invalid rpc-endpoint {}: {}",
                    name,
                    chain.rpc_endpoint,
                    err
                ));
            }
            if chain.max_receipt_retries == 0 {
                return Err(err_custom_create!(
                    "Chain {} has to allow at least one receipt retry",
                    name
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[engine]
max-in-flight = 4
queue-capacity = 100
automatic-recover = true

[chain.polygon]
chain-name = "polygon"
chain-id = 137
rpc-endpoint = "https://polygon-rpc.com"
max-receipt-retries = 30
transfer-queue = "gasless"
native-token = { symbol = "POL", address = "0x0000000000000000000000000000000000001010", decimals = 18 }

[chain.bsc]
chain-name = "bsc"
chain-id = 56
rpc-endpoint = "https://bsc-dataseed.binance.org"
legacy = true
max-receipt-retries = 20
transfer-queue = "gasless"
legacy-gas-price = 3000000000
native-token = { symbol = "BNB", address = "0x0000000000000000000000000000000000000000", decimals = 18 }
"#;

    #[test]
    fn test_load_config() {
        let config = Config::load_from_str(CONFIG).unwrap();
        assert_eq!(config.engine.max_in_flight, 4);
        let polygon = config.chain.get("polygon").unwrap();
        assert!(!polygon.legacy);
        assert_eq!(polygon.legacy_gas_price, None);
        assert_eq!(polygon.native_token.symbol, "POL");
        let bsc = config.chain.get("bsc").unwrap();
        assert!(bsc.legacy);
        assert_eq!(bsc.legacy_gas_price, Some(3_000_000_000));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let broken = CONFIG.replace("max-receipt-retries = 30\n", "");
        assert!(Config::load_from_str(&broken).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let broken = CONFIG.replace("https://polygon-rpc.com", "not an url");
        assert!(Config::load_from_str(&broken).is_err());
        let broken = CONFIG.replace("max-receipt-retries = 20", "max-receipt-retries = 0");
        assert!(Config::load_from_str(&broken).is_err());
        let broken = CONFIG.replace("max-in-flight = 4", "max-in-flight = 0");
        assert!(Config::load_from_str(&broken).is_err());
    }
}
