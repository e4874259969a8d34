use crate::config::{Config, DEFAULT_LEGACY_GAS_PRICE, DEFAULT_RECEIPT_POLL_INTERVAL_MS};
use crate::err_create;
use crate::error::{ErrorBag, RelayError};
use crate::eth::Web3Rpc;
use crate::rpc::RelayRpc;
use crate::transaction::FeePolicy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use web3::types::U256;

/// RPC handle plus the fee and confirmation policy of one configured chain
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainClient {
    pub network: String,
    pub chain_id: i64,
    #[serde(skip_serializing)]
    pub rpc: Arc<dyn RelayRpc>,
    pub legacy: bool,
    pub legacy_gas_price: U256,
    pub max_receipt_retries: u32,
    pub poll_interval: Duration,
    pub block_explorer_url: Option<String>,
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("network", &self.network)
            .field("chain_id", &self.chain_id)
            .field("legacy", &self.legacy)
            .field("max_receipt_retries", &self.max_receipt_retries)
            .finish()
    }
}

impl ChainClient {
    pub fn fee_policy(&self) -> FeePolicy {
        if self.legacy {
            FeePolicy::Legacy {
                gas_price: self.legacy_gas_price,
            }
        } else {
            FeePolicy::FeeMarket
        }
    }

    pub fn explorer_link(&self, tx_hash: web3::types::H256) -> Option<String> {
        self.block_explorer_url
            .as_ref()
            .map(|url| format!("{}/tx/{:#x}", url.trim_end_matches('/'), tx_hash))
    }
}

/// Chain clients keyed by network name, built once at startup and never mutated
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    clients: BTreeMap<String, Arc<ChainClient>>,
}

impl ChainRegistry {
    pub fn connect(config: &Config) -> Result<Self, RelayError> {
        let mut clients = Vec::with_capacity(config.chain.len());
        for (network, chain_config) in &config.chain {
            let rpc = Web3Rpc::connect(&chain_config.rpc_endpoint)?;
            log::info!(
                "Connected chain {} (id {}, legacy fees: {}) to {}",
                network,
                chain_config.chain_id,
                chain_config.legacy,
                rpc.endpoint()
            );
            clients.push(ChainClient {
                network: network.clone(),
                chain_id: chain_config.chain_id,
                rpc: Arc::new(rpc),
                legacy: chain_config.legacy,
                legacy_gas_price: U256::from(
                    chain_config
                        .legacy_gas_price
                        .unwrap_or(DEFAULT_LEGACY_GAS_PRICE),
                ),
                max_receipt_retries: chain_config.max_receipt_retries,
                poll_interval: Duration::from_millis(
                    chain_config
                        .receipt_poll_interval_ms
                        .unwrap_or(DEFAULT_RECEIPT_POLL_INTERVAL_MS),
                ),
                block_explorer_url: chain_config.block_explorer_url.clone(),
            });
        }
        Ok(Self::from_clients(clients))
    }

    pub fn from_clients(clients: Vec<ChainClient>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|client| (client.network.clone(), Arc::new(client)))
                .collect(),
        }
    }

    pub fn lookup(&self, network: &str) -> Result<Arc<ChainClient>, RelayError> {
        self.clients
            .get(network)
            .cloned()
            .ok_or_else(|| err_create!(ErrorBag::ChainNotFound(network.to_string())))
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[engine]
max-in-flight = 1
queue-capacity = 10
automatic-recover = false

[chain.amoy]
chain-name = "amoy"
chain-id = 80002
rpc-endpoint = "http://127.0.0.1:8545"
max-receipt-retries = 5
transfer-queue = "gasless"
block-explorer-url = "https://amoy.polygonscan.com/"
native-token = { symbol = "POL", address = "0x0000000000000000000000000000000000001010", decimals = 18 }
"#;

    #[test]
    fn test_registry_lookup() {
        let config = Config::load_from_str(CONFIG).unwrap();
        let registry = ChainRegistry::connect(&config).unwrap();
        let client = registry.lookup("amoy").unwrap();
        assert_eq!(client.chain_id, 80002);
        assert_eq!(client.legacy_gas_price, U256::from(DEFAULT_LEGACY_GAS_PRICE));
        assert_eq!(client.poll_interval, Duration::from_secs(1));
        assert_eq!(
            client.explorer_link(web3::types::H256::zero()).unwrap(),
            format!("https://amoy.polygonscan.com/tx/{:#x}", web3::types::H256::zero())
        );

        let err = registry.lookup("mainnet").unwrap_err();
        assert!(matches!(err.inner, ErrorBag::ChainNotFound(ref name) if name == "mainnet"));
        assert_eq!(err.message(), "chain mainnet not found");
    }
}
