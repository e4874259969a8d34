use gasless_relay_common::create_sqlite_connection;
use gasless_relay_lib::relay::{PermitSignature, TransferRequest};
use gasless_relay_lib::rpc::RelayRpc;
use gasless_relay_lib::setup::ChainClient;
use gasless_relay_lib::signer::{load_private_key, PrivateKeySigner};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use web3::types::U256;

pub const TEST_RELAYER_KEY: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";
pub const TEST_RELAYER_ADDRESS: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

pub async fn setup_random_memory_sqlite_conn() -> SqlitePool {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let s: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();

    let db_name = format!("mem_{}", s);
    create_sqlite_connection(None, Some(&db_name), false, true)
        .await
        .expect("Failed to create memory sqlite connection")
}

pub fn test_signer() -> PrivateKeySigner {
    PrivateKeySigner::new(load_private_key(TEST_RELAYER_KEY).expect("valid test key"))
}

/// Chain client polling every millisecond, so timeouts stay fast in tests
pub fn mock_chain_client(
    network: &str,
    chain_id: i64,
    rpc: Arc<dyn RelayRpc>,
    legacy: bool,
    max_receipt_retries: u32,
) -> ChainClient {
    ChainClient {
        network: network.to_string(),
        chain_id,
        rpc,
        legacy,
        legacy_gas_price: U256::from(1_200_000_000u64),
        max_receipt_retries,
        poll_interval: Duration::from_millis(1),
        block_explorer_url: None,
    }
}

pub fn transfer_request(order_id: &str, chain: &str) -> TransferRequest {
    TransferRequest {
        owner: "0x1111111111111111111111111111111111111111".to_string(),
        recipient: TEST_RELAYER_ADDRESS.to_string(),
        transfer_to: "0x3333333333333333333333333333333333333333".to_string(),
        amount: "2500000".to_string(),
        deadline: "1900000000".to_string(),
        signature: PermitSignature {
            v: 27,
            r: format!("0x{}", "1a".repeat(32)),
            s: format!("0x{}", "2b".repeat(32)),
        },
        chain: chain.to_string(),
        token_address: "0x2222222222222222222222222222222222222222".to_string(),
        order_id: order_id.to_string(),
    }
}
