mod config_setup;
mod mock_rpc;

pub use config_setup::{
    mock_chain_client, setup_random_memory_sqlite_conn, test_signer, transfer_request,
    TEST_RELAYER_ADDRESS, TEST_RELAYER_KEY,
};
pub use mock_rpc::MockRpc;
