use crate::error::RelayError;
use futures_util::future::BoxFuture;
use serde::Serialize;
use web3::types::{Address, Bytes, H256, U256};

/// Network parameters fetched fresh for every transaction attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub chain_id: u64,
    pub base_fee: U256,
    pub priority_fee: U256,
    pub nonce: u64,
}

/// The parts of a transaction receipt the relayer cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinedReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub status: Option<u64>,
    pub gas_used: Option<U256>,
    pub effective_gas_price: Option<U256>,
}

impl MinedReceipt {
    pub fn is_success(&self) -> bool {
        self.status == Some(1)
    }

    pub fn fee_paid(&self) -> Option<U256> {
        self.gas_used?.checked_mul(self.effective_gas_price?)
    }
}

/// JSON-RPC calls the relay engine issues against a chain node.
///
/// `Web3Rpc` is the production implementation, tests plug in scripted ones.
pub trait RelayRpc: Send + Sync {
    /// One batched request for chain id, base fee, priority fee and pending nonce of `sender`
    fn fetch_fee_quote(&self, sender: Address) -> BoxFuture<'_, Result<FeeQuote, RelayError>>;

    fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> BoxFuture<'_, Result<U256, RelayError>>;

    fn send_raw_transaction(&self, raw: Bytes) -> BoxFuture<'_, Result<H256, RelayError>>;

    /// `Ok(None)` when the transaction is not mined yet
    fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> BoxFuture<'_, Result<Option<MinedReceipt>, RelayError>>;
}
