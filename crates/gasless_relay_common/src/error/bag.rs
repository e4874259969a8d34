use super::CustomError;
use std::fmt::{Display, Formatter};
use web3::types::H256;

/// Which quantity of the batched fee request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcPhase {
    ChainId,
    BaseFee,
    PriorityFee,
    Nonce,
    GasEstimate,
    Request,
}

impl Display for RpcPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RpcPhase::ChainId => "chain ID",
            RpcPhase::BaseFee => "base fee",
            RpcPhase::PriorityFee => "priority fee",
            RpcPhase::Nonce => "pending nonce",
            RpcPhase::GasEstimate => "gas estimate",
            RpcPhase::Request => "RPC response",
        };
        write!(f, "{name}")
    }
}

/// Enum containing all possible errors used by the relayer.
///
/// The first group is the relay taxonomy, the rest wraps library errors.
#[derive(Debug, thiserror::Error)]
pub enum ErrorBag {
    #[error("invalid message: {0}")]
    DecodeError(String),
    #[error("order {0} already exists")]
    DuplicateOrder(String),
    #[error("chain {0} not found")]
    ChainNotFound(String),
    #[error("failed to get {phase}: {message}")]
    RpcError { phase: RpcPhase, message: String },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid deadline: {0}")]
    InvalidDeadline(String),
    #[error("failed to build transaction: {0}")]
    BuildError(String),
    #[error("failed to sign transaction: {0}")]
    SignError(String),
    #[error("failed to send transaction: {0}")]
    BroadcastError(String),
    #[error("failed to get receipt after {retries} retries for txn: {tx_hash:#x}")]
    ConfirmationTimeout { retries: u32, tx_hash: H256 },
    #[error("waiting for receipt of txn {0:#x} was cancelled")]
    Cancelled(H256),
    #[error("{step} transaction failed, receipt status not 1, txn: {tx_hash:#x}")]
    SettlementFailure { step: String, tx_hash: H256 },
    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("{0}")]
    CustomError(#[from] CustomError),
    #[error("{0:?}")]
    SQLxError(#[from] sqlx::Error),
    #[error("{0:?}")]
    SQLxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("{0:?}")]
    Web3Error(#[from] web3::Error),
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("{0}")]
    IoError(#[from] std::io::Error),
}
