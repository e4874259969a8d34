mod private;

pub use private::{load_private_key, PrivateKeySigner};

use futures_util::future::BoxFuture;
use web3::types::{Address, SignedTransaction, TransactionParameters};

#[derive(Debug)]
pub struct SignerError {
    pub message: String,
}

impl std::fmt::Display for SignerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Signs transactions paid by the relayer account.
///
/// The chain id travels inside `TransactionParameters`, so implementations
/// never need to reach the network.
pub trait Signer: Send + Sync {
    /// Public address of the account paying for gas
    fn address(&self) -> Address;

    fn sign(
        &self,
        tp: TransactionParameters,
    ) -> BoxFuture<'_, Result<SignedTransaction, SignerError>>;
}
