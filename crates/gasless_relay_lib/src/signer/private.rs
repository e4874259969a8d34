use crate::err_custom_create;
use crate::error::RelayError;
use crate::eth::get_eth_addr_from_secret;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use lazy_static::lazy_static;
use secp256k1::SecretKey;
use std::str::FromStr;
use web3::transports::Http;
use web3::types::{Address, SignedTransaction, TransactionParameters};
use web3::Web3;

use super::{Signer, SignerError};

lazy_static! {
    // Never contacted: every parameter is filled before signing
    static ref DUMMY_RPC_PROVIDER: Web3<Http> = {
        let transport = web3::transports::Http::new("http://noconn").unwrap();
        Web3::new(transport)
    };
}

/// Parse a hex encoded secret key, with or without the 0x prefix
pub fn load_private_key(key: &str) -> Result<SecretKey, RelayError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    SecretKey::from_str(key).map_err(|err| err_custom_create!("Failed to parse private key: {err}"))
}

/// Signer holding a single key injected at construction
pub struct PrivateKeySigner {
    secret_key: SecretKey,
    address: Address,
}

impl PrivateKeySigner {
    pub fn new(secret_key: SecretKey) -> Self {
        Self {
            address: get_eth_addr_from_secret(&secret_key),
            secret_key,
        }
    }
}

impl Signer for PrivateKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(
        &self,
        tp: TransactionParameters,
    ) -> BoxFuture<'_, Result<SignedTransaction, SignerError>> {
        async move {
            if tp.chain_id.is_none() || tp.nonce.is_none() {
                return Err(SignerError {
                    message: "chain id and nonce have to be set before signing".to_string(),
                });
            }
            DUMMY_RPC_PROVIDER
                .accounts()
                .sign_transaction(tp, &self.secret_key)
                .await
                .map_err(|err| SignerError {
                    message: format!("Error when signing transaction in PrivateKeySigner {err}"),
                })
        }
        .boxed()
    }
}
