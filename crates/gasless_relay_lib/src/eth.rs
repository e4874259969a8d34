use crate::err_create;
use crate::err_from;
use crate::error::*;
use crate::rpc::{FeeQuote, MinedReceipt, RelayRpc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use secp256k1::{PublicKey, SecretKey};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha3::Digest;
use sha3::Keccak256;
use web3::transports::Http;
use web3::types::{Address, BlockNumber, Bytes, CallRequest, H256, U256};
use web3::{BatchTransport, Transport, Web3};

/// Chain node reached over plain JSON-RPC HTTP
pub struct Web3Rpc {
    endpoint: String,
    web3: Web3<Http>,
}

impl Web3Rpc {
    pub fn connect(endpoint: &str) -> Result<Self, RelayError> {
        let transport = Http::new(endpoint).map_err(err_from!())?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            web3: Web3::new(transport),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn rpc_error(phase: RpcPhase, message: String) -> RelayError {
    err_create!(ErrorBag::RpcError { phase, message })
}

fn decode_batch_item<T: DeserializeOwned>(
    item: Option<web3::Result<Value>>,
    phase: RpcPhase,
) -> Result<T, RelayError> {
    match item {
        Some(Ok(value)) => {
            serde_json::from_value(value).map_err(|err| rpc_error(phase, err.to_string()))
        }
        Some(Err(err)) => Err(rpc_error(phase, err.to_string())),
        None => Err(rpc_error(phase, "missing response in batch".to_string())),
    }
}

impl RelayRpc for Web3Rpc {
    fn fetch_fee_quote(&self, sender: Address) -> BoxFuture<'_, Result<FeeQuote, RelayError>> {
        async move {
            let transport = self.web3.transport();
            let requests = vec![
                transport.prepare("eth_chainId", vec![]),
                transport.prepare("eth_gasPrice", vec![]),
                transport.prepare("eth_maxPriorityFeePerGas", vec![]),
                transport.prepare(
                    "eth_getTransactionCount",
                    vec![
                        serde_json::to_value(sender).map_err(err_from!())?,
                        serde_json::to_value(BlockNumber::Pending).map_err(err_from!())?,
                    ],
                ),
            ];
            let mut responses = transport
                .send_batch(requests)
                .await
                .map_err(|err| rpc_error(RpcPhase::Request, err.to_string()))?
                .into_iter();

            let chain_id: U256 = decode_batch_item(responses.next(), RpcPhase::ChainId)?;
            let base_fee: U256 = decode_batch_item(responses.next(), RpcPhase::BaseFee)?;
            let priority_fee: U256 = decode_batch_item(responses.next(), RpcPhase::PriorityFee)?;
            let nonce: U256 = decode_batch_item(responses.next(), RpcPhase::Nonce)?;

            Ok(FeeQuote {
                chain_id: chain_id.low_u64(),
                base_fee,
                priority_fee,
                nonce: nonce.low_u64(),
            })
        }
        .boxed()
    }

    fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> BoxFuture<'_, Result<U256, RelayError>> {
        async move {
            let call_request = CallRequest {
                from: Some(from),
                to: Some(to),
                value: Some(value),
                data: Some(data),
                ..Default::default()
            };
            self.web3
                .eth()
                .estimate_gas(call_request, None)
                .await
                .map_err(|err| rpc_error(RpcPhase::GasEstimate, err.to_string()))
        }
        .boxed()
    }

    fn send_raw_transaction(&self, raw: Bytes) -> BoxFuture<'_, Result<H256, RelayError>> {
        async move {
            self.web3
                .eth()
                .send_raw_transaction(raw)
                .await
                .map_err(|err| err_create!(ErrorBag::BroadcastError(err.to_string())))
        }
        .boxed()
    }

    fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> BoxFuture<'_, Result<Option<MinedReceipt>, RelayError>> {
        async move {
            let receipt = self
                .web3
                .eth()
                .transaction_receipt(tx_hash)
                .await
                .map_err(|err| rpc_error(RpcPhase::Request, err.to_string()))?;
            Ok(receipt.map(|receipt| MinedReceipt {
                tx_hash: receipt.transaction_hash,
                block_number: receipt.block_number.map(|x| x.as_u64()),
                status: receipt.status.map(|x| x.as_u64()),
                gas_used: receipt.gas_used,
                effective_gas_price: receipt.effective_gas_price,
            }))
        }
        .boxed()
    }
}

pub fn get_eth_addr_from_secret(secret_key: &SecretKey) -> Address {
    Address::from_slice(
        &Keccak256::digest(
            &PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), secret_key)
                .serialize_uncompressed()[1..65],
        )
        .as_slice()[12..],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_get_eth_addr_from_secret() {
        let sk =
            SecretKey::from_str("0000000000000000000000000000000000000000000000000000000000000001")
                .unwrap();
        let addr = format!("{:#x}", get_eth_addr_from_secret(&sk));
        assert_eq!(addr, "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn test_decode_batch_item_reports_phase() {
        let res: Result<U256, RelayError> = decode_batch_item(
            Some(Err(web3::Error::Decoder("bad quantity".to_string()))),
            RpcPhase::PriorityFee,
        );
        let err = res.unwrap_err();
        assert!(matches!(
            err.inner,
            ErrorBag::RpcError {
                phase: RpcPhase::PriorityFee,
                ..
            }
        ));
        assert!(err.message().starts_with("failed to get priority fee"));

        let res: Result<U256, RelayError> =
            decode_batch_item(Some(Ok(Value::String("0x3b9aca00".to_string()))), RpcPhase::BaseFee);
        assert_eq!(res.unwrap(), U256::from(1_000_000_000u64));

        let res: Result<U256, RelayError> = decode_batch_item(None, RpcPhase::Nonce);
        assert!(matches!(
            res.unwrap_err().inner,
            ErrorBag::RpcError {
                phase: RpcPhase::Nonce,
                ..
            }
        ));
    }
}
