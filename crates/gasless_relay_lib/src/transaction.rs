use crate::err_create;
use crate::error::*;
use crate::rpc::{FeeQuote, MinedReceipt, RelayRpc};
use crate::setup::ChainClient;
use crate::signer::Signer;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use web3::types::{Address, Bytes, SignedTransaction, TransactionParameters, H256, U256, U64};

/// Gas limit used for `permit` and `transferFrom` calls
pub const CONTRACT_CALL_GAS_LIMIT: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// Type 2 transaction priced from the fetched base and priority fee
    FeeMarket,
    /// Type 0 transaction with a fixed gas price
    Legacy { gas_price: U256 },
}

/// Base fee with a 20% margin for the next blocks, `None` on uint256 overflow
pub fn boosted_base_fee(base_fee: U256) -> Option<U256> {
    base_fee.checked_add(base_fee / 5)
}

pub fn build_transaction(
    policy: FeePolicy,
    quote: &FeeQuote,
    to: Address,
    value: U256,
    data: Vec<u8>,
    gas: U256,
) -> Result<TransactionParameters, RelayError> {
    let boosted = boosted_base_fee(quote.base_fee);
    Ok(match policy {
        FeePolicy::FeeMarket => TransactionParameters {
            nonce: Some(U256::from(quote.nonce)),
            to: Some(to),
            gas,
            gas_price: None,
            value,
            data: Bytes(data),
            chain_id: Some(quote.chain_id),
            transaction_type: Some(U64::from(2)),
            access_list: None,
            max_fee_per_gas: Some(
                boosted
                    .and_then(|boosted| boosted.checked_add(quote.priority_fee))
                    .ok_or_else(|| {
                        err_create!(ErrorBag::BuildError(format!(
                            "fee cap overflows uint256, base fee {} priority fee {}",
                            quote.base_fee, quote.priority_fee
                        )))
                    })?,
            ),
            max_priority_fee_per_gas: Some(quote.priority_fee),
        },
        FeePolicy::Legacy { gas_price } => {
            // the fetched base fee does not influence legacy pricing
            log::debug!(
                "Legacy chain {}: boosted base fee {:?} ignored, using gas price {}",
                quote.chain_id,
                boosted,
                gas_price
            );
            TransactionParameters {
                nonce: Some(U256::from(quote.nonce)),
                to: Some(to),
                gas,
                gas_price: Some(gas_price),
                value,
                data: Bytes(data),
                chain_id: Some(quote.chain_id),
                transaction_type: None,
                access_list: None,
                max_fee_per_gas: None,
                max_priority_fee_per_gas: None,
            }
        }
    })
}

async fn fetch_fee_quote(client: &ChainClient, sender: Address) -> Result<FeeQuote, RelayError> {
    let quote = client.rpc.fetch_fee_quote(sender).await?;
    if quote.chain_id as i64 != client.chain_id {
        log::warn!(
            "Node of {} reports chain id {}, configured {}",
            client.network,
            quote.chain_id,
            client.chain_id
        );
    }
    log::debug!(
        "Fee quote on {}: base fee {}, priority fee {}, nonce {}",
        client.network,
        quote.base_fee,
        quote.priority_fee,
        quote.nonce
    );
    Ok(quote)
}

/// Zero value contract call with the fixed gas limit
pub async fn prepare_contract_call(
    client: &ChainClient,
    sender: Address,
    contract: Address,
    data: Vec<u8>,
) -> Result<TransactionParameters, RelayError> {
    let quote = fetch_fee_quote(client, sender).await?;
    build_transaction(
        client.fee_policy(),
        &quote,
        contract,
        U256::zero(),
        data,
        U256::from(CONTRACT_CALL_GAS_LIMIT),
    )
}

/// Native currency transfer, gas limit comes from the node's estimate
pub async fn prepare_value_transfer(
    client: &ChainClient,
    sender: Address,
    to: Address,
    value: U256,
) -> Result<TransactionParameters, RelayError> {
    let quote = fetch_fee_quote(client, sender).await?;
    let gas = client
        .rpc
        .estimate_gas(sender, to, value, Bytes::default())
        .await?;
    build_transaction(client.fee_policy(), &quote, to, value, vec![], gas)
}

pub async fn sign_transaction(
    signer: &dyn Signer,
    tp: TransactionParameters,
) -> Result<SignedTransaction, RelayError> {
    signer
        .sign(tp)
        .await
        .map_err(|err| err_create!(ErrorBag::SignError(err.message)))
}

pub async fn broadcast(
    client: &ChainClient,
    signed: &SignedTransaction,
) -> Result<H256, RelayError> {
    let tx_hash = client
        .rpc
        .send_raw_transaction(signed.raw_transaction.clone())
        .await?;
    if tx_hash != signed.transaction_hash {
        log::warn!(
            "Node returned hash {:#x}, locally computed {:#x}",
            tx_hash,
            signed.transaction_hash
        );
    }
    Ok(tx_hash)
}

/// Poll for the receipt of `tx_hash`, at most `max_retries` queries spaced by `interval`.
///
/// A failed query counts as an attempt. Cancellation is only observed between attempts.
/// Receipts are returned whatever their status.
pub async fn wait_mined(
    rpc: &dyn RelayRpc,
    tx_hash: H256,
    max_retries: u32,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<MinedReceipt, RelayError> {
    let mut retries: u32 = 0;
    loop {
        match rpc.transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => {
                log::debug!(
                    "Receipt for {:#x} found after {} retries, status {:?}",
                    tx_hash,
                    retries,
                    receipt.status
                );
                return Ok(receipt);
            }
            Ok(None) => {
                log::debug!("Transaction {:#x} not mined yet", tx_hash);
            }
            Err(err) => {
                log::warn!("Failed to query receipt of {:#x}: {}", tx_hash, err);
            }
        }
        retries += 1;
        if retries >= max_retries {
            return Err(err_create!(ErrorBag::ConfirmationTimeout { retries, tx_hash }));
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(err_create!(ErrorBag::Cancelled(tx_hash)));
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(base_fee: u64, priority_fee: u64) -> FeeQuote {
        FeeQuote {
            chain_id: 137,
            base_fee: U256::from(base_fee),
            priority_fee: U256::from(priority_fee),
            nonce: 7,
        }
    }

    #[test]
    fn test_boosted_base_fee() {
        assert_eq!(boosted_base_fee(U256::from(100)), Some(U256::from(120)));
        assert_eq!(boosted_base_fee(U256::from(9)), Some(U256::from(10)));
        assert_eq!(boosted_base_fee(U256::zero()), Some(U256::zero()));
        assert_eq!(boosted_base_fee(U256::MAX - U256::MAX / 10), None);
    }

    #[test]
    fn test_fee_market_transaction() {
        let tp = build_transaction(
            FeePolicy::FeeMarket,
            &quote(30_000_000_000, 2_000_000_000),
            Address::repeat_byte(0x22),
            U256::zero(),
            vec![1, 2, 3],
            U256::from(CONTRACT_CALL_GAS_LIMIT),
        )
        .unwrap();
        assert_eq!(tp.transaction_type, Some(U64::from(2)));
        assert_eq!(tp.max_fee_per_gas, Some(U256::from(38_000_000_000u64)));
        assert_eq!(tp.max_priority_fee_per_gas, Some(U256::from(2_000_000_000u64)));
        assert_eq!(tp.gas_price, None);
        assert_eq!(tp.nonce, Some(U256::from(7)));
        assert_eq!(tp.chain_id, Some(137));
        assert_eq!(tp.gas, U256::from(100_000));
        assert_eq!(tp.value, U256::zero());
        assert_eq!(tp.data.0, vec![1, 2, 3]);
    }

    #[test]
    fn test_fee_cap_above_base_fee() {
        for base_fee in [1u64, 5, 6, 1_000, 25_000_000_000] {
            let tp = build_transaction(
                FeePolicy::FeeMarket,
                &quote(base_fee, 0),
                Address::zero(),
                U256::zero(),
                vec![],
                U256::from(CONTRACT_CALL_GAS_LIMIT),
            )
            .unwrap();
            let fee_cap = tp.max_fee_per_gas.unwrap();
            assert!(fee_cap >= U256::from(base_fee) + U256::from(base_fee) / 5);
            assert!(fee_cap >= U256::from(base_fee));
        }
    }

    #[test]
    fn test_legacy_transaction() {
        let tp = build_transaction(
            FeePolicy::Legacy {
                gas_price: U256::from(1_200_000_000u64),
            },
            &quote(90_000_000_000, 2_000_000_000),
            Address::repeat_byte(0x22),
            U256::zero(),
            vec![],
            U256::from(CONTRACT_CALL_GAS_LIMIT),
        )
        .unwrap();
        assert_eq!(tp.gas_price, Some(U256::from(1_200_000_000u64)));
        assert_eq!(tp.transaction_type, None);
        assert_eq!(tp.max_fee_per_gas, None);
        assert_eq!(tp.chain_id, Some(137));
    }

    #[test]
    fn test_fee_overflow_is_build_error() {
        let huge = FeeQuote {
            chain_id: 137,
            base_fee: U256::MAX - U256::from(1),
            priority_fee: U256::zero(),
            nonce: 0,
        };
        let err = build_transaction(
            FeePolicy::FeeMarket,
            &huge,
            Address::zero(),
            U256::zero(),
            vec![],
            U256::from(CONTRACT_CALL_GAS_LIMIT),
        )
        .unwrap_err();
        assert!(matches!(err.inner, ErrorBag::BuildError(_)));

        // boost fits, adding the priority fee does not
        let tight = FeeQuote {
            chain_id: 137,
            base_fee: U256::MAX / 2,
            priority_fee: U256::MAX / 2,
            nonce: 0,
        };
        let err = build_transaction(
            FeePolicy::FeeMarket,
            &tight,
            Address::zero(),
            U256::zero(),
            vec![],
            U256::from(CONTRACT_CALL_GAS_LIMIT),
        )
        .unwrap_err();
        assert!(matches!(err.inner, ErrorBag::BuildError(_)));

        // legacy pricing never uses the base fee
        let tp = build_transaction(
            FeePolicy::Legacy {
                gas_price: U256::from(1_200_000_000u64),
            },
            &huge,
            Address::zero(),
            U256::zero(),
            vec![],
            U256::from(CONTRACT_CALL_GAS_LIMIT),
        )
        .unwrap();
        assert_eq!(tp.gas_price, Some(U256::from(1_200_000_000u64)));
    }
}
