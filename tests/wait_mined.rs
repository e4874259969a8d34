use gasless_relay_common::error::{ErrorBag, RelayError};
use gasless_relay_lib::rpc::RelayRpc;
use gasless_relay_lib::transaction::wait_mined;
use gasless_relay_lib_test::MockRpc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use web3::types::{Bytes, H256};

const INTERVAL: Duration = Duration::from_millis(1);

#[tokio::test]
async fn test_exhausts_exactly_max_retries() {
    let rpc = MockRpc::new(137).never_mine();
    let tx_hash = H256::repeat_byte(3);

    let err = wait_mined(&rpc, tx_hash, 7, INTERVAL, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.inner,
        ErrorBag::ConfirmationTimeout { retries: 7, tx_hash: hash } if hash == tx_hash
    ));
    assert_eq!(rpc.receipt_calls(), 7);
}

#[tokio::test]
async fn test_returns_first_receipt() -> Result<(), RelayError> {
    let tx_hash = H256::repeat_byte(4);
    let rpc = MockRpc::new(137).with_known_transaction(tx_hash, 1);

    let receipt = wait_mined(&rpc, tx_hash, 10, INTERVAL, &CancellationToken::new()).await?;
    assert!(receipt.is_success());
    assert_eq!(receipt.tx_hash, tx_hash);
    assert_eq!(rpc.receipt_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_waits_until_mined() -> Result<(), RelayError> {
    let rpc = MockRpc::new(137).with_pending_polls(3);
    let tx_hash = rpc.send_raw_transaction(Bytes(vec![0xc0])).await?;

    let receipt = wait_mined(&rpc, tx_hash, 10, INTERVAL, &CancellationToken::new()).await?;
    assert_eq!(receipt.block_number, Some(100));
    assert_eq!(rpc.receipt_calls(), 4);
    Ok(())
}

#[tokio::test]
async fn test_reverted_receipt_is_returned() -> Result<(), RelayError> {
    let tx_hash = H256::repeat_byte(5);
    let rpc = MockRpc::new(137).with_known_transaction(tx_hash, 0);

    let receipt = wait_mined(&rpc, tx_hash, 10, INTERVAL, &CancellationToken::new()).await?;
    assert!(!receipt.is_success());
    assert_eq!(receipt.status, Some(0));
    assert_eq!(rpc.receipt_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_between_attempts() {
    let rpc = MockRpc::new(137).never_mine();
    let tx_hash = H256::repeat_byte(6);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = wait_mined(&rpc, tx_hash, 100, Duration::from_secs(60), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.inner, ErrorBag::Cancelled(hash) if hash == tx_hash));
    // the first query still happens, cancellation is observed while waiting
    assert_eq!(rpc.receipt_calls(), 1);
}

#[tokio::test]
async fn test_failed_queries_consume_retries() -> Result<(), RelayError> {
    let tx_hash = H256::repeat_byte(8);
    let rpc = MockRpc::new(137)
        .with_known_transaction(tx_hash, 1)
        .fail_receipt_queries(3);

    let receipt = wait_mined(&rpc, tx_hash, 10, INTERVAL, &CancellationToken::new()).await?;
    assert!(receipt.is_success());
    assert_eq!(rpc.receipt_calls(), 4);
    Ok(())
}

#[tokio::test]
async fn test_failing_node_times_out() {
    let tx_hash = H256::repeat_byte(9);
    let rpc = MockRpc::new(137)
        .with_known_transaction(tx_hash, 1)
        .fail_receipt_queries(5);

    let err = wait_mined(&rpc, tx_hash, 5, INTERVAL, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.inner,
        ErrorBag::ConfirmationTimeout { retries: 5, tx_hash: hash } if hash == tx_hash
    ));
    assert_eq!(rpc.receipt_calls(), 5);
}
