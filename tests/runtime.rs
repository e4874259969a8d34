use gasless_relay_common::error::RelayError;
use gasless_relay_lib::config::Config;
use gasless_relay_lib::db::model::OrderStatus;
use gasless_relay_lib::db::ops::*;
use gasless_relay_lib::runtime::{start_relay_engine, RelayRuntime};
use gasless_relay_lib::setup::ChainRegistry;
use gasless_relay_lib_test::*;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = r#"
[engine]
max-in-flight = 2
queue-capacity = 16
automatic-recover = true

[chain.polygon]
chain-name = "polygon"
chain-id = 137
rpc-endpoint = "http://127.0.0.1:8545"
max-receipt-retries = 5
transfer-queue = "gasless-transfers"
native-token = { symbol = "POL", address = "0x0000000000000000000000000000000000001010", decimals = 18 }
"#;

async fn wait_for_status(conn: &SqlitePool, order_id: &str, status: OrderStatus) {
    for _ in 0..500 {
        if let Some(order) = get_order(conn, order_id).await.unwrap() {
            if order.status().unwrap() == status {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("order {order_id} did not reach {status}");
}

#[tokio::test]
async fn test_engine_processes_queue_and_recovers() -> Result<(), RelayError> {
    let rpc = Arc::new(MockRpc::new(137));
    let conn = setup_random_memory_sqlite_conn().await;

    // left over from a previous run
    let leftover = serde_json::to_string(&transfer_request("leftover", "polygon")).unwrap();
    insert_order(&conn, "leftover", &leftover).await?;

    let registry =
        ChainRegistry::from_clients(vec![mock_chain_client("polygon", 137, rpc.clone(), false, 5)]);
    let runtime = start_relay_engine(
        Arc::new(test_signer()),
        "unused.sqlite",
        Config::load_from_str(CONFIG)?,
        Some(conn.clone()),
        Some(registry),
    )
    .await?;
    assert_eq!(runtime.producer.topic(), "gasless-transfers");

    runtime
        .producer
        .enqueue(&transfer_request("queued-1", "polygon"))
        .await?;
    runtime
        .producer
        .enqueue(&transfer_request("queued-2", "unknown"))
        .await?;

    wait_for_status(&conn, "leftover", OrderStatus::Done).await;
    wait_for_status(&conn, "queued-1", OrderStatus::Done).await;
    wait_for_status(&conn, "queued-2", OrderStatus::Failed).await;
    assert_eq!(rpc.broadcast_count(), 4);

    runtime.shutdown().await;
    Ok(())
}

async fn start_with(rpc: Arc<MockRpc>, conn: &SqlitePool, retries: u32) -> RelayRuntime {
    let registry =
        ChainRegistry::from_clients(vec![mock_chain_client("polygon", 137, rpc, false, retries)]);
    start_relay_engine(
        Arc::new(test_signer()),
        "unused.sqlite",
        Config::load_from_str(CONFIG).unwrap(),
        Some(conn.clone()),
        Some(registry),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_shutdown_lets_running_order_finish() -> Result<(), RelayError> {
    let rpc = Arc::new(MockRpc::new(137).with_pending_polls(200));
    let conn = setup_random_memory_sqlite_conn().await;
    let runtime = start_with(rpc.clone(), &conn, 1_000).await;

    runtime
        .producer
        .enqueue(&transfer_request("draining", "polygon"))
        .await?;
    wait_for_status(&conn, "draining", OrderStatus::Processing).await;

    runtime.shutdown().await;
    let order = get_order(&conn, "draining").await.unwrap().unwrap();
    assert_eq!(order.status().unwrap(), OrderStatus::Done);
    assert_eq!(rpc.broadcast_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_abort_fails_running_order() -> Result<(), RelayError> {
    let rpc = Arc::new(MockRpc::new(137).never_mine());
    let conn = setup_random_memory_sqlite_conn().await;
    let runtime = start_with(rpc.clone(), &conn, 1_000_000).await;

    runtime
        .producer
        .enqueue(&transfer_request("aborted", "polygon"))
        .await?;
    wait_for_status(&conn, "aborted", OrderStatus::Processing).await;

    runtime.abort().await;
    let order = get_order(&conn, "aborted").await.unwrap().unwrap();
    assert_eq!(order.status().unwrap(), OrderStatus::Failed);
    assert!(order
        .error_message
        .unwrap()
        .starts_with("waiting for receipt of txn"));
    Ok(())
}
