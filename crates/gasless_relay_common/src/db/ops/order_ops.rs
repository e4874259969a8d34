use crate::db::model::{OrderDbObj, OrderStatus, OrderStep};
use crate::error::{ErrorBag, RelayError};
use crate::{err_create, err_from};
use sqlx::Executor;
use sqlx::Sqlite;

pub async fn insert_order<'c, E>(
    executor: E,
    order_id: &str,
    payload: &str,
) -> Result<OrderDbObj, RelayError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let now = chrono::Utc::now();
    let res = sqlx::query_as::<_, OrderDbObj>(
        r"INSERT INTO gasless_transfers
(order_id, payload, status, error_message, last_step, permit_tx_hash, transfer_tx_hash, created_at, updated_at)
VALUES ($1, $2, 'pending', NULL, 'none', NULL, NULL, $3, $4) RETURNING *;
",
    )
    .bind(order_id)
    .bind(payload)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await;

    match res {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(err_create!(ErrorBag::DuplicateOrder(order_id.to_string())))
        }
        Err(err) => Err(err_create!(err)),
    }
}

pub async fn get_order<'c, E>(executor: E, order_id: &str) -> Result<Option<OrderDbObj>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row =
        sqlx::query_as::<_, OrderDbObj>(r"SELECT * FROM gasless_transfers WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
    Ok(row)
}

pub async fn get_orders_by_status<'c, E>(
    executor: E,
    statuses: &[OrderStatus],
) -> Result<Vec<OrderDbObj>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    if statuses.is_empty() {
        return Ok(vec![]);
    }
    let filter = statuses
        .iter()
        .map(|status| format!("'{}'", status.as_str()))
        .collect::<Vec<String>>()
        .join(", ");
    let rows = sqlx::query_as::<_, OrderDbObj>(
        format!(r"SELECT * FROM gasless_transfers WHERE status IN ({filter}) ORDER BY id ASC")
            .as_str(),
    )
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

async fn transition_order<'c, E>(
    executor: E,
    order_id: &str,
    from: OrderStatus,
    to: OrderStatus,
    error_message: Option<&str>,
) -> Result<(), RelayError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let res = sqlx::query(
        r"UPDATE gasless_transfers SET
status = $1,
error_message = $2,
updated_at = $3
WHERE order_id = $4 AND status = $5
",
    )
    .bind(to.as_str())
    .bind(error_message)
    .bind(chrono::Utc::now())
    .bind(order_id)
    .bind(from.as_str())
    .execute(executor)
    .await
    .map_err(err_from!())?;

    if res.rows_affected() == 0 {
        return Err(err_create!(ErrorBag::PersistenceError(format!(
            "order {order_id} is not {from}, cannot move it to {to}"
        ))));
    }
    Ok(())
}

pub async fn mark_order_processing<'c, E>(executor: E, order_id: &str) -> Result<(), RelayError>
where
    E: Executor<'c, Database = Sqlite>,
{
    transition_order(
        executor,
        order_id,
        OrderStatus::Pending,
        OrderStatus::Processing,
        None,
    )
    .await
}

pub async fn mark_order_failed<'c, E>(
    executor: E,
    order_id: &str,
    error_message: &str,
) -> Result<(), RelayError>
where
    E: Executor<'c, Database = Sqlite>,
{
    transition_order(
        executor,
        order_id,
        OrderStatus::Processing,
        OrderStatus::Failed,
        Some(error_message),
    )
    .await
}

pub async fn mark_order_done<'c, E>(executor: E, order_id: &str) -> Result<(), RelayError>
where
    E: Executor<'c, Database = Sqlite>,
{
    transition_order(
        executor,
        order_id,
        OrderStatus::Processing,
        OrderStatus::Done,
        None,
    )
    .await
}

/// Record saga progress. Only allowed while the order is processing and never moves backwards.
pub async fn update_order_step<'c, E>(
    executor: E,
    order_id: &str,
    step: OrderStep,
    tx_hash: Option<&str>,
) -> Result<(), RelayError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let previous_steps = [
        OrderStep::None,
        OrderStep::PermitSent,
        OrderStep::PermitConfirmed,
        OrderStep::TransferSent,
        OrderStep::TransferConfirmed,
    ]
    .iter()
    .filter(|s| **s <= step)
    .map(|s| format!("'{}'", s.as_str()))
    .collect::<Vec<String>>()
    .join(", ");

    let res = sqlx::query(
        format!(
            r"UPDATE gasless_transfers SET
last_step = $1,
permit_tx_hash = CASE WHEN $1 = 'permit_sent' THEN $4 ELSE permit_tx_hash END,
transfer_tx_hash = CASE WHEN $1 = 'transfer_sent' THEN $4 ELSE transfer_tx_hash END,
updated_at = $2
WHERE order_id = $3 AND status = 'processing' AND last_step IN ({previous_steps})
"
        )
        .as_str(),
    )
    .bind(step.as_str())
    .bind(chrono::Utc::now())
    .bind(order_id)
    .bind(tx_hash)
    .execute(executor)
    .await
    .map_err(err_from!())?;

    if res.rows_affected() == 0 {
        return Err(err_create!(ErrorBag::PersistenceError(format!(
            "cannot record step {step} for order {order_id}"
        ))));
    }
    Ok(())
}

#[tokio::test]
async fn order_lifecycle_test() -> Result<(), RelayError> {
    use crate::create_sqlite_connection;
    let conn = create_sqlite_connection(None, Some("order_lifecycle_test"), false, true).await?;

    let inserted = insert_order(&conn, "o1", r#"{"orderId":"o1"}"#).await?;
    assert_eq!(inserted.status().unwrap(), OrderStatus::Pending);
    assert_eq!(inserted.step().unwrap(), OrderStep::None);
    assert_eq!(inserted.error_message, None);

    mark_order_processing(&conn, "o1").await?;
    update_order_step(&conn, "o1", OrderStep::PermitSent, Some("0x01")).await?;
    update_order_step(&conn, "o1", OrderStep::PermitConfirmed, None).await?;
    mark_order_done(&conn, "o1").await?;

    let order = get_order(&conn, "o1").await.map_err(err_from!())?.unwrap();
    assert_eq!(order.status().unwrap(), OrderStatus::Done);
    assert_eq!(order.step().unwrap(), OrderStep::PermitConfirmed);
    assert_eq!(order.permit_tx_hash.as_deref(), Some("0x01"));
    assert_eq!(order.payload, r#"{"orderId":"o1"}"#);

    //terminal state is never left
    assert!(mark_order_failed(&conn, "o1", "late failure").await.is_err());
    assert!(mark_order_processing(&conn, "o1").await.is_err());
    let order = get_order(&conn, "o1").await.map_err(err_from!())?.unwrap();
    assert_eq!(order.status().unwrap(), OrderStatus::Done);
    assert_eq!(order.error_message, None);
    Ok(())
}

#[tokio::test]
async fn order_duplicate_test() -> Result<(), RelayError> {
    use crate::create_sqlite_connection;
    let conn = create_sqlite_connection(None, Some("order_duplicate_test"), false, true).await?;

    insert_order(&conn, "dup", "{}").await?;
    let err = insert_order(&conn, "dup", "{}").await.unwrap_err();
    assert!(matches!(err.inner, ErrorBag::DuplicateOrder(ref id) if id == "dup"));

    let pending = get_orders_by_status(&conn, &[OrderStatus::Pending])
        .await
        .map_err(err_from!())?;
    assert_eq!(pending.len(), 1);
    Ok(())
}

#[tokio::test]
async fn order_failed_test() -> Result<(), RelayError> {
    use crate::create_sqlite_connection;
    let conn = create_sqlite_connection(None, Some("order_failed_test"), false, true).await?;

    insert_order(&conn, "o2", "{}").await?;
    //cannot fail an order that was never processing
    assert!(mark_order_failed(&conn, "o2", "too early").await.is_err());
    //steps are only recorded for processing orders
    assert!(update_order_step(&conn, "o2", OrderStep::PermitSent, Some("0x02"))
        .await
        .is_err());

    mark_order_processing(&conn, "o2").await?;
    update_order_step(&conn, "o2", OrderStep::PermitConfirmed, None).await?;
    //step does not move backwards
    assert!(update_order_step(&conn, "o2", OrderStep::PermitSent, Some("0x03"))
        .await
        .is_err());
    mark_order_failed(&conn, "o2", "chain polygon not found").await?;
    assert!(mark_order_done(&conn, "o2").await.is_err());

    let order = get_order(&conn, "o2").await.map_err(err_from!())?.unwrap();
    assert_eq!(order.status().unwrap(), OrderStatus::Failed);
    assert_eq!(order.error_message.as_deref(), Some("chain polygon not found"));

    let unfinished = get_orders_by_status(&conn, &[OrderStatus::Pending, OrderStatus::Processing])
        .await
        .map_err(err_from!())?;
    assert!(unfinished.is_empty());
    assert!(get_order(&conn, "missing").await.map_err(err_from!())?.is_none());
    Ok(())
}
