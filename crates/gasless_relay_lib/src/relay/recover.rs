use crate::db::model::{OrderDbObj, OrderStatus, OrderStep};
use crate::db::ops::*;
use crate::{err_create, err_from};
use crate::error::*;
use crate::relay::process::{OrderProgress, RelayService};
use crate::relay::request::TransferRequest;

/// Resume every order left pending or processing by a previous run.
///
/// Returns the number of orders that reached a terminal state.
pub async fn recover_orders(service: &RelayService) -> Result<usize, RelayError> {
    let orders = get_orders_by_status(
        service.conn(),
        &[OrderStatus::Pending, OrderStatus::Processing],
    )
    .await
    .map_err(err_from!())?;

    if orders.is_empty() {
        log::debug!("No orders to recover");
        return Ok(0);
    }
    log::info!("Recovering {} unfinished orders", orders.len());

    let mut finished = 0;
    for order in orders {
        match resume_order(service, &order).await {
            Ok(()) => finished += 1,
            Err(err) if matches!(err.inner, ErrorBag::Cancelled(_)) => {
                log::warn!("Recovery interrupted at order {}", order.order_id);
                finished += 1;
                break;
            }
            Err(err) => {
                log::warn!("Recovered order {} did not succeed: {}", order.order_id, err);
                finished += 1;
            }
        }
    }
    Ok(finished)
}

async fn resume_order(service: &RelayService, order: &OrderDbObj) -> Result<(), RelayError> {
    if order.status().map_err(|err| err_create!(ErrorBag::PersistenceError(err)))?
        == OrderStatus::Pending
    {
        mark_order_processing(service.conn(), &order.order_id).await?;
    }

    let transfer = match TransferRequest::decode(order.payload.as_bytes())
        .and_then(|request| request.validate())
    {
        Ok(transfer) => transfer,
        Err(err) => {
            mark_order_failed(service.conn(), &order.order_id, &err.message()).await?;
            return Err(err);
        }
    };

    let progress = match OrderProgress::from_order(order) {
        Ok(progress) => progress,
        Err(err) => {
            mark_order_failed(service.conn(), &order.order_id, &err.message()).await?;
            return Err(err);
        }
    };
    log::info!(
        "Resuming order {} from step {}",
        order.order_id,
        progress.step
    );
    if progress.step == OrderStep::TransferConfirmed {
        mark_order_done(service.conn(), &order.order_id).await?;
        return Ok(());
    }
    service.process_order(&transfer, progress).await
}
