use crate::contracts::{encode_erc20_permit, encode_erc20_transfer_from, PermitArgs};
use crate::db::model::{OrderDbObj, OrderStep};
use crate::db::ops::*;
use crate::error::*;
use crate::relay::request::{TransferRequest, ValidatedTransfer};
use crate::rpc::MinedReceipt;
use crate::setup::{ChainClient, ChainRegistry};
use crate::signer::Signer;
use crate::transaction::{
    broadcast, prepare_contract_call, prepare_value_transfer, sign_transaction, wait_mined,
};
use crate::{err_create, err_custom_create};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use web3::types::{Address, H256, U256};

/// The two on-chain calls of a relay order, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStep {
    Permit,
    TransferFrom,
}

impl RelayStep {
    pub fn label(&self) -> &'static str {
        match self {
            RelayStep::Permit => "permit",
            RelayStep::TransferFrom => "transferFrom",
        }
    }

    fn sent(&self) -> OrderStep {
        match self {
            RelayStep::Permit => OrderStep::PermitSent,
            RelayStep::TransferFrom => OrderStep::TransferSent,
        }
    }

    fn confirmed(&self) -> OrderStep {
        match self {
            RelayStep::Permit => OrderStep::PermitConfirmed,
            RelayStep::TransferFrom => OrderStep::TransferConfirmed,
        }
    }
}

/// Where a processing order continues from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderProgress {
    pub step: OrderStep,
    pub permit_tx_hash: Option<H256>,
    pub transfer_tx_hash: Option<H256>,
}

impl OrderProgress {
    pub fn fresh() -> Self {
        Self {
            step: OrderStep::None,
            permit_tx_hash: None,
            transfer_tx_hash: None,
        }
    }

    pub fn from_order(order: &OrderDbObj) -> Result<Self, RelayError> {
        let parse_hash = |hash: &Option<String>| -> Result<Option<H256>, RelayError> {
            hash.as_deref()
                .map(|h| {
                    H256::from_str(h).map_err(|err| {
                        err_custom_create!("Invalid tx hash {h} stored for order: {err}")
                    })
                })
                .transpose()
        };
        Ok(Self {
            step: order
                .step()
                .map_err(|err| err_create!(ErrorBag::PersistenceError(err)))?,
            permit_tx_hash: parse_hash(&order.permit_tx_hash)?,
            transfer_tx_hash: parse_hash(&order.transfer_tx_hash)?,
        })
    }

    /// Hash of an already broadcast, not yet confirmed transaction of `step`
    fn pending_hash(&self, step: RelayStep) -> Option<H256> {
        if self.step != step.sent() {
            return None;
        }
        match step {
            RelayStep::Permit => self.permit_tx_hash,
            RelayStep::TransferFrom => self.transfer_tx_hash,
        }
    }
}

/// Drives orders through permit and transferFrom and owns their status transitions
pub struct RelayService {
    conn: SqlitePool,
    registry: Arc<ChainRegistry>,
    signer: Arc<dyn Signer>,
    cancel: CancellationToken,
}

impl RelayService {
    pub fn new(
        conn: SqlitePool,
        registry: Arc<ChainRegistry>,
        signer: Arc<dyn Signer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            conn,
            registry,
            signer,
            cancel,
        }
    }

    pub fn conn(&self) -> &SqlitePool {
        &self.conn
    }

    /// Process one queue message end to end.
    ///
    /// Decode and validation errors are returned before anything is stored.
    /// Once the order row exists every step error ends it as failed.
    pub async fn handle(&self, payload: &[u8]) -> Result<(), RelayError> {
        let request = TransferRequest::decode(payload)?;
        let transfer = request.validate()?;

        if transfer.recipient != self.signer.address() {
            log::warn!(
                "Order {}: permit spender {:#x} is not the relayer account {:#x}",
                transfer.order_id,
                transfer.recipient,
                self.signer.address()
            );
        }

        insert_order(
            &self.conn,
            &transfer.order_id,
            &String::from_utf8_lossy(payload),
        )
        .await?;
        mark_order_processing(&self.conn, &transfer.order_id).await?;
        log::info!(
            "Order {} processing: {} of token {:#x} from {:#x} to {:#x} on {}",
            transfer.order_id,
            transfer.amount,
            transfer.token_address,
            transfer.owner,
            transfer.transfer_to,
            transfer.chain
        );

        self.process_order(&transfer, OrderProgress::fresh()).await
    }

    /// Run the remaining steps of a processing order and store the outcome
    pub async fn process_order(
        &self,
        transfer: &ValidatedTransfer,
        progress: OrderProgress,
    ) -> Result<(), RelayError> {
        let cancel = self.cancel.child_token();
        match self.execute_steps(transfer, &progress, &cancel).await {
            Ok(()) => {
                mark_order_done(&self.conn, &transfer.order_id).await?;
                log::info!("Order {} done", transfer.order_id);
                Ok(())
            }
            Err(err) => {
                log::error!("Order {} failed: {}", transfer.order_id, err);
                if let Err(store_err) =
                    mark_order_failed(&self.conn, &transfer.order_id, &err.message()).await
                {
                    log::error!(
                        "Failed to mark order {} as failed: {}",
                        transfer.order_id,
                        store_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn execute_steps(
        &self,
        transfer: &ValidatedTransfer,
        progress: &OrderProgress,
        cancel: &CancellationToken,
    ) -> Result<(), RelayError> {
        let client = self.registry.lookup(&transfer.chain)?;

        if progress.step < OrderStep::PermitConfirmed {
            let tx_hash = match progress.pending_hash(RelayStep::Permit) {
                Some(tx_hash) => tx_hash,
                None => {
                    let data = encode_erc20_permit(&PermitArgs {
                        owner: transfer.owner,
                        spender: transfer.recipient,
                        value: transfer.amount,
                        deadline: transfer.deadline,
                        v: transfer.v,
                        r: transfer.r,
                        s: transfer.s,
                    })
                    .map_err(|err| err_create!(ErrorBag::BuildError(err.to_string())))?;
                    self.submit(&client, transfer, RelayStep::Permit, data)
                        .await?
                }
            };
            self.settle(&client, transfer, RelayStep::Permit, tx_hash, cancel)
                .await?;
        }

        if progress.step < OrderStep::TransferConfirmed {
            let tx_hash = match progress.pending_hash(RelayStep::TransferFrom) {
                Some(tx_hash) => tx_hash,
                None => {
                    let data = encode_erc20_transfer_from(
                        transfer.owner,
                        transfer.transfer_to,
                        transfer.amount,
                    )
                    .map_err(|err| err_create!(ErrorBag::BuildError(err.to_string())))?;
                    self.submit(&client, transfer, RelayStep::TransferFrom, data)
                        .await?
                }
            };
            self.settle(&client, transfer, RelayStep::TransferFrom, tx_hash, cancel)
                .await?;
        }
        Ok(())
    }

    /// Build, sign and broadcast a call to the token contract, then record the hash
    async fn submit(
        &self,
        client: &ChainClient,
        transfer: &ValidatedTransfer,
        step: RelayStep,
        data: Vec<u8>,
    ) -> Result<H256, RelayError> {
        let tp =
            prepare_contract_call(client, self.signer.address(), transfer.token_address, data)
                .await?;
        let signed = sign_transaction(self.signer.as_ref(), tp).await?;
        let tx_hash = broadcast(client, &signed).await?;
        log::info!(
            "Order {}: {} sent on {}, txn: {:#x}",
            transfer.order_id,
            step.label(),
            client.network,
            tx_hash
        );
        update_order_step(
            &self.conn,
            &transfer.order_id,
            step.sent(),
            Some(&format!("{tx_hash:#x}")),
        )
        .await?;
        Ok(tx_hash)
    }

    async fn settle(
        &self,
        client: &ChainClient,
        transfer: &ValidatedTransfer,
        step: RelayStep,
        tx_hash: H256,
        cancel: &CancellationToken,
    ) -> Result<MinedReceipt, RelayError> {
        let receipt = wait_mined(
            client.rpc.as_ref(),
            tx_hash,
            client.max_receipt_retries,
            client.poll_interval,
            cancel,
        )
        .await?;
        if !receipt.is_success() {
            return Err(err_create!(ErrorBag::SettlementFailure {
                step: step.label().to_string(),
                tx_hash,
            }));
        }
        log::info!(
            "Order {}: {} confirmed in block {:?}, fee paid {:?}{}",
            transfer.order_id,
            step.label(),
            receipt.block_number,
            receipt.fee_paid(),
            client
                .explorer_link(tx_hash)
                .map(|link| format!(", {link}"))
                .unwrap_or_default()
        );
        update_order_step(&self.conn, &transfer.order_id, step.confirmed(), None).await?;
        Ok(receipt)
    }

    /// Send native currency from the relayer account and wait for it to settle
    pub async fn send_native(
        &self,
        network: &str,
        to: Address,
        value: U256,
    ) -> Result<MinedReceipt, RelayError> {
        let client = self.registry.lookup(network)?;
        let tp = prepare_value_transfer(&client, self.signer.address(), to, value).await?;
        let signed = sign_transaction(self.signer.as_ref(), tp).await?;
        let tx_hash = broadcast(&client, &signed).await?;
        log::info!(
            "Sent {} native to {:#x} on {}, txn: {:#x}",
            value,
            to,
            network,
            tx_hash
        );
        let receipt = wait_mined(
            client.rpc.as_ref(),
            tx_hash,
            client.max_receipt_retries,
            client.poll_interval,
            &self.cancel.child_token(),
        )
        .await?;
        if !receipt.is_success() {
            return Err(err_create!(ErrorBag::SettlementFailure {
                step: "native transfer".to_string(),
                tx_hash,
            }));
        }
        Ok(receipt)
    }
}
