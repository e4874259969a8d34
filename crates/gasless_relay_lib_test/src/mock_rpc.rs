use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use gasless_relay_common::err_create;
use gasless_relay_common::error::{ErrorBag, RelayError, RpcPhase};
use gasless_relay_lib::rpc::{FeeQuote, MinedReceipt, RelayRpc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use web3::signing::keccak256;
use web3::types::{Address, Bytes, H256, U256};

#[derive(Default)]
struct MockState {
    nonce: u64,
    fee_quote_calls: usize,
    fee_quote_failures: BTreeMap<usize, RpcPhase>,
    broadcast_failure: Option<String>,
    broadcasts: Vec<(H256, Bytes)>,
    receipt_statuses: VecDeque<u64>,
    pending_polls: u32,
    never_mine: bool,
    receipts: BTreeMap<H256, (u64, u32)>,
    receipt_calls: usize,
    receipt_failures: u32,
    estimate_gas_calls: usize,
}

/// Scripted chain node.
///
/// Every broadcast is accepted and mined with the next scripted status (1 when
/// the script is exhausted) after `pending_polls` empty receipt queries.
pub struct MockRpc {
    chain_id: u64,
    base_fee: U256,
    priority_fee: U256,
    estimated_gas: U256,
    state: Mutex<MockState>,
}

impl MockRpc {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            base_fee: U256::from(30_000_000_000u64),
            priority_fee: U256::from(1_500_000_000u64),
            estimated_gas: U256::from(21_000),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Fail the fee quote request with index `call` (0 based) in the given phase
    pub fn fail_fee_quote_at(self, call: usize, phase: RpcPhase) -> Self {
        self.state.lock().unwrap().fee_quote_failures.insert(call, phase);
        self
    }

    pub fn fail_broadcast(self, message: &str) -> Self {
        self.state.lock().unwrap().broadcast_failure = Some(message.to_string());
        self
    }

    pub fn with_receipt_statuses(self, statuses: &[u64]) -> Self {
        self.state.lock().unwrap().receipt_statuses = statuses.iter().copied().collect();
        self
    }

    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.state.lock().unwrap().pending_polls = polls;
        self
    }

    pub fn never_mine(self) -> Self {
        self.state.lock().unwrap().never_mine = true;
        self
    }

    /// The next `count` receipt queries fail with a request error
    pub fn fail_receipt_queries(self, count: u32) -> Self {
        self.state.lock().unwrap().receipt_failures = count;
        self
    }

    /// Pretend `tx_hash` was broadcast earlier and mines with `status`
    pub fn with_known_transaction(self, tx_hash: H256, status: u64) -> Self {
        self.state.lock().unwrap().receipts.insert(tx_hash, (status, 0));
        self
    }

    pub fn fee_quote_calls(&self) -> usize {
        self.state.lock().unwrap().fee_quote_calls
    }

    pub fn broadcasts(&self) -> Vec<(H256, Bytes)> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.state.lock().unwrap().broadcasts.len()
    }

    pub fn receipt_calls(&self) -> usize {
        self.state.lock().unwrap().receipt_calls
    }

    pub fn estimate_gas_calls(&self) -> usize {
        self.state.lock().unwrap().estimate_gas_calls
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.fee_quote_calls + state.broadcasts.len() + state.receipt_calls + state.estimate_gas_calls
    }
}

impl RelayRpc for MockRpc {
    fn fetch_fee_quote(&self, _sender: Address) -> BoxFuture<'_, Result<FeeQuote, RelayError>> {
        async move {
            let mut state = self.state.lock().unwrap();
            let call = state.fee_quote_calls;
            state.fee_quote_calls += 1;
            if let Some(phase) = state.fee_quote_failures.get(&call) {
                return Err(err_create!(ErrorBag::RpcError {
                    phase: *phase,
                    message: "scripted failure".to_string(),
                }));
            }
            Ok(FeeQuote {
                chain_id: self.chain_id,
                base_fee: self.base_fee,
                priority_fee: self.priority_fee,
                nonce: state.nonce,
            })
        }
        .boxed()
    }

    fn estimate_gas(
        &self,
        _from: Address,
        _to: Address,
        _value: U256,
        _data: Bytes,
    ) -> BoxFuture<'_, Result<U256, RelayError>> {
        async move {
            self.state.lock().unwrap().estimate_gas_calls += 1;
            Ok(self.estimated_gas)
        }
        .boxed()
    }

    fn send_raw_transaction(&self, raw: Bytes) -> BoxFuture<'_, Result<H256, RelayError>> {
        async move {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = &state.broadcast_failure {
                return Err(err_create!(ErrorBag::BroadcastError(message.clone())));
            }
            let tx_hash = H256::from(keccak256(&raw.0));
            let status = state.receipt_statuses.pop_front().unwrap_or(1);
            let pending_polls = state.pending_polls;
            state.receipts.insert(tx_hash, (status, pending_polls));
            state.broadcasts.push((tx_hash, raw));
            state.nonce += 1;
            Ok(tx_hash)
        }
        .boxed()
    }

    fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> BoxFuture<'_, Result<Option<MinedReceipt>, RelayError>> {
        async move {
            let mut state = self.state.lock().unwrap();
            state.receipt_calls += 1;
            if state.receipt_failures > 0 {
                state.receipt_failures -= 1;
                return Err(err_create!(ErrorBag::RpcError {
                    phase: RpcPhase::Request,
                    message: "scripted receipt failure".to_string(),
                }));
            }
            if state.never_mine {
                return Ok(None);
            }
            let Some((status, pending)) = state.receipts.get_mut(&tx_hash) else {
                return Ok(None);
            };
            if *pending > 0 {
                *pending -= 1;
                return Ok(None);
            }
            Ok(Some(MinedReceipt {
                tx_hash,
                block_number: Some(100),
                status: Some(*status),
                gas_used: Some(U256::from(60_000)),
                effective_gas_price: Some(self.base_fee + self.priority_fee),
            }))
        }
        .boxed()
    }
}
