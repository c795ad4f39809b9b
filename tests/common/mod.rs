//! In-memory chain used by the flow tests
//!
//! `MockChain` implements both chain traits and records every submission and
//! confirmation in a shared journal, so tests can assert on ordering.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use futures::FutureExt;

use lockbridge::contracts::BridgeCall;
use lockbridge::{
    ChainEndpoint, ChainReader, LockLog, SubmittedTx, TxReceiptSummary, TxStep, TxSubmitter,
};

pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

pub fn tokens(n: u64) -> U256 {
    U256::from(n as u128 * ONE_TOKEN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Submitted(BridgeCall),
    Confirmed(TxStep, TxHash),
}

pub type Journal = Arc<Mutex<Vec<Entry>>>;

#[derive(Default)]
struct MockState {
    native: U256,
    token: U256,
    /// `decimals()` of the token; 18 when unset
    decimals: Option<u8>,
    head: u64,
    logs: Vec<LockLog>,
    /// (from, to) of every log query
    log_queries: Vec<(u64, u64)>,
    /// Log queries starting at these blocks fail
    failing_ranges: HashSet<u64>,
    /// Submission indices (0-based) rejected by the node
    rejected_submissions: HashSet<usize>,
    /// Steps whose receipts report a revert
    reverted_steps: HashSet<TxStep>,
    submissions: usize,
}

pub struct MockChain {
    endpoint: ChainEndpoint,
    account: Address,
    state: Mutex<MockState>,
    journal: Journal,
}

impl MockChain {
    pub fn new(name: &str, chain_id: u64) -> Self {
        Self {
            endpoint: ChainEndpoint {
                name: name.to_string(),
                chain_id,
                rpc_url: "http://mock".to_string(),
            },
            account: Address::repeat_byte(0xC1),
            state: Mutex::new(MockState::default()),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_balances(self, native: U256, token: U256) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.native = native;
            state.token = token;
        }
        self
    }

    pub fn with_decimals(self, decimals: u8) -> Self {
        self.state.lock().unwrap().decimals = Some(decimals);
        self
    }

    pub fn with_head(self, head: u64) -> Self {
        self.set_head(head);
        self
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn push_log(&self, log: LockLog) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn fail_logs_from(&self, from_block: u64) {
        self.state.lock().unwrap().failing_ranges.insert(from_block);
    }

    pub fn clear_log_failures(&self) {
        self.state.lock().unwrap().failing_ranges.clear();
    }

    pub fn reject_submission(&self, index: usize) {
        self.state.lock().unwrap().rejected_submissions.insert(index);
    }

    pub fn revert_step(&self, step: TxStep) {
        self.state.lock().unwrap().reverted_steps.insert(step);
    }

    pub fn log_queries(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().log_queries.clone()
    }

    pub fn journal(&self) -> Vec<Entry> {
        self.journal.lock().unwrap().clone()
    }

    pub fn submitted_calls(&self) -> Vec<BridgeCall> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Submitted(call) => Some(call),
                Entry::Confirmed(..) => None,
            })
            .collect()
    }
}

/// A BridgeLock log as the reader would return it
pub fn lock_log(
    source: &str,
    user: Option<Address>,
    amount: Option<U256>,
    block: u64,
) -> LockLog {
    LockLog {
        source_chain: source.to_string(),
        user,
        amount,
        block_number: Some(block),
        tx_hash: Some(TxHash::with_last_byte(block as u8)),
        log_index: Some(0),
    }
}

#[async_trait]
impl ChainReader for MockChain {
    fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.endpoint.chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().head)
    }

    async fn native_balance(&self, _account: Address) -> Result<U256> {
        Ok(self.state.lock().unwrap().native)
    }

    async fn token_balance(&self, _token: Address, _account: Address) -> Result<U256> {
        Ok(self.state.lock().unwrap().token)
    }

    async fn token_decimals(&self, _token: Address) -> Result<u8> {
        Ok(self.state.lock().unwrap().decimals.unwrap_or(18))
    }

    async fn bridge_lock_logs(
        &self,
        _bridge: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LockLog>> {
        let mut state = self.state.lock().unwrap();
        state.log_queries.push((from_block, to_block));
        if state.failing_ranges.contains(&from_block) {
            return Err(eyre!("rate limited"));
        }

        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.block_number
                    .map(|b| b >= from_block && b <= to_block)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TxSubmitter for MockChain {
    fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn submit(&self, call: BridgeCall) -> Result<SubmittedTx> {
        let step = call.step();
        let (index, reverted) = {
            let mut state = self.state.lock().unwrap();
            let index = state.submissions;
            state.submissions += 1;
            if state.rejected_submissions.contains(&index) {
                return Err(eyre!("insufficient funds for gas"));
            }
            (index, state.reverted_steps.contains(&step))
        };

        self.journal
            .lock()
            .unwrap()
            .push(Entry::Submitted(call));

        let hash = TxHash::with_last_byte(index as u8 + 1);
        let journal = self.journal.clone();
        let confirmation = async move {
            tokio::task::yield_now().await;
            journal.lock().unwrap().push(Entry::Confirmed(step, hash));
            Ok(TxReceiptSummary {
                tx_hash: hash,
                block_number: Some(index as u64 + 1),
                success: !reverted,
            })
        }
        .boxed();

        Ok(SubmittedTx::new(step, self.endpoint.name.clone(), hash, confirmation))
    }
}
