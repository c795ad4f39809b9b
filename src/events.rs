//! BridgeLock event parsing
//!
//! Logs are decoded leniently into [`LockLog`] (every field optional) and
//! then validated into a [`LockEvent`] before the relayer acts on them.
//! A log with a missing or zero `user` or `amount` is malformed and skipped.

use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::rpc::types::Log;

use crate::contracts::bridge_lock_topic;
use crate::error::BridgeError;

/// A BridgeLock log as observed on chain, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLog {
    /// Name of the chain the log was read from
    pub source_chain: String,
    pub user: Option<Address>,
    pub amount: Option<U256>,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
    pub log_index: Option<u64>,
}

impl LockLog {
    /// Validate into a [`LockEvent`]
    pub fn validate(&self) -> Result<LockEvent, BridgeError> {
        let user = match self.user {
            Some(user) if user != Address::ZERO => user,
            Some(_) => return Err(self.malformed("user is the zero address")),
            None => return Err(self.malformed("user is missing")),
        };
        let amount = match self.amount {
            Some(amount) if !amount.is_zero() => amount,
            Some(_) => return Err(self.malformed("amount is zero")),
            None => return Err(self.malformed("amount is missing")),
        };

        Ok(LockEvent {
            source_chain: self.source_chain.clone(),
            user,
            amount,
            block_number: self.block_number,
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        })
    }

    fn malformed(&self, reason: &str) -> BridgeError {
        let tx = self
            .tx_hash
            .map(|h| h.to_string())
            .unwrap_or_else(|| "unknown tx".to_string());
        BridgeError::MalformedEvent(format!("{} on {} ({})", reason, self.source_chain, tx))
    }
}

/// A validated lock: user and amount are present and non-zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    pub source_chain: String,
    pub user: Address,
    pub amount: U256,
    pub block_number: Option<u64>,
    pub tx_hash: Option<TxHash>,
    pub log_index: Option<u64>,
}

/// Decode `user` and `amount` from raw log parts.
///
/// The deployed bridge indexes `user` (topics[1]) with `amount` as the only
/// data word. Logs from a non-indexed variant carry both in data instead:
/// `user` right-aligned in word 0, `amount` in word 1.
pub fn decode_bridge_lock(topics: &[B256], data: &[u8]) -> (Option<Address>, Option<U256>) {
    if let Some(user_topic) = topics.get(1) {
        let amount = data.get(0..32).map(U256::from_be_slice);
        return (Some(Address::from_word(*user_topic)), amount);
    }

    let user = data.get(12..32).map(Address::from_slice);
    let amount = data.get(32..64).map(U256::from_be_slice);
    (user, amount)
}

/// Parse an RPC log. Returns `None` for logs that are not BridgeLock or were
/// removed by a reorg.
pub fn parse_bridge_lock_log(source_chain: &str, log: &Log) -> Option<LockLog> {
    if log.removed {
        return None;
    }

    let topics = log.topics();
    if topics.first() != Some(&bridge_lock_topic()) {
        return None;
    }

    let (user, amount) = decode_bridge_lock(topics, log.data().data.as_ref());

    Some(LockLog {
        source_chain: source_chain.to_string(),
        user,
        amount,
        block_number: log.block_number,
        tx_hash: log.transaction_hash,
        log_index: log.log_index,
    })
}
