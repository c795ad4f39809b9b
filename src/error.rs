//! Error kinds surfaced by the sender and relayer roles
//!
//! Chain client internals report `eyre::Report`s; they are folded into a
//! [`BridgeError`] at the component boundary so callers can branch on the kind
//! of failure instead of on message text.

use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

/// State-changing contract call a transaction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxStep {
    Approve,
    Lock,
    Unlock,
}

impl TxStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStep::Approve => "approve",
            TxStep::Lock => "lock",
            TxStep::Unlock => "unlock",
        }
    }
}

impl fmt::Display for TxStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(
        "Insufficient native balance on {chain} for {account}: have {balance} wei, need {required} wei (short {shortfall})"
    )]
    InsufficientNativeBalance {
        chain: String,
        account: Address,
        balance: U256,
        required: U256,
        shortfall: U256,
    },

    #[error(
        "Insufficient token balance on {chain} for {account} (token {token}): have {balance}, need {required} (short {shortfall})"
    )]
    InsufficientTokenBalance {
        chain: String,
        account: Address,
        token: Address,
        balance: U256,
        required: U256,
        shortfall: U256,
    },

    /// Read-only query against the chain failed
    #[error("RPC error on {chain}: {message}")]
    Rpc { chain: String, message: String },

    /// Submission or receipt retrieval failed
    #[error("{step} transaction failed on {chain}: {message}")]
    Transaction {
        step: TxStep,
        chain: String,
        message: String,
    },

    #[error("{step} transaction {tx_hash} reverted on {chain}")]
    TransactionReverted {
        step: TxStep,
        chain: String,
        tx_hash: TxHash,
    },

    #[error("{step} transaction {tx_hash} not confirmed on {chain} within {timeout_secs}s")]
    ConfirmationTimeout {
        step: TxStep,
        chain: String,
        tx_hash: TxHash,
        timeout_secs: u64,
    },

    #[error("Malformed BridgeLock event: {0}")]
    MalformedEvent(String),
}

impl BridgeError {
    pub fn rpc(chain: &str, err: &eyre::Report) -> Self {
        BridgeError::Rpc {
            chain: chain.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn transaction(step: TxStep, chain: &str, err: &eyre::Report) -> Self {
        BridgeError::Transaction {
            step,
            chain: chain.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Transaction step this error belongs to, if any
    pub fn step(&self) -> Option<TxStep> {
        match self {
            BridgeError::Transaction { step, .. }
            | BridgeError::TransactionReverted { step, .. }
            | BridgeError::ConfirmationTimeout { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// True for failures detected before any transaction was submitted
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BridgeError::Config(_)
                | BridgeError::InvalidAmount(_)
                | BridgeError::InsufficientNativeBalance { .. }
                | BridgeError::InsufficientTokenBalance { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display() {
        assert_eq!(TxStep::Approve.to_string(), "approve");
        assert_eq!(TxStep::Lock.to_string(), "lock");
        assert_eq!(TxStep::Unlock.to_string(), "unlock");
    }

    #[test]
    fn test_transaction_error_carries_step() {
        let err = BridgeError::transaction(TxStep::Lock, "BSC Testnet", &eyre::eyre!("nonce too low"));
        assert_eq!(err.step(), Some(TxStep::Lock));
        assert!(!err.is_precondition());
        let msg = err.to_string();
        assert!(msg.contains("lock transaction failed on BSC Testnet"));
        assert!(msg.contains("nonce too low"));
    }

    #[test]
    fn test_balance_errors_are_preconditions() {
        let err = BridgeError::InsufficientTokenBalance {
            chain: "A".to_string(),
            account: Address::ZERO,
            token: Address::ZERO,
            balance: U256::from(5),
            required: U256::from(10),
            shortfall: U256::from(5),
        };
        assert!(err.is_precondition());
        assert_eq!(err.step(), None);
        assert!(err.to_string().contains("short 5"));
    }
}
