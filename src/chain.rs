//! Chain access seams
//!
//! [`ChainReader`] covers read-only queries and [`TxSubmitter`] covers signed
//! state-changing calls. The sender and relayer only ever talk to a chain
//! through these traits, which keeps them testable without a node.

use std::fmt;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::config::ChainEndpoint;
use crate::contracts::BridgeCall;
use crate::error::{BridgeError, TxStep};
use crate::events::LockLog;

/// Resolves once the transaction's receipt is available
pub type ConfirmationFuture = BoxFuture<'static, eyre::Result<TxReceiptSummary>>;

/// The parts of a receipt the bridge cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted
    pub success: bool,
}

/// A broadcast transaction that has not been confirmed yet
pub struct SubmittedTx {
    pub step: TxStep,
    pub chain: String,
    pub hash: TxHash,
    confirmation: ConfirmationFuture,
}

impl fmt::Debug for SubmittedTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedTx")
            .field("step", &self.step)
            .field("chain", &self.chain)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl SubmittedTx {
    pub fn new(
        step: TxStep,
        chain: impl Into<String>,
        hash: TxHash,
        confirmation: ConfirmationFuture,
    ) -> Self {
        Self {
            step,
            chain: chain.into(),
            hash,
            confirmation,
        }
    }

    /// Wait for the receipt. A reverted receipt is an error.
    pub async fn confirm(self, timeout: Option<Duration>) -> Result<TxOutcome, BridgeError> {
        let Self {
            step,
            chain,
            hash,
            confirmation,
        } = self;

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, confirmation).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(BridgeError::ConfirmationTimeout {
                        step,
                        chain,
                        tx_hash: hash,
                        timeout_secs: limit.as_secs(),
                    })
                }
            },
            None => confirmation.await,
        };

        let receipt = result.map_err(|e| BridgeError::transaction(step, &chain, &e))?;
        if !receipt.success {
            return Err(BridgeError::TransactionReverted {
                step,
                chain,
                tx_hash: hash,
            });
        }

        Ok(TxOutcome {
            step,
            chain,
            hash,
            receipt,
        })
    }
}

/// A confirmed, successful transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub step: TxStep,
    pub chain: String,
    pub hash: TxHash,
    pub receipt: TxReceiptSummary,
}

/// Read-only chain queries
#[async_trait]
pub trait ChainReader: Send + Sync {
    fn endpoint(&self) -> &ChainEndpoint;

    /// Chain ID reported by the node
    async fn chain_id(&self) -> eyre::Result<u64>;

    async fn block_number(&self) -> eyre::Result<u64>;

    async fn native_balance(&self, account: Address) -> eyre::Result<U256>;

    async fn token_balance(&self, token: Address, account: Address) -> eyre::Result<U256>;

    /// `decimals()` of an ERC20 token
    async fn token_decimals(&self, token: Address) -> eyre::Result<u8>;

    /// BridgeLock logs emitted by `bridge` in `[from_block, to_block]`, in chain order
    async fn bridge_lock_logs(
        &self,
        bridge: Address,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<LockLog>>;
}

/// Signs and broadcasts calls from a single account
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    fn endpoint(&self) -> &ChainEndpoint;

    /// Account that signs every submitted call
    fn account(&self) -> Address;

    /// Sign and broadcast `call`; returns once the node accepted it
    async fn submit(&self, call: BridgeCall) -> eyre::Result<SubmittedTx>;
}

/// Submit `call` and wait for a successful receipt
pub async fn submit_and_confirm(
    submitter: &dyn TxSubmitter,
    call: BridgeCall,
    timeout: Option<Duration>,
) -> Result<TxOutcome, BridgeError> {
    let step = call.step();
    let chain = submitter.endpoint().name.clone();

    debug!(
        chain = %chain,
        step = %step,
        target = %call.target(),
        amount = %call.amount(),
        "Submitting transaction"
    );

    let submitted = submitter
        .submit(call)
        .await
        .map_err(|e| BridgeError::transaction(step, &chain, &e))?;

    info!(
        chain = %chain,
        step = %step,
        tx_hash = %submitted.hash,
        "Transaction sent, waiting for confirmation"
    );

    let outcome = submitted.confirm(timeout).await?;

    info!(
        chain = %chain,
        step = %step,
        tx_hash = %outcome.hash,
        block = ?outcome.receipt.block_number,
        "Transaction confirmed"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn receipt(success: bool) -> TxReceiptSummary {
        TxReceiptSummary {
            tx_hash: TxHash::repeat_byte(0x11),
            block_number: Some(42),
            success,
        }
    }

    #[tokio::test]
    async fn test_confirm_success() {
        let tx = SubmittedTx::new(
            TxStep::Lock,
            "A",
            TxHash::repeat_byte(0x11),
            async { Ok(receipt(true)) }.boxed(),
        );
        let outcome = tx.confirm(None).await.unwrap();
        assert_eq!(outcome.step, TxStep::Lock);
        assert_eq!(outcome.receipt.block_number, Some(42));
    }

    #[tokio::test]
    async fn test_confirm_reverted() {
        let tx = SubmittedTx::new(
            TxStep::Unlock,
            "B",
            TxHash::repeat_byte(0x11),
            async { Ok(receipt(false)) }.boxed(),
        );
        let err = tx.confirm(None).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::TransactionReverted {
                step: TxStep::Unlock,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_confirm_receipt_error() {
        let tx = SubmittedTx::new(
            TxStep::Approve,
            "A",
            TxHash::repeat_byte(0x11),
            async { Err(eyre::eyre!("connection reset")) }.boxed(),
        );
        let err = tx.confirm(None).await.unwrap_err();
        assert_eq!(err.step(), Some(TxStep::Approve));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_confirm_timeout() {
        let tx = SubmittedTx::new(
            TxStep::Lock,
            "A",
            TxHash::repeat_byte(0x22),
            futures::future::pending::<eyre::Result<TxReceiptSummary>>().boxed(),
        );
        let err = tx.confirm(Some(Duration::from_millis(20))).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ConfirmationTimeout {
                step: TxStep::Lock,
                ..
            }
        ));
    }
}
