//! Unlock dispatcher
//!
//! Single consumer of [`LockBatch`]es. Every valid lock becomes one
//! `unlock(user, amount)` on the destination bridge, signed by the owner.
//! Unlocks are strictly sequential: each one is confirmed (or has failed)
//! before the next is submitted.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::chain::{submit_and_confirm, TxOutcome, TxSubmitter};
use crate::contracts::BridgeCall;
use crate::error::BridgeError;
use crate::events::LockLog;
use crate::metrics::SharedMetrics;
use crate::watcher::LockBatch;

/// What happened to one BridgeLock log
#[derive(Debug)]
pub enum RelayOutcome {
    Unlocked(TxOutcome),
    /// Malformed log, nothing submitted
    Skipped(BridgeError),
    /// Unlock submitted (or attempted) and failed
    Failed(BridgeError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub unlocked: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct UnlockDispatcher {
    destination: Arc<dyn TxSubmitter>,
    destination_bridge: Address,
    confirmation_timeout: Option<Duration>,
    metrics: Option<SharedMetrics>,
}

impl UnlockDispatcher {
    /// `destination` must sign as the bridge owner
    pub fn new(
        destination: Arc<dyn TxSubmitter>,
        destination_bridge: Address,
        confirmation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            destination,
            destination_bridge,
            confirmation_timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume batches until the watcher side closes
    pub async fn run(self, mut batches: mpsc::Receiver<LockBatch>) -> Result<()> {
        info!(
            destination = %self.destination.endpoint().name,
            bridge = %self.destination_bridge,
            owner = %self.destination.account(),
            "Starting unlock dispatcher"
        );

        while let Some(batch) = batches.recv().await {
            let summary = self.relay_batch(&batch).await;
            info!(
                source = %batch.source_chain,
                from_block = batch.from_block,
                to_block = batch.to_block,
                unlocked = summary.unlocked,
                skipped = summary.skipped,
                failed = summary.failed,
                "Batch processed"
            );
        }

        info!("Lock batch channel closed, dispatcher stopping");
        Ok(())
    }

    /// Relay every log in `batch`, in order
    pub async fn relay_batch(&self, batch: &LockBatch) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for log in &batch.logs {
            match self.relay_lock(log).await {
                RelayOutcome::Unlocked(_) => summary.unlocked += 1,
                RelayOutcome::Skipped(_) => summary.skipped += 1,
                RelayOutcome::Failed(_) => summary.failed += 1,
            }
        }

        summary
    }

    /// Validate one log and, if valid, unlock and wait for confirmation
    pub async fn relay_lock(&self, log: &LockLog) -> RelayOutcome {
        let source = log.source_chain.as_str();
        self.record(|m| m.record_lock_seen(source));

        let event = match log.validate() {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    source = %source,
                    tx_hash = ?log.tx_hash,
                    log_index = ?log.log_index,
                    error = %e,
                    "Skipping malformed BridgeLock event"
                );
                self.record(|m| m.record_lock_skipped(source));
                return RelayOutcome::Skipped(e);
            }
        };

        info!(
            source = %source,
            user = %event.user,
            amount = %event.amount,
            tx_hash = ?event.tx_hash,
            block = ?event.block_number,
            "BridgeLock detected, unlocking"
        );

        let call = BridgeCall::Unlock {
            bridge: self.destination_bridge,
            user: event.user,
            amount: event.amount,
        };

        match submit_and_confirm(self.destination.as_ref(), call, self.confirmation_timeout).await {
            Ok(outcome) => {
                info!(
                    source = %source,
                    destination = %outcome.chain,
                    user = %event.user,
                    amount = %event.amount,
                    unlock_tx = %outcome.hash,
                    "Tokens unlocked"
                );
                self.record(|m| m.record_unlock_confirmed(source));
                RelayOutcome::Unlocked(outcome)
            }
            Err(e) => {
                error!(
                    source = %source,
                    user = %event.user,
                    amount = %event.amount,
                    error = %e,
                    "Unlock failed"
                );
                self.record(|m| m.record_unlock_failed(source));
                RelayOutcome::Failed(e)
            }
        }
    }

    fn record(&self, f: impl FnOnce(&crate::metrics::Metrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics.as_ref());
        }
    }
}
