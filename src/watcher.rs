//! BridgeLock log watcher
//!
//! Polls the source bridge for BridgeLock logs up to the safe head and hands
//! each non-empty block range to the dispatcher as one [`LockBatch`].
//!
//! ## Block cursor
//!
//! Without `START_BLOCK` the first poll only records the current safe head, so
//! locks mined before the listener started are not relayed. The cursor lives
//! in memory; a restart resumes from the head again.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::{eyre, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chain::ChainReader;
use crate::config::WatcherSettings;
use crate::events::LockLog;
use crate::metrics::SharedMetrics;

/// BridgeLock logs found in `[from_block, to_block]`, in chain order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockBatch {
    pub source_chain: String,
    pub from_block: u64,
    pub to_block: u64,
    pub logs: Vec<LockLog>,
}

pub struct LockWatcher {
    reader: Arc<dyn ChainReader>,
    bridge: Address,
    config: WatcherSettings,
    /// Next block to scan; `None` until the first poll
    next_block: Option<u64>,
    metrics: Option<SharedMetrics>,
}

impl LockWatcher {
    pub fn new(reader: Arc<dyn ChainReader>, bridge: Address, config: WatcherSettings) -> Self {
        Self {
            reader,
            bridge,
            config,
            next_block: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn next_block(&self) -> Option<u64> {
        self.next_block
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    fn source(&self) -> &str {
        &self.reader.endpoint().name
    }

    /// Latest block minus the finality margin
    pub async fn safe_block(&self) -> Result<u64> {
        let head = self.reader.block_number().await?;
        Ok(head.saturating_sub(self.config.finality_blocks))
    }

    /// Scan everything between the cursor and the safe head.
    ///
    /// The cursor advances past every chunk that was fetched. If a later chunk
    /// fails, the batches collected so far are returned and the failed range
    /// is retried on the next poll.
    pub async fn poll(&mut self) -> Result<Vec<LockBatch>> {
        let safe = self.safe_block().await?;

        let from = match (self.next_block, self.config.start_block) {
            (Some(next), _) => next,
            (None, Some(start)) => {
                info!(chain = %self.source(), start_block = start, "Watching BridgeLock from configured block");
                self.next_block = Some(start);
                start
            }
            (None, None) => {
                info!(chain = %self.source(), safe_block = safe, "Watching BridgeLock from current head");
                self.next_block = Some(safe.saturating_add(1));
                self.record_polled(safe);
                return Ok(Vec::new());
            }
        };

        if from > safe {
            return Ok(Vec::new());
        }

        let max_range = self.config.max_block_range.max(1);
        let mut batches = Vec::new();
        let mut current = from;

        while current <= safe {
            let to = current.saturating_add(max_range - 1).min(safe);

            let logs = match self.reader.bridge_lock_logs(self.bridge, current, to).await {
                Ok(logs) => logs,
                Err(e) if current == from => return Err(e),
                Err(e) => {
                    warn!(
                        chain = %self.source(),
                        from_block = current,
                        to_block = to,
                        error = %e,
                        "Failed to fetch BridgeLock logs, will retry range"
                    );
                    break;
                }
            };

            if !logs.is_empty() {
                debug!(
                    chain = %self.source(),
                    from_block = current,
                    to_block = to,
                    count = logs.len(),
                    "Found BridgeLock events"
                );
                batches.push(LockBatch {
                    source_chain: self.source().to_string(),
                    from_block: current,
                    to_block: to,
                    logs,
                });
            }

            self.record_polled(to);
            current = to.saturating_add(1);
            self.next_block = Some(current);
        }

        Ok(batches)
    }

    fn record_polled(&self, block: u64) {
        if let Some(metrics) = &self.metrics {
            metrics.set_last_polled_block(self.source(), block);
        }
    }

    /// Poll forever, forwarding batches to the dispatcher.
    ///
    /// RPC errors are logged and retried on the next tick. Returns an error
    /// only when the dispatcher has gone away.
    pub async fn run(mut self, batches: mpsc::Sender<LockBatch>) -> Result<()> {
        info!(
            chain = %self.source(),
            bridge = %self.bridge,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            finality_blocks = self.config.finality_blocks,
            "Starting BridgeLock watcher"
        );

        loop {
            match self.poll().await {
                Ok(found) => {
                    for batch in found {
                        batches
                            .send(batch)
                            .await
                            .map_err(|_| eyre!("Dispatcher channel closed"))?;
                    }
                }
                Err(e) => {
                    warn!(chain = %self.source(), error = %e, "Watcher poll failed");
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
