//! One-direction relayer: watcher and dispatcher joined by a bounded channel

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dispatcher::UnlockDispatcher;
use crate::watcher::{LockBatch, LockWatcher};

/// Batches buffered between watcher and dispatcher
pub const BATCH_CHANNEL_CAPACITY: usize = 64;

pub struct Relayer {
    name: String,
    watcher: LockWatcher,
    dispatcher: UnlockDispatcher,
}

impl Relayer {
    pub fn new(name: impl Into<String>, watcher: LockWatcher, dispatcher: UnlockDispatcher) -> Self {
        Self {
            name: name.into(),
            watcher,
            dispatcher,
        }
    }

    /// Run until shutdown is signalled or either task stops
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        let (tx, rx) = mpsc::channel::<LockBatch>(BATCH_CHANNEL_CAPACITY);
        let name = self.name;

        let mut join_set = tokio::task::JoinSet::new();
        let watcher = self.watcher;
        let dispatcher = self.dispatcher;
        join_set.spawn(async move { watcher.run(tx).await });
        join_set.spawn(async move { dispatcher.run(rx).await });

        info!(relayer = %name, "Relayer started");

        tokio::select! {
            _ = shutdown.recv() => {
                info!(relayer = %name, "Shutdown signal received, stopping relayer");
                join_set.abort_all();
                Ok(())
            }
            maybe_done = join_set.join_next() => {
                join_set.abort_all();
                match maybe_done {
                    Some(Ok(Ok(()))) => {
                        error!(relayer = %name, "Relayer task exited unexpectedly without error");
                        Err(eyre::eyre!("{} relayer task exited unexpectedly", name))
                    }
                    Some(Ok(Err(e))) => {
                        error!(relayer = %name, "Relayer task stopped with error: {:?}", e);
                        Err(e)
                    }
                    Some(Err(e)) => {
                        error!(relayer = %name, "Relayer task panicked: {:?}", e);
                        Err(eyre::eyre!("{} relayer task panicked: {}", name, e))
                    }
                    None => Err(eyre::eyre!("{} relayer has no tasks", name)),
                }
            }
        }
    }
}
