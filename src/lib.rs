//! Lockbridge - Library interface
//!
//! Moves ERC20 tokens between two EVM chains through a pair of lock/unlock
//! bridge contracts:
//!
//! - **Sender** - checks balances, then `approve` + `lock` on the source chain
//! - **Relayer** - watches `BridgeLock` events on one chain and submits the
//!   matching `unlock` on the other
//!
//! Re-exports internal modules for use by the binary and integration tests.

pub mod balance;
pub mod chain;
pub mod client;
pub mod config;
pub mod contracts;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod metrics;
pub mod redact;
pub mod relayer;
pub mod roles;
pub mod sender;
pub mod server;
pub mod tokens;
pub mod watcher;

pub use chain::{ChainReader, SubmittedTx, TxOutcome, TxReceiptSummary, TxSubmitter};
pub use config::{ChainConfig, ChainEndpoint, Config, Direction};
pub use error::{BridgeError, TxStep};
pub use events::{LockEvent, LockLog};
