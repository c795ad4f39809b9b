//! Approve-then-lock sequencer
//!
//! Sends tokens into the source bridge on behalf of the client account:
//! balance check, `approve(bridge, amount)`, then `lock(amount)`. Each step
//! waits for its receipt before the next one is submitted.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tracing::{error, info};

use crate::balance::{BalanceGuard, BalanceSnapshot};
use crate::chain::{submit_and_confirm, ChainReader, TxOutcome, TxSubmitter};
use crate::config::ChainConfig;
use crate::contracts::BridgeCall;
use crate::error::BridgeError;

/// Result of a completed send
#[derive(Debug, Clone)]
pub struct SendReport {
    pub balances: BalanceSnapshot,
    pub approve: TxOutcome,
    pub lock: TxOutcome,
}

pub struct TokenSender {
    reader: Arc<dyn ChainReader>,
    submitter: Arc<dyn TxSubmitter>,
    chain: ChainConfig,
    guard: BalanceGuard,
    confirmation_timeout: Option<Duration>,
}

impl TokenSender {
    /// `submitter` signs as the client account on `chain`
    pub fn new(
        reader: Arc<dyn ChainReader>,
        submitter: Arc<dyn TxSubmitter>,
        chain: ChainConfig,
        guard: BalanceGuard,
        confirmation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            reader,
            submitter,
            chain,
            guard,
            confirmation_timeout,
        }
    }

    /// Lock `amount` raw token units into the bridge
    pub async fn send_tokens(&self, amount: U256) -> Result<SendReport, BridgeError> {
        let account = self.submitter.account();
        let chain = &self.chain.endpoint.name;

        info!(
            chain = %chain,
            account = %account,
            token = %self.chain.token_address,
            bridge = %self.chain.bridge_address,
            amount = %amount,
            "Starting token send"
        );

        let balances = self
            .guard
            .check(
                self.reader.as_ref(),
                self.chain.token_address,
                account,
                amount,
            )
            .await?;

        info!(
            chain = %chain,
            native = %balances.native,
            token = %balances.token,
            "Balances sufficient"
        );

        let approve = submit_and_confirm(
            self.submitter.as_ref(),
            BridgeCall::Approve {
                token: self.chain.token_address,
                spender: self.chain.bridge_address,
                amount,
            },
            self.confirmation_timeout,
        )
        .await
        .inspect_err(|e| error!(chain = %chain, error = %e, "Approve failed, lock not attempted"))?;

        let lock = submit_and_confirm(
            self.submitter.as_ref(),
            BridgeCall::Lock {
                bridge: self.chain.bridge_address,
                amount,
            },
            self.confirmation_timeout,
        )
        .await
        .inspect_err(|e| error!(chain = %chain, error = %e, "Lock failed"))?;

        info!(
            chain = %chain,
            approve_tx = %approve.hash,
            lock_tx = %lock.hash,
            amount = %amount,
            "Tokens locked"
        );

        Ok(SendReport {
            balances,
            approve,
            lock,
        })
    }
}
