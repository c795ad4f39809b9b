//! Role entry points
//!
//! Builds RPC clients from [`Config`] and runs one role: a one-shot send in
//! either direction, or a long-running relayer listening on one or both chains.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use eyre::Result;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::balance::BalanceGuard;
use crate::chain::{ChainReader, TxSubmitter};
use crate::client::{EvmChainReader, EvmTxSubmitter};
use crate::config::{ChainConfig, Config, Direction};
use crate::dispatcher::UnlockDispatcher;
use crate::error::BridgeError;
use crate::metrics::SharedMetrics;
use crate::relayer::Relayer;
use crate::sender::{SendReport, TokenSender};
use crate::watcher::LockWatcher;

/// Fail if the RPC serves a different chain than configured
pub async fn ensure_chain_id(reader: &dyn ChainReader) -> Result<(), BridgeError> {
    let endpoint = reader.endpoint();
    let actual = reader
        .chain_id()
        .await
        .map_err(|e| BridgeError::rpc(&endpoint.name, &e))?;

    if actual != endpoint.chain_id {
        return Err(BridgeError::Config(format!(
            "{} RPC reports chain id {}, expected {}",
            endpoint.name, actual, endpoint.chain_id
        )));
    }
    Ok(())
}

/// Fail if `token` reports different decimals than `TOKEN_DECIMALS`
pub async fn ensure_token_decimals(
    reader: &dyn ChainReader,
    token: Address,
    expected: u8,
) -> Result<(), BridgeError> {
    let endpoint = reader.endpoint();
    let actual = reader
        .token_decimals(token)
        .await
        .map_err(|e| BridgeError::rpc(&endpoint.name, &e))?;

    if actual != expected {
        return Err(BridgeError::Config(format!(
            "Token {} on {} has {} decimals, TOKEN_DECIMALS is {}",
            token, endpoint.name, actual, expected
        )));
    }
    Ok(())
}

async fn connect_reader(chain: &ChainConfig) -> Result<Arc<EvmChainReader>, BridgeError> {
    let reader = EvmChainReader::new(chain.endpoint.clone())?;
    ensure_chain_id(&reader).await?;
    info!(
        chain = %chain.endpoint.name,
        chain_id = chain.endpoint.chain_id,
        "Connected"
    );
    Ok(Arc::new(reader))
}

/// Lock tokens on the source chain of `direction`.
/// `amount` overrides the configured `SEND_AMOUNT` (raw units).
pub async fn send(
    config: &Config,
    direction: Direction,
    amount: Option<U256>,
) -> Result<SendReport, BridgeError> {
    let (source, destination) = config.route(direction);
    let amount = amount.unwrap_or(config.send_amount);

    info!(
        direction = %direction,
        from = %source.endpoint.name,
        to = %destination.endpoint.name,
        amount = %amount,
        "Sending tokens"
    );

    let reader = connect_reader(source).await?;
    ensure_token_decimals(reader.as_ref(), source.token_address, config.token_decimals).await?;
    let submitter = EvmTxSubmitter::new(source.endpoint.clone(), &config.client_private_key)?;

    let sender = TokenSender::new(
        reader,
        Arc::new(submitter),
        source.clone(),
        BalanceGuard::new(config.min_native_balance).with_decimals(config.token_decimals),
        config.confirmation_timeout,
    );

    sender.send_tokens(amount).await
}

pub async fn send_from_a_to_b(config: &Config, amount: Option<U256>) -> Result<SendReport, BridgeError> {
    send(config, Direction::AToB, amount).await
}

pub async fn send_from_b_to_a(config: &Config, amount: Option<U256>) -> Result<SendReport, BridgeError> {
    send(config, Direction::BToA, amount).await
}

/// Build the relayer that watches the source of `direction` and unlocks on
/// its destination
pub async fn build_relayer(
    config: &Config,
    direction: Direction,
    metrics: Option<SharedMetrics>,
) -> Result<Relayer, BridgeError> {
    let (source, destination) = config.route(direction);

    let reader = connect_reader(source).await?;
    // Verify the destination RPC before signing anything on it
    connect_reader(destination).await?;

    let owner: Arc<dyn TxSubmitter> = Arc::new(EvmTxSubmitter::new(
        destination.endpoint.clone(),
        &config.owner_private_key,
    )?);

    let mut watcher = LockWatcher::new(reader, source.bridge_address, config.watcher.clone());
    let mut dispatcher = UnlockDispatcher::new(
        owner,
        destination.bridge_address,
        config.confirmation_timeout,
    );
    if let Some(metrics) = metrics {
        metrics.register_listener(&source.endpoint.name);
        watcher = watcher.with_metrics(metrics.clone());
        dispatcher = dispatcher.with_metrics(metrics);
    }

    let name = format!("{} -> {}", source.endpoint.name, destination.endpoint.name);
    Ok(Relayer::new(name, watcher, dispatcher))
}

/// Listen on the source chain of `direction` until shutdown
pub async fn listen(
    config: &Config,
    direction: Direction,
    metrics: Option<SharedMetrics>,
    shutdown: mpsc::Receiver<()>,
) -> Result<()> {
    let relayer = build_relayer(config, direction, metrics).await?;
    relayer.run(shutdown).await
}

pub async fn listen_on_a_relay_to_b(
    config: &Config,
    metrics: Option<SharedMetrics>,
    shutdown: mpsc::Receiver<()>,
) -> Result<()> {
    listen(config, Direction::AToB, metrics, shutdown).await
}

pub async fn listen_on_b_relay_to_a(
    config: &Config,
    metrics: Option<SharedMetrics>,
    shutdown: mpsc::Receiver<()>,
) -> Result<()> {
    listen(config, Direction::BToA, metrics, shutdown).await
}

/// Run both relayers concurrently. They share no state besides metrics.
pub async fn listen_all(
    config: &Config,
    metrics: Option<SharedMetrics>,
    mut shutdown: mpsc::Receiver<()>,
) -> Result<()> {
    let relayers = [
        build_relayer(config, Direction::AToB, metrics.clone()).await?,
        build_relayer(config, Direction::BToA, metrics).await?,
    ];

    let mut stop_senders = Vec::with_capacity(relayers.len());
    let mut join_set = JoinSet::new();
    for relayer in relayers {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        stop_senders.push(stop_tx);
        join_set.spawn(relayer.run(stop_rx));
    }

    tokio::select! {
        _ = shutdown.recv() => {
            info!("Shutdown signal received, stopping relayers");
            for stop in &stop_senders {
                let _ = stop.send(()).await;
            }
            while let Some(result) = join_set.join_next().await {
                if let Err(e) = result {
                    error!("Relayer task panicked during shutdown: {:?}", e);
                }
            }
            Ok(())
        }
        maybe_done = join_set.join_next() => {
            join_set.abort_all();
            match maybe_done {
                Some(Ok(Ok(()))) => Err(eyre::eyre!("relayer stopped unexpectedly")),
                Some(Ok(Err(e))) => Err(e),
                Some(Err(e)) => Err(eyre::eyre!("relayer task panicked: {}", e)),
                None => Err(eyre::eyre!("no relayers running")),
            }
        }
    }
}
