//! lockbridge CLI
//!
//! Moves an ERC20 token between two EVM chains through a pair of lock/unlock
//! bridge contracts.
//!
//! # Roles
//!
//! - `send-a-to-b` / `send-b-to-a`: approve and lock tokens on the source
//!   chain with the client key
//! - `listen-a` / `listen-b`: watch one bridge for BridgeLock events and
//!   unlock on the other chain with the owner key
//! - `listen-all`: both listeners in one process

use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::Result;
use tracing::{error, info, warn};

use lockbridge::config::{Config, Direction};
use lockbridge::metrics::{Metrics, SharedMetrics};
use lockbridge::tokens::{from_token_units, to_token_units};
use lockbridge::{roles, server};

#[derive(Parser)]
#[command(name = "lockbridge")]
#[command(about = "Lock/unlock ERC20 bridge between two EVM chains", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock tokens on chain A for release on chain B
    SendAToB {
        /// Amount in whole tokens (defaults to SEND_AMOUNT)
        #[arg(short, long)]
        amount: Option<String>,
    },

    /// Lock tokens on chain B for release on chain A
    SendBToA {
        /// Amount in whole tokens (defaults to SEND_AMOUNT)
        #[arg(short, long)]
        amount: Option<String>,
    },

    /// Listen on chain A and unlock on chain B
    ListenA,

    /// Listen on chain B and unlock on chain A
    ListenB,

    /// Run both listeners
    ListenAll,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_logging();
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    info!(
        chain_a = %config.chain_a.endpoint.name,
        chain_b = %config.chain_b.endpoint.name,
        "Configuration loaded"
    );

    match cli.command {
        Commands::SendAToB { amount } => run_send(&config, Direction::AToB, amount).await,
        Commands::SendBToA { amount } => run_send(&config, Direction::BToA, amount).await,
        Commands::ListenA => run_listener(&config, Some(Direction::AToB)).await,
        Commands::ListenB => run_listener(&config, Some(Direction::BToA)).await,
        Commands::ListenAll => run_listener(&config, None).await,
    }
}

async fn run_send(config: &Config, direction: Direction, amount: Option<String>) -> Result<()> {
    let amount = amount
        .map(|a| to_token_units(&a, config.token_decimals))
        .transpose()?;
    let sent = amount.unwrap_or(config.send_amount);

    let result = match direction {
        Direction::AToB => roles::send_from_a_to_b(config, amount).await,
        Direction::BToA => roles::send_from_b_to_a(config, amount).await,
    };

    match result {
        Ok(report) => {
            info!(
                direction = %direction,
                amount = %from_token_units(sent, config.token_decimals),
                approve_tx = %report.approve.hash,
                lock_tx = %report.lock.hash,
                "Send complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(direction = %direction, error = %e, "Send failed");
            Err(e.into())
        }
    }
}

/// `None` runs both directions
async fn run_listener(config: &Config, direction: Option<Direction>) -> Result<()> {
    let metrics: Option<SharedMetrics> = config.health.as_ref().map(|_| Arc::new(Metrics::new()));

    if let (Some(health), Some(metrics)) = (config.health.clone(), metrics.clone()) {
        tokio::spawn(async move {
            if let Err(e) = server::start_server(&health.bind_address, health.port, metrics).await {
                warn!(error = %e, "Health server stopped");
            }
        });
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    let result = match direction {
        Some(Direction::AToB) => roles::listen_on_a_relay_to_b(config, metrics, shutdown_rx).await,
        Some(Direction::BToA) => roles::listen_on_b_relay_to_a(config, metrics, shutdown_rx).await,
        None => roles::listen_all(config, metrics, shutdown_rx).await,
    };

    match &result {
        Ok(()) => info!("Listener stopped"),
        Err(e) => error!(error = %e, "Listener failed"),
    }
    result
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lockbridge=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
