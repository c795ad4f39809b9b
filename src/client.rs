//! JSON-RPC implementations of the chain traits
//!
//! # Transaction Building
//!
//! Signing providers are built with `with_recommended_fillers()` so nonce,
//! gas limit and fee fields are populated by the node before the wallet signs.
//! A wallet-only provider fails with "missing properties".

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use futures::FutureExt;
use tracing::{debug, info};

use crate::chain::{ChainReader, SubmittedTx, TxReceiptSummary, TxSubmitter};
use crate::config::ChainEndpoint;
use crate::contracts::{bridge_lock_topic, BridgeCall, ERC20};
use crate::error::BridgeError;
use crate::events::{parse_bridge_lock_log, LockLog};
use crate::redact::Redacted;

/// Parse a hex private key into a signer
pub fn load_signer(private_key: &Redacted<String>) -> Result<PrivateKeySigner, BridgeError> {
    private_key
        .expose()
        .parse()
        .map_err(|_| BridgeError::Config("Invalid private key".to_string()))
}

/// Read-only client over an HTTP provider
pub struct EvmChainReader {
    provider: RootProvider<Http<Client>>,
    endpoint: ChainEndpoint,
}

impl EvmChainReader {
    pub fn new(endpoint: ChainEndpoint) -> Result<Self, BridgeError> {
        let url: Url = endpoint.rpc_url.parse().map_err(|e| {
            BridgeError::Config(format!("Invalid RPC URL for {}: {}", endpoint.name, e))
        })?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self { provider, endpoint })
    }
}

#[async_trait]
impl ChainReader for EvmChainReader {
    fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .wrap_err("Failed to get chain id")
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")
    }

    async fn native_balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .wrap_err_with(|| format!("Failed to get native balance of {}", account))
    }

    async fn token_balance(&self, token: Address, account: Address) -> Result<U256> {
        let contract = ERC20::new(token, &self.provider);
        let balance = contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get balance of {} on token {}: {}", account, token, e))?;

        Ok(balance._0)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let contract = ERC20::new(token, &self.provider);
        let decimals = contract
            .decimals()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get decimals of token {}: {}", token, e))?;

        Ok(decimals._0)
    }

    async fn bridge_lock_logs(
        &self,
        bridge: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LockLog>> {
        let filter = Filter::new()
            .address(bridge)
            .event_signature(bridge_lock_topic())
            .from_block(from_block)
            .to_block(to_block);

        let logs = self.provider.get_logs(&filter).await.wrap_err_with(|| {
            format!(
                "Failed to get BridgeLock logs for blocks {}-{}",
                from_block, to_block
            )
        })?;

        debug!(
            chain = %self.endpoint.name,
            from_block,
            to_block,
            count = logs.len(),
            "Fetched BridgeLock logs"
        );

        Ok(logs
            .iter()
            .filter_map(|log| parse_bridge_lock_log(&self.endpoint.name, log))
            .collect())
    }
}

/// Signing client for one account on one chain
pub struct EvmTxSubmitter {
    rpc_url: String,
    signer: PrivateKeySigner,
    endpoint: ChainEndpoint,
}

impl EvmTxSubmitter {
    pub fn new(endpoint: ChainEndpoint, private_key: &Redacted<String>) -> Result<Self, BridgeError> {
        let signer = load_signer(private_key)?;

        info!(
            chain = %endpoint.name,
            account = %signer.address(),
            "EVM signer initialized"
        );

        Ok(Self {
            rpc_url: endpoint.rpc_url.clone(),
            signer,
            endpoint,
        })
    }
}

#[async_trait]
impl TxSubmitter for EvmTxSubmitter {
    fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    fn account(&self) -> Address {
        self.signer.address()
    }

    async fn submit(&self, call: BridgeCall) -> Result<SubmittedTx> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.parse::<Url>().wrap_err("Invalid RPC URL")?);

        let step = call.step();
        let tx = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(call.target())
            .with_input(call.calldata());

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| eyre!("Failed to send {} transaction: {}", step, e))?;

        let tx_hash = *pending.tx_hash();
        let confirmation = async move {
            let receipt = pending
                .get_receipt()
                .await
                .map_err(|e| eyre!("Failed to get receipt: {}", e))?;

            Ok(TxReceiptSummary {
                tx_hash: receipt.transaction_hash,
                block_number: receipt.block_number,
                success: receipt.status(),
            })
        }
        .boxed();

        Ok(SubmittedTx::new(
            step,
            self.endpoint.name.clone(),
            tx_hash,
            confirmation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil account 0
    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn endpoint() -> ChainEndpoint {
        ChainEndpoint {
            name: "Anvil".to_string(),
            chain_id: 31337,
            rpc_url: "http://localhost:8545".to_string(),
        }
    }

    #[test]
    fn test_load_signer() {
        let signer = load_signer(&Redacted::new(ANVIL_KEY.to_string())).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let err = load_signer(&Redacted::new("0x1234".to_string())).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_submitter_account() {
        let submitter = EvmTxSubmitter::new(endpoint(), &Redacted::new(ANVIL_KEY.to_string())).unwrap();
        assert_eq!(
            submitter.account().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(submitter.endpoint().chain_id, 31337);
    }

    #[test]
    fn test_reader_rejects_bad_url() {
        let mut bad = endpoint();
        bad.rpc_url = "not a url".to_string();
        assert!(matches!(EvmChainReader::new(bad), Err(BridgeError::Config(_))));
    }
}
