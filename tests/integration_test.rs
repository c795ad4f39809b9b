//! Integration tests against a live node
//!
//! These tests require real infrastructure:
//! - Anvil running on localhost:8545
//!
//! Run with: cargo test --test integration_test -- --ignored --nocapture
//!
//! Optional environment variables:
//! - EVM_RPC_URL (default: http://localhost:8545)
//! - EVM_CHAIN_ID (default: 31337)

use std::env;
use std::time::Duration;

use alloy::primitives::{Address, U256};

use lockbridge::client::EvmChainReader;
use lockbridge::roles::ensure_chain_id;
use lockbridge::{BridgeError, ChainEndpoint, ChainReader};

fn evm_rpc_url() -> String {
    env::var("EVM_RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string())
}

fn evm_chain_id() -> u64 {
    env::var("EVM_CHAIN_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(31337)
}

fn endpoint(chain_id: u64) -> ChainEndpoint {
    ChainEndpoint {
        name: "Anvil".to_string(),
        chain_id,
        rpc_url: evm_rpc_url(),
    }
}

#[tokio::test]
#[ignore = "requires Anvil running"]
async fn test_anvil_connectivity() {
    let response = reqwest::Client::new()
        .post(evm_rpc_url())
        .header("Content-Type", "application/json")
        .body(r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}"#)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Anvil is not reachable");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    let hex = body["result"].as_str().expect("missing result");
    let chain_id = u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap();
    assert_eq!(chain_id, evm_chain_id());
}

#[tokio::test]
#[ignore = "requires Anvil running"]
async fn test_reader_queries() {
    let reader = EvmChainReader::new(endpoint(evm_chain_id())).unwrap();

    assert_eq!(reader.chain_id().await.unwrap(), evm_chain_id());
    reader.block_number().await.unwrap();

    // Anvil account 0 is pre-funded
    let funded: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
    assert!(reader.native_balance(funded).await.unwrap() > U256::ZERO);

    // No bridge deployed at a random address, so no logs
    let head = reader.block_number().await.unwrap();
    let logs = reader
        .bridge_lock_logs(Address::repeat_byte(0x42), 0, head)
        .await
        .unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
#[ignore = "requires Anvil running"]
async fn test_chain_id_mismatch_is_config_error() {
    let reader = EvmChainReader::new(endpoint(evm_chain_id() + 1)).unwrap();
    let err = ensure_chain_id(&reader).await.unwrap_err();
    assert!(matches!(err, BridgeError::Config(_)));
}
