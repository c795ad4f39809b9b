//! Bridge and token contract bindings
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the lock/unlock
//! bridge and the ERC20 token it escrows. [`BridgeCall`] is the typed form of
//! every state-changing call this crate makes.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::TxStep;

sol! {
    /// Lock/unlock bridge deployed on each chain
    #[sol(rpc)]
    contract LockBridge {
        /// Pull `amount` tokens from the caller into escrow (requires allowance)
        function lock(uint256 amount) external;

        /// Release escrowed tokens to `user` (owner only)
        function unlock(address user, uint256 amount) external;

        /// Emitted by `lock`
        event BridgeLock(address indexed user, uint256 amount);
    }

    /// ERC20 subset used by the sender
    #[sol(rpc)]
    contract ERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// Canonical BridgeLock signature (indexing does not change the topic hash)
pub const BRIDGE_LOCK_SIGNATURE: &str = "BridgeLock(address,uint256)";

/// topic0 of BridgeLock logs
pub fn bridge_lock_topic() -> B256 {
    keccak256(BRIDGE_LOCK_SIGNATURE.as_bytes())
}

/// A state-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    /// `token.approve(spender, amount)`
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    /// `bridge.lock(amount)`
    Lock { bridge: Address, amount: U256 },
    /// `bridge.unlock(user, amount)`
    Unlock {
        bridge: Address,
        user: Address,
        amount: U256,
    },
}

impl BridgeCall {
    pub fn step(&self) -> TxStep {
        match self {
            BridgeCall::Approve { .. } => TxStep::Approve,
            BridgeCall::Lock { .. } => TxStep::Lock,
            BridgeCall::Unlock { .. } => TxStep::Unlock,
        }
    }

    /// Contract the transaction is sent to
    pub fn target(&self) -> Address {
        match self {
            BridgeCall::Approve { token, .. } => *token,
            BridgeCall::Lock { bridge, .. } | BridgeCall::Unlock { bridge, .. } => *bridge,
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            BridgeCall::Approve { amount, .. }
            | BridgeCall::Lock { amount, .. }
            | BridgeCall::Unlock { amount, .. } => *amount,
        }
    }

    /// ABI-encoded calldata (selector + arguments)
    pub fn calldata(&self) -> Bytes {
        match self {
            BridgeCall::Approve {
                spender, amount, ..
            } => ERC20::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode()
            .into(),
            BridgeCall::Lock { amount, .. } => {
                LockBridge::lockCall { amount: *amount }.abi_encode().into()
            }
            BridgeCall::Unlock { user, amount, .. } => LockBridge::unlockCall {
                user: *user,
                amount: *amount,
            }
            .abi_encode()
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use alloy::sol_types::SolEvent;

    fn selector(signature: &str) -> [u8; 4] {
        let hash = keccak256(signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    #[test]
    fn test_bridge_lock_topic_matches_binding() {
        assert_eq!(bridge_lock_topic(), LockBridge::BridgeLock::SIGNATURE_HASH);
    }

    #[test]
    fn test_approve_calldata() {
        let spender = address!("0CD517ba2C211BB1bA3a33CC959FF8764EaE39af");
        let call = BridgeCall::Approve {
            token: address!("a2a00beCACd814DfaE89545c7109998F7fd87FB4"),
            spender,
            amount: U256::from(10u64),
        };
        let data = call.calldata();

        // approve(address,uint256) = 0x095ea7b3
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[16..36], spender.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(10u64));
        assert_eq!(call.step(), TxStep::Approve);
        assert_eq!(
            call.target(),
            address!("a2a00beCACd814DfaE89545c7109998F7fd87FB4")
        );
    }

    #[test]
    fn test_lock_and_unlock_calldata() {
        let bridge = address!("0CD517ba2C211BB1bA3a33CC959FF8764EaE39af");
        let user = address!("0000000000000000000000000000000000000abc");

        let lock = BridgeCall::Lock {
            bridge,
            amount: U256::from(7u64),
        };
        let data = lock.calldata();
        assert_eq!(&data[..4], &selector("lock(uint256)"));
        assert_eq!(U256::from_be_slice(&data[4..36]), U256::from(7u64));
        assert_eq!(lock.target(), bridge);

        let unlock = BridgeCall::Unlock {
            bridge,
            user,
            amount: U256::from(11u64),
        };
        let data = unlock.calldata();
        assert_eq!(&data[..4], &selector("unlock(address,uint256)"));
        assert_eq!(&data[16..36], user.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(11u64));
        assert_eq!(unlock.step(), TxStep::Unlock);
        assert_eq!(unlock.amount(), U256::from(11u64));
    }
}
