//! Pre-send balance checks
//!
//! The sender refuses to submit anything unless the account can pay gas and
//! holds enough tokens for the lock. Native balance is checked first.

use alloy::primitives::{Address, U256};
use tracing::{debug, warn};

use crate::chain::ChainReader;
use crate::error::BridgeError;
use crate::tokens::{from_token_units, DEFAULT_DECIMALS};

/// Balances observed right before a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub native: U256,
    pub token: U256,
}

#[derive(Debug, Clone, Copy)]
pub struct BalanceGuard {
    min_native_balance: U256,
    decimals: u8,
}

impl Default for BalanceGuard {
    fn default() -> Self {
        Self::new(U256::ZERO)
    }
}

impl BalanceGuard {
    pub fn new(min_native_balance: U256) -> Self {
        Self {
            min_native_balance,
            decimals: DEFAULT_DECIMALS,
        }
    }

    /// Decimals used when logging token amounts
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Native balance the account must hold; never less than 1 wei
    pub fn required_native(&self) -> U256 {
        self.min_native_balance.max(U256::from(1u8))
    }

    /// Verify `account` can pay gas and lock `required` tokens
    pub async fn check(
        &self,
        reader: &dyn ChainReader,
        token: Address,
        account: Address,
        required: U256,
    ) -> Result<BalanceSnapshot, BridgeError> {
        if required.is_zero() {
            return Err(BridgeError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        let chain = reader.endpoint().name.as_str();

        let native = reader
            .native_balance(account)
            .await
            .map_err(|e| BridgeError::rpc(chain, &e))?;
        let required_native = self.required_native();
        if native < required_native {
            warn!(
                chain = %chain,
                account = %account,
                balance = %native,
                required = %required_native,
                "Insufficient native balance for gas"
            );
            return Err(BridgeError::InsufficientNativeBalance {
                chain: chain.to_string(),
                account,
                balance: native,
                required: required_native,
                shortfall: required_native - native,
            });
        }

        let token_balance = reader
            .token_balance(token, account)
            .await
            .map_err(|e| BridgeError::rpc(chain, &e))?;
        if token_balance < required {
            warn!(
                chain = %chain,
                account = %account,
                token = %token,
                balance = %token_balance,
                required = %required,
                "Insufficient token balance"
            );
            return Err(BridgeError::InsufficientTokenBalance {
                chain: chain.to_string(),
                account,
                token,
                balance: token_balance,
                required,
                shortfall: required - token_balance,
            });
        }

        debug!(
            chain = %chain,
            account = %account,
            native = %native,
            token_balance = %from_token_units(token_balance, self.decimals),
            "Balance check passed"
        );

        Ok(BalanceSnapshot {
            native,
            token: token_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_native_floor() {
        assert_eq!(BalanceGuard::default().required_native(), U256::from(1u8));
        assert_eq!(
            BalanceGuard::new(U256::from(5_000u64)).required_native(),
            U256::from(5_000u64)
        );
    }

    #[test]
    fn test_decimals() {
        assert_eq!(BalanceGuard::default().decimals(), DEFAULT_DECIMALS);
        let guard = BalanceGuard::new(U256::ZERO).with_decimals(6);
        assert_eq!(guard.decimals(), 6);
        assert_eq!(guard.required_native(), U256::from(1u8));
    }
}
