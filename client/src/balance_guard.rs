use std::sync::Arc;

use shared::amount::{from_base_units, to_base_units, AmountError};
use shared::shared_spin_game::TokenConfig;
use thiserror::Error;

use crate::chain::{BalanceSource, WalletError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
    #[error("insufficient funds: {required} base units required, {available} available")]
    InsufficientFunds { required: u128, available: u128 },
    #[error("could not read balance: {0}")]
    BalanceQuery(WalletError),
}

/// Read-only check that an account can cover a spend before anything is signed.
#[derive(Clone)]
pub struct BalanceGuard {
    source: Arc<dyn BalanceSource>,
}

impl BalanceGuard {
    pub fn new(source: Arc<dyn BalanceSource>) -> Self {
        Self { source }
    }

    /// Returns the spend in base units when `account` holds at least that much of `token`.
    pub async fn ensure_sufficient(
        &self,
        account: &str,
        amount: &str,
        token: &TokenConfig,
    ) -> Result<u128, GuardError> {
        // Malformed amounts never reach the network.
        let required = to_base_units(amount, token.decimals)?;

        let available = self
            .source
            .get_balance(account, token)
            .await
            .map_err(GuardError::BalanceQuery)?;

        if available < required {
            tracing::info!(
                "Balance check failed for {}: needs {} {}, has {}",
                account,
                from_base_units(required, token.decimals),
                token.symbol,
                from_base_units(available, token.decimals)
            );
            return Err(GuardError::InsufficientFunds { required, available });
        }

        Ok(required)
    }
}
