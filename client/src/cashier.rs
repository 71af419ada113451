use std::sync::Arc;

use shared::amount::from_base_units;
use shared::shared_spin_game::TokenConfig;
use thiserror::Error;

use crate::balance_guard::{BalanceGuard, GuardError};
use crate::chain::{TransactionId, WalletError, WalletProvider};
use crate::transfer::{TokenTransferService, TransferError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepositError {
    #[error("wallet unavailable: {0}")]
    Wallet(WalletError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub transaction: TransactionId,
    pub account: String,
    pub amount: u128,
}

/// Moves funds into the game treasury. Crediting the deposit is left to whoever holds the
/// receipt.
pub struct Cashier {
    wallet: Arc<dyn WalletProvider>,
    guard: BalanceGuard,
    transfers: TokenTransferService,
    treasury: String,
    token: TokenConfig,
}

impl Cashier {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        guard: BalanceGuard,
        transfers: TokenTransferService,
        treasury: &str,
        token: TokenConfig,
    ) -> Self {
        Self {
            wallet,
            guard,
            transfers,
            treasury: treasury.to_string(),
            token,
        }
    }

    pub async fn deposit(&self, amount: &str) -> Result<DepositReceipt, DepositError> {
        let account = self
            .wallet
            .current_address()
            .await
            .map_err(DepositError::Wallet)?;

        let required = self
            .guard
            .ensure_sufficient(&account, amount, &self.token)
            .await?;

        let transaction = self
            .transfers
            .transfer(&account, &self.treasury, required, &self.token)
            .await?;

        tracing::info!(
            "💰 Deposit of {} {} from {} confirmed in {}",
            from_base_units(required, self.token.decimals),
            self.token.symbol,
            account,
            transaction
        );

        Ok(DepositReceipt {
            transaction,
            account,
            amount: required,
        })
    }
}
