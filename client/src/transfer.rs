use std::sync::Arc;
use std::time::Duration;

use shared::shared_spin_game::TokenConfig;
use thiserror::Error;
use tokio::time::{sleep, Instant};

use crate::chain::{TransactionId, TransferCall, WalletError, WalletProvider};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("transfer rejected: {0}")]
    TransferRejected(WalletError),
    #[error("transfer {transaction} was not confirmed within {waited:?}")]
    ConfirmationTimeout {
        transaction: TransactionId,
        waited: Duration,
    },
}

impl TransferError {
    /// True only when the wallet refused to sign, so nothing can have been broadcast.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, TransferError::TransferRejected(WalletError::UserRejected))
    }
}

/// Submits one on-chain transfer and waits for the network to include it.
#[derive(Clone)]
pub struct TokenTransferService {
    wallet: Arc<dyn WalletProvider>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl TokenTransferService {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            wallet,
            poll_interval,
            confirmation_timeout,
        }
    }

    pub async fn transfer(
        &self,
        account: &str,
        destination: &str,
        amount: u128,
        token: &TokenConfig,
    ) -> Result<TransactionId, TransferError> {
        let call = TransferCall::for_token(token, destination, amount);
        tracing::info!(
            "Submitting {} transfer of {} base units from {} to {}",
            token.symbol,
            amount,
            account,
            destination
        );

        let transaction = self
            .wallet
            .sign_and_send_transfer(&call)
            .await
            .map_err(TransferError::TransferRejected)?;

        self.await_confirmation(transaction).await
    }

    async fn await_confirmation(&self, transaction: TransactionId) -> Result<TransactionId, TransferError> {
        let started = Instant::now();
        loop {
            match self.wallet.is_confirmed(&transaction).await {
                Ok(true) => {
                    tracing::info!("Transfer {} confirmed after {:?}", transaction, started.elapsed());
                    return Ok(transaction);
                }
                Ok(false) => {}
                Err(e) => {
                    // The transfer is already broadcast; keep polling until the bound.
                    tracing::warn!("Confirmation query for {} failed: {}", transaction, e);
                }
            }

            let waited = started.elapsed();
            if waited + self.poll_interval > self.confirmation_timeout {
                tracing::error!("Transfer {} unconfirmed after {:?}", transaction, waited);
                return Err(TransferError::ConfirmationTimeout { transaction, waited });
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedChain;

    const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
    const COLLECTION: &str = "0x2222222222222222222222222222222222222222";

    fn service(chain: Arc<SimulatedChain>) -> TokenTransferService {
        TokenTransferService::new(chain, Duration::from_millis(500), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_waits_for_confirmation() {
        let chain = Arc::new(SimulatedChain::new(ACCOUNT));
        let token = TokenConfig::native("ETH", 18);
        chain.set_balance(ACCOUNT, &token, 1_000);
        chain.confirm_after_polls(3);
        chain.queue_transaction_id("0xabc");

        let started = Instant::now();
        let transaction = service(chain.clone())
            .transfer(ACCOUNT, COLLECTION, 400, &token)
            .await
            .unwrap();

        assert_eq!(transaction, TransactionId("0xabc".to_string()));
        assert_eq!(started.elapsed(), Duration::from_millis(1_500));
        assert_eq!(chain.balance(ACCOUNT, &token), 600);
        assert_eq!(chain.balance(COLLECTION, &token), 400);
    }

    #[tokio::test]
    async fn test_fungible_token_dispatch() {
        let chain = Arc::new(SimulatedChain::new(ACCOUNT));
        let token = TokenConfig::fungible("USDC", 6, "0xA0b86991c6218b36c1d19d4a2e9eb0ce3606eB48");
        chain.set_balance(ACCOUNT, &token, 5_000_000);

        service(chain.clone())
            .transfer(ACCOUNT, COLLECTION, 2_000_000, &token)
            .await
            .unwrap();

        assert_eq!(
            chain.submitted_transfers(),
            vec![TransferCall::Fungible {
                contract: "0xA0b86991c6218b36c1d19d4a2e9eb0ce3606eB48".to_string(),
                to: COLLECTION.to_string(),
                amount: 2_000_000,
            }]
        );
        assert_eq!(chain.balance(COLLECTION, &token), 2_000_000);
    }

    #[tokio::test]
    async fn test_user_rejection_is_distinct() {
        let chain = Arc::new(SimulatedChain::new(ACCOUNT));
        chain.reject_transfers(WalletError::UserRejected);

        let err = service(chain)
            .transfer(ACCOUNT, COLLECTION, 1, &TokenConfig::native("ETH", 18))
            .await
            .unwrap_err();

        assert!(err.is_user_rejection());

        let network = TransferError::TransferRejected(WalletError::Network("timeout".to_string()));
        assert!(!network.is_user_rejection());
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout() {
        let chain = Arc::new(SimulatedChain::new(ACCOUNT));
        let token = TokenConfig::native("ETH", 18);
        chain.set_balance(ACCOUNT, &token, 10);
        chain.never_confirm();

        let err = service(chain)
            .transfer(ACCOUNT, COLLECTION, 5, &token)
            .await
            .unwrap_err();

        match err {
            TransferError::ConfirmationTimeout { waited, .. } => {
                assert!(waited <= Duration::from_secs(10));
                assert!(waited >= Duration::from_millis(9_500));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
