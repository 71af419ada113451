//! Ports to the wallet and the chain.
//!
//! The spin pipeline never talks to a wallet SDK directly; it is handed implementations of
//! these traits so tests and the demo can substitute an in-memory chain.

use std::fmt;

use async_trait::async_trait;
use shared::shared_spin_game::{TokenConfig, TokenKind};
use thiserror::Error;

/// Opaque identifier of a submitted transfer, used as proof of payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no wallet account is connected")]
    NotConnected,
    #[error("the request was rejected in the wallet")]
    UserRejected,
    #[error("network error: {0}")]
    Network(String),
}

/// A single transfer, shaped by the kind of token being moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferCall {
    Native {
        to: String,
        amount: u128,
    },
    Fungible {
        contract: String,
        to: String,
        amount: u128,
    },
}

impl TransferCall {
    pub fn for_token(token: &TokenConfig, to: &str, amount: u128) -> Self {
        match &token.kind {
            TokenKind::Native => TransferCall::Native {
                to: to.to_string(),
                amount,
            },
            TokenKind::Fungible { contract } => TransferCall::Fungible {
                contract: contract.clone(),
                to: to.to_string(),
                amount,
            },
        }
    }

    pub fn amount(&self) -> u128 {
        match self {
            TransferCall::Native { amount, .. } | TransferCall::Fungible { amount, .. } => *amount,
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            TransferCall::Native { to, .. } | TransferCall::Fungible { to, .. } => to,
        }
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn current_address(&self) -> Result<String, WalletError>;

    /// Signs and submits `call`, returning once the network has accepted it.
    async fn sign_and_send_transfer(&self, call: &TransferCall) -> Result<TransactionId, WalletError>;

    async fn is_confirmed(&self, transaction: &TransactionId) -> Result<bool, WalletError>;
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Balance of `address` in base units of `token`'s underlying asset.
    async fn get_balance(&self, address: &str, token: &TokenConfig) -> Result<u128, WalletError>;
}
