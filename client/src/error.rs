use shared::constants::{
    INSUFFICIENT_FUNDS_ERROR, INVALID_AMOUNT_ERROR, NETWORK_ERROR, NO_FUNDS_MOVED_NOTICE,
    OUTCOME_PENDING_NOTICE, TRANSFER_UNCERTAIN_NOTICE, WALLET_REJECTED_ERROR,
};
use shared::wheel_geometry::GeometryError;
use thiserror::Error;

use crate::balance_guard::GuardError;
use crate::chain::{TransactionId, WalletError};
use crate::machine::SpinPhase;
use crate::outcome_client::ResolutionError;
use crate::transfer::TransferError;

/// What a failed attempt did to the user's funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsState {
    /// Nothing was signed or broadcast.
    Untouched,
    /// A transfer was attempted and its fate is unknown.
    Uncertain,
    /// The payment landed but no outcome was declared for it.
    SpentAwaitingOutcome,
}

/// Why an attempt ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpinError {
    #[error("wallet unavailable: {0}")]
    Wallet(WalletError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("payment {transaction} received but not resolved: {source}")]
    Resolution {
        transaction: TransactionId,
        source: ResolutionError,
    },
    #[error("payment {transaction} resolved to an outcome the wheel cannot show: {source}")]
    Geometry {
        transaction: TransactionId,
        source: GeometryError,
    },
}

impl SpinError {
    pub fn funds(&self) -> FundsState {
        match self {
            SpinError::Wallet(_) | SpinError::Guard(_) => FundsState::Untouched,
            SpinError::Transfer(e) if e.is_user_rejection() => FundsState::Untouched,
            SpinError::Transfer(_) => FundsState::Uncertain,
            SpinError::Resolution { .. } | SpinError::Geometry { .. } => {
                FundsState::SpentAwaitingOutcome
            }
        }
    }

    pub fn transaction(&self) -> Option<&TransactionId> {
        match self {
            SpinError::Resolution { transaction, .. } | SpinError::Geometry { transaction, .. } => {
                Some(transaction)
            }
            SpinError::Transfer(TransferError::ConfirmationTimeout { transaction, .. }) => {
                Some(transaction)
            }
            _ => None,
        }
    }

    /// The single user-facing message for this failure.
    pub fn notice(&self) -> SpinNotice {
        let headline = match self {
            SpinError::Wallet(_) => NETWORK_ERROR.to_string(),
            SpinError::Guard(GuardError::InvalidAmount(_)) => INVALID_AMOUNT_ERROR.to_string(),
            SpinError::Guard(GuardError::InsufficientFunds { .. }) => {
                INSUFFICIENT_FUNDS_ERROR.to_string()
            }
            SpinError::Guard(GuardError::BalanceQuery(_)) => NETWORK_ERROR.to_string(),
            SpinError::Transfer(e) if e.is_user_rejection() => WALLET_REJECTED_ERROR.to_string(),
            SpinError::Transfer(e) => e.to_string(),
            SpinError::Resolution { source, .. } => source.to_string(),
            SpinError::Geometry { source, .. } => source.to_string(),
        };

        let funds = self.funds();
        let consequence = match funds {
            FundsState::Untouched => NO_FUNDS_MOVED_NOTICE,
            FundsState::Uncertain => TRANSFER_UNCERTAIN_NOTICE,
            FundsState::SpentAwaitingOutcome => OUTCOME_PENDING_NOTICE,
        };

        SpinNotice {
            message: format!("{}. {}", headline, consequence),
            funds,
            transaction: self.transaction().cloned(),
        }
    }
}

/// The one dismissible notice shown when an attempt fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinNotice {
    pub message: String,
    pub funds: FundsState,
    pub transaction: Option<TransactionId>,
}

/// Why a spin request was refused without starting an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpinRejected {
    #[error("a spin is already in progress ({0:?})")]
    Busy(SpinPhase),
    #[error("the previous failure has not been acknowledged")]
    NoticePending,
    #[error("the spin machine has been torn down")]
    TornDown,
    #[error("no async runtime is available to run the spin")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_notices_distinguish_fund_state() {
        let guard = SpinError::Guard(GuardError::InsufficientFunds {
            required: 150,
            available: 100,
        });
        let notice = guard.notice();
        assert_eq!(notice.funds, FundsState::Untouched);
        assert!(notice.message.contains(NO_FUNDS_MOVED_NOTICE));

        let timeout = SpinError::Transfer(TransferError::ConfirmationTimeout {
            transaction: TransactionId("0xabc".to_string()),
            waited: Duration::from_secs(120),
        });
        let notice = timeout.notice();
        assert_eq!(notice.funds, FundsState::Uncertain);
        assert!(notice.message.contains(TRANSFER_UNCERTAIN_NOTICE));
        assert!(!notice.message.contains(NO_FUNDS_MOVED_NOTICE));
        assert_eq!(notice.transaction, Some(TransactionId("0xabc".to_string())));

        let rejected = SpinError::Transfer(TransferError::TransferRejected(WalletError::UserRejected));
        assert_eq!(rejected.notice().funds, FundsState::Untouched);

        let dropped = SpinError::Transfer(TransferError::TransferRejected(WalletError::Network(
            "connection reset".to_string(),
        )));
        assert_eq!(dropped.notice().funds, FundsState::Uncertain);
    }

    #[test]
    fn test_resolution_failure_is_paid_but_pending() {
        let error = SpinError::Resolution {
            transaction: TransactionId("0xabc".to_string()),
            source: ResolutionError::NoDeclaredWinner,
        };
        let notice = error.notice();
        assert_eq!(notice.funds, FundsState::SpentAwaitingOutcome);
        assert!(notice.message.contains(OUTCOME_PENDING_NOTICE));
        assert_eq!(notice.transaction, Some(TransactionId("0xabc".to_string())));
    }
}
