use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::shared_spin_game::ErrorBody;
use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid wallet address")]
    InvalidAddress,
    #[error("Invalid transaction hash")]
    InvalidProof,
    #[error("Invalid bet amount: {0}")]
    InvalidAmount(String),
    #[error("Bet must be between {min} and {max}")]
    BetOutOfRange { min: String, max: String },
    #[error("Transaction already used")]
    ProofAlreadyUsed,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidAddress
            | Error::InvalidProof
            | Error::InvalidAmount(_)
            | Error::BetOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Error::ProofAlreadyUsed => StatusCode::CONFLICT,
            Error::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::Ledger(e) => {
                tracing::error!("Proof ledger failure: {}", e);
                "Could not record transaction".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
