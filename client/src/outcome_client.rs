use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use shared::constants::RESOLVE_ENDPOINT;
use shared::shared_spin_game::{ErrorBody, Outcome, ResolveRequest, ResolveResponse};
use thiserror::Error;

use crate::chain::TransactionId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("could not reach the outcome authority: {0}")]
    Transport(String),
    #[error("outcome authority refused the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed outcome response: {0}")]
    Malformed(String),
    #[error("no outcome was declared the winner")]
    NoDeclaredWinner,
    #[error("{0} outcomes were declared the winner")]
    AmbiguousWinner(usize),
}

/// The authoritative result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcomes: Vec<Outcome>,
    pub winner: Outcome,
}

impl Resolution {
    /// Accepts a response only when exactly one outcome carries the winning probability.
    pub fn from_response(response: ResolveResponse) -> Result<Self, ResolutionError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = response.outcomes.iter().find(|outcome| !seen.insert(outcome.id)) {
            return Err(ResolutionError::Malformed(format!(
                "outcome id {} appears more than once",
                duplicate.id
            )));
        }

        if let Some(outcome) = response.outcomes.iter().find(|outcome| {
            let p = outcome.declared_win_probability;
            !p.is_finite() || !(0.0..=100.0).contains(&p)
        }) {
            return Err(ResolutionError::Malformed(format!(
                "outcome id {} has probability {} outside 0..=100",
                outcome.id, outcome.declared_win_probability
            )));
        }

        let mut winners = response.outcomes.iter().filter(|outcome| outcome.is_declared_winner());
        let winner = winners.next().cloned().ok_or(ResolutionError::NoDeclaredWinner)?;
        let extra = winners.count();
        if extra > 0 {
            return Err(ResolutionError::AmbiguousWinner(extra + 1));
        }

        Ok(Self {
            outcomes: response.outcomes,
            winner,
        })
    }
}

/// Remote authority that turns a payment proof into a declared outcome.
#[async_trait]
pub trait OutcomeAuthority: Send + Sync {
    async fn submit(&self, request: &ResolveRequest) -> Result<ResolveResponse, ResolutionError>;
}

pub struct HttpOutcomeAuthority {
    http: reqwest::Client,
    base_url: String,
}

impl HttpOutcomeAuthority {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ResolutionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Maps an authority reply onto the response type or a refusal.
pub fn decode_reply(status: StatusCode, body: &str) -> Result<ResolveResponse, ResolutionError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.to_string());
        return Err(ResolutionError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(body).map_err(|e| ResolutionError::Malformed(e.to_string()))
}

#[async_trait]
impl OutcomeAuthority for HttpOutcomeAuthority {
    async fn submit(&self, request: &ResolveRequest) -> Result<ResolveResponse, ResolutionError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, RESOLVE_ENDPOINT))
            .json(request)
            .send()
            .await
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResolutionError::Transport(e.to_string()))?;

        decode_reply(status, &body)
    }
}

#[derive(Clone)]
pub struct OutcomeClient {
    authority: Arc<dyn OutcomeAuthority>,
}

impl OutcomeClient {
    pub fn new(authority: Arc<dyn OutcomeAuthority>) -> Self {
        Self { authority }
    }

    pub async fn resolve(
        &self,
        proof: &TransactionId,
        bet_amount: &str,
        account: &str,
    ) -> Result<Resolution, ResolutionError> {
        let request = ResolveRequest {
            transaction_hash: proof.to_string(),
            bet_amount: bet_amount.to_string(),
            user_address: account.to_string(),
        };

        let response = self.authority.submit(&request).await?;
        let resolution = Resolution::from_response(response)?;
        tracing::info!(
            "Outcome for {}: {} ({}x) among {} outcomes",
            proof,
            resolution.winner.label,
            resolution.winner.payout_multiplier,
            resolution.outcomes.len()
        );
        Ok(resolution)
    }
}
