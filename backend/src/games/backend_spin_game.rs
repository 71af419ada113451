use axum::{extract::State, routing::post, Json, Router};
use rand::rngs::OsRng;
use rand::Rng;
use shared::amount::{from_base_units, to_base_units};
use shared::shared_spin_game::{Outcome, ResolveRequest, ResolveResponse, DECLARED_WIN_PROBABILITY};
use shared::validation::{validate_address, validate_transaction_hash};

use crate::error::Error;
use crate::AppState;

/// One prize tier. Weights are percentages and sum to 100.
struct PrizeTier {
    id: i64,
    name: &'static str,
    multiplier: &'static str,
    weight: f64,
}

// Display order on the wheel
const PRIZE_TABLE: &[PrizeTier] = &[
    PrizeTier { id: 1, name: "Bust", multiplier: "0", weight: 40.0 },
    PrizeTier { id: 2, name: "Half Back", multiplier: "0.5", weight: 20.0 },
    PrizeTier { id: 3, name: "Break Even", multiplier: "1", weight: 20.0 },
    PrizeTier { id: 4, name: "Double", multiplier: "2", weight: 12.0 },
    PrizeTier { id: 5, name: "Triple", multiplier: "3", weight: 6.0 },
    PrizeTier { id: 6, name: "Jackpot", multiplier: "10", weight: 2.0 },
];

pub fn create_router() -> Router<AppState> {
    Router::new().route("/resolve", post(resolve_spin))
}

/// Index of the tier a roll in `0.0..100.0` falls into.
fn tier_for_roll(roll: f64) -> usize {
    let mut upper = 0.0;
    for (index, tier) in PRIZE_TABLE.iter().enumerate() {
        upper += tier.weight;
        if roll < upper {
            return index;
        }
    }
    PRIZE_TABLE.len() - 1
}

fn declare_outcomes(winner: usize) -> Vec<Outcome> {
    PRIZE_TABLE
        .iter()
        .enumerate()
        .map(|(index, tier)| Outcome {
            id: tier.id,
            label: tier.name.to_string(),
            payout_multiplier: tier.multiplier.to_string(),
            declared_win_probability: if index == winner { DECLARED_WIN_PROBABILITY } else { 0.0 },
        })
        .collect()
}

async fn resolve_spin(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, Error> {
    validate_address(&request.user_address).map_err(|_| Error::InvalidAddress)?;
    validate_transaction_hash(&request.transaction_hash).map_err(|_| Error::InvalidProof)?;

    let config = &state.config;
    let bet = to_base_units(&request.bet_amount, config.token_decimals)
        .map_err(|e| Error::InvalidAmount(e.to_string()))?;
    if bet < config.min_bet || bet > config.max_bet {
        return Err(Error::BetOutOfRange {
            min: from_base_units(config.min_bet, config.token_decimals),
            max: from_base_units(config.max_bet, config.token_decimals),
        });
    }

    if !state.ledger.claim(&request.transaction_hash, config.proof_ttl).await? {
        tracing::warn!(
            "🚫 Replayed proof {} from {}",
            request.transaction_hash,
            request.user_address
        );
        return Err(Error::ProofAlreadyUsed);
    }

    let roll = OsRng.gen_range(0.0..100.0);
    let winner = tier_for_roll(roll);
    let tier = &PRIZE_TABLE[winner];

    tracing::info!(
        "🎡 SPIN: {} bet {} with {} and rolled {:.2}: {} ({}x)",
        request.user_address,
        request.bet_amount,
        request.transaction_hash,
        roll,
        tier.name,
        tier.multiplier
    );

    Ok(Json(ResolveResponse {
        outcomes: declare_outcomes(winner),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::ledger::InMemoryLedger;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use shared::shared_spin_game::ErrorBody;
    use std::sync::Arc;
    use tower::ServiceExt;

    const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

    fn app() -> Router {
        let config = BackendConfig::from_lookup(|_| None).unwrap();
        create_router().with_state(AppState {
            config: Arc::new(config),
            ledger: Arc::new(InMemoryLedger::default()),
        })
    }

    fn request(hash: &str, amount: &str, address: &str) -> Request<Body> {
        let body = serde_json::json!({
            "transactionHash": hash,
            "betAmount": amount,
            "userAddress": address,
        });
        Request::builder()
            .method("POST")
            .uri("/resolve")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[test]
    fn test_prize_weights_sum_to_hundred() {
        let total: f64 = PRIZE_TABLE.iter().map(|tier| tier.weight).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_tier_for_roll_boundaries() {
        assert_eq!(tier_for_roll(0.0), 0);
        assert_eq!(tier_for_roll(39.99), 0);
        assert_eq!(tier_for_roll(40.0), 1);
        assert_eq!(tier_for_roll(79.99), 2);
        assert_eq!(tier_for_roll(91.5), 3);
        assert_eq!(tier_for_roll(93.0), 4);
        assert_eq!(tier_for_roll(99.99), 5);
    }

    #[tokio::test]
    async fn test_resolve_declares_exactly_one_winner() {
        let app = app();
        let (status, body) = send(&app, request("0xabc", "0.2", ACCOUNT)).await;

        assert_eq!(status, StatusCode::OK);
        let response: ResolveResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.outcomes.len(), PRIZE_TABLE.len());
        assert_eq!(
            response.outcomes.iter().filter(|o| o.is_declared_winner()).count(),
            1
        );
        assert!(response
            .outcomes
            .iter()
            .all(|o| o.declared_win_probability == 0.0 || o.is_declared_winner()));
        let ids: Vec<i64> = response.outcomes.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_replayed_proof_is_rejected() {
        let app = app();
        let (status, _) = send(&app, request("0xabc", "0.2", ACCOUNT)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, request("0xabc", "0.2", ACCOUNT)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "Transaction already used");
    }

    #[tokio::test]
    async fn test_malformed_requests_are_rejected() {
        let app = app();

        let (status, _) = send(&app, request("0xabc", "0.2", "not-an-address")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, request("abc", "0.2", ACCOUNT)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, request("0xabc", "-1", ACCOUNT)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(error.error.starts_with("Invalid bet amount"));

        let (status, _) = send(&app, request("0xabc", "1000", ACCOUNT)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Rejected requests do not consume the proof.
        let (status, _) = send(&app, request("0xabc", "0.2", ACCOUNT)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
