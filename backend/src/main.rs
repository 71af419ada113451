use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::BackendConfig;
use crate::games::backend_spin_game::create_router as create_spin_game_router;
use crate::ledger::{InMemoryLedger, ProofLedger, RedisLedger};

mod config;
mod error;
mod games;
mod ledger;
mod logging;

#[derive(Clone)]
pub struct AppState {
    config: Arc<BackendConfig>,
    ledger: Arc<dyn ProofLedger>,
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods(vec![Method::POST, Method::OPTIONS])
        .allow_headers(vec![header::CONTENT_TYPE]);

    Router::new()
        .nest("/spin", create_spin_game_router())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    logging::setup();

    let config = BackendConfig::from_env()?;

    let ledger: Arc<dyn ProofLedger> = match &config.redis_url {
        Some(url) => {
            info!("Recording spent proofs in Redis");
            Arc::new(RedisLedger::open(url)?)
        }
        None => {
            warn!("REDIS_URL not set; spent proofs are kept in memory and lost on restart");
            Arc::new(InMemoryLedger::default())
        }
    };

    let addr = config.bind_addr;
    let state = AppState {
        config: Arc::new(config),
        ledger,
    };

    let listener = TcpListener::bind(addr).await?;
    info!("🎡 Spin outcome authority listening on {}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            config: Arc::new(BackendConfig::from_lookup(|_| None).unwrap()),
            ledger: Arc::new(InMemoryLedger::default()),
        }
    }

    #[tokio::test]
    async fn test_resolve_is_served_under_spin_prefix() {
        let body = serde_json::json!({
            "transactionHash": "0xabc",
            "betAmount": "0.2",
            "userAddress": "0x1111111111111111111111111111111111111111",
        });
        let response = app(state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/spin/resolve")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app(state())
            .oneshot(Request::builder().uri("/wheel/spin").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
