use std::net::SocketAddr;
use std::time::Duration;

use shared::amount::to_base_units;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("MIN_BET must not exceed MAX_BET")]
    EmptyBetRange,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub bind_addr: SocketAddr,
    /// Absent means proofs are tracked in memory only.
    pub redis_url: Option<String>,
    pub token_decimals: u8,
    pub min_bet: u128,
    pub max_bet: u128,
    pub proof_ttl: Duration,
    pub allowed_origins: Vec<String>,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "BIND_ADDR", value })?,
            None => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        let token_decimals = match get("TOKEN_DECIMALS") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "TOKEN_DECIMALS", value })?,
            None => 18,
        };

        let bet = |name: &'static str, default: &str| {
            let value = get(name).unwrap_or_else(|| default.to_string());
            to_base_units(&value, token_decimals).map_err(|_| ConfigError::Invalid { name, value })
        };
        let min_bet = bet("MIN_BET", "0.001")?;
        let max_bet = bet("MAX_BET", "100")?;
        if min_bet > max_bet {
            return Err(ConfigError::EmptyBetRange);
        }

        let proof_ttl = match get("PROOF_TTL_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name: "PROOF_TTL_SECS", value })?,
            ),
            None => Duration::from_secs(30 * 24 * 60 * 60),
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://127.0.0.1:8080,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            bind_addr,
            redis_url: get("REDIS_URL"),
            token_decimals,
            min_bet,
            max_bet,
            proof_ttl,
            allowed_origins,
        })
    }
}
