use serde::{Deserialize, Serialize};

/// Probability the authority assigns to the one outcome it declares as the winner.
pub const DECLARED_WIN_PROBABILITY: f64 = 100.0;

/// One prize segment of the wheel, as declared by the outcome authority for a single attempt.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Outcome {
    pub id: i64,
    #[serde(rename = "name")]
    pub label: String,
    /// Payout multiplier, kept as the decimal string the authority sent.
    #[serde(rename = "value")]
    pub payout_multiplier: String,
    #[serde(rename = "probability")]
    pub declared_win_probability: f64,
}

impl Outcome {
    pub fn is_declared_winner(&self) -> bool {
        self.declared_win_probability == DECLARED_WIN_PROBABILITY
    }
}

/// How a token is moved and how its balance is read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenKind {
    Native,
    Fungible { contract: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub symbol: String,
    pub decimals: u8,
    pub kind: TokenKind,
}

impl TokenConfig {
    pub fn native(symbol: &str, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            kind: TokenKind::Native,
        }
    }

    pub fn fungible(symbol: &str, decimals: u8, contract: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
            kind: TokenKind::Fungible {
                contract: contract.to_string(),
            },
        }
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub transaction_hash: String,
    pub bet_amount: String,
    pub user_address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResolveResponse {
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

// Reveal sequence defaults, in time units
pub const DEFAULT_TIME_UNIT_MS: u64 = 1000;
pub const COUNTDOWN_UNITS: u32 = 3;
pub const TIP_INTERVAL_UNITS: u32 = 2;
pub const SPIN_DURATION_UNITS: u32 = 5;
pub const REVEAL_DURATION_UNITS: u32 = 3;

// Whole turns added to every spin for effect
pub const MIN_EXTRA_TURNS: u32 = 20;
pub const MAX_EXTRA_TURNS: u32 = 34;
