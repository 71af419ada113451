use std::env;
use std::str::FromStr;
use std::time::Duration;

use shared::constants::{API_BASE_URL, SPIN_TIPS};
use shared::shared_spin_game::{
    TokenConfig, COUNTDOWN_UNITS, DEFAULT_TIME_UNIT_MS, REVEAL_DURATION_UNITS, SPIN_DURATION_UNITS,
    TIP_INTERVAL_UNITS,
};
use shared::validation::validate_address;
use shared::wheel_geometry::{WheelLayout, SEGMENT_SKEW_CORRECTION};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Durations of the cosmetic reveal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTimings {
    pub countdown_tick: Duration,
    pub countdown_ticks: u32,
    pub tip_interval: Duration,
    pub spin: Duration,
    pub reveal: Duration,
}

impl RevealTimings {
    pub fn from_unit(unit: Duration) -> Self {
        Self {
            countdown_tick: unit,
            countdown_ticks: COUNTDOWN_UNITS,
            tip_interval: unit * TIP_INTERVAL_UNITS,
            spin: unit * SPIN_DURATION_UNITS,
            reveal: unit * REVEAL_DURATION_UNITS,
        }
    }

    pub fn countdown(&self) -> Duration {
        self.countdown_tick * self.countdown_ticks
    }
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self::from_unit(Duration::from_millis(DEFAULT_TIME_UNIT_MS))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpinConfig {
    /// Address every bet is paid to.
    pub collection_address: String,
    pub token: TokenConfig,
    pub timings: RevealTimings,
    pub wheel: WheelLayout,
    pub tips: Vec<String>,
}

impl SpinConfig {
    pub fn new(collection_address: &str, token: TokenConfig) -> Self {
        Self {
            collection_address: collection_address.to_string(),
            token,
            timings: RevealTimings::default(),
            wheel: WheelLayout::default(),
            tips: SPIN_TIPS.iter().map(|tip| tip.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub confirmation_poll: Duration,
    pub spin: SpinConfig,
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }

    /// Like `parsed`, but zero is rejected; these values drive interval timers.
    fn nonzero<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialEq + Default,
    {
        let value = self.parsed(name, default)?;
        if value == T::default() {
            return Err(ConfigError::Invalid {
                name,
                value: "0".to_string(),
            });
        }
        Ok(value)
    }

    fn address(&self, name: &'static str) -> Result<Option<String>, ConfigError> {
        match self.get(name) {
            Some(value) if validate_address(&value).is_err() => {
                Err(ConfigError::Invalid { name, value })
            }
            other => Ok(other),
        }
    }
}

impl ClientConfig {
    /// Reads `SPIN_*` variables, after loading a `.env` file when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let collection_address = vars
            .address("SPIN_COLLECTION_ADDRESS")?
            .ok_or(ConfigError::Missing("SPIN_COLLECTION_ADDRESS"))?;

        let symbol = vars.get("SPIN_TOKEN_SYMBOL").unwrap_or_else(|| "ETH".to_string());
        let decimals = vars.parsed("SPIN_TOKEN_DECIMALS", 18u8)?;
        let token = match vars.address("SPIN_TOKEN_CONTRACT")? {
            Some(contract) => TokenConfig::fungible(&symbol, decimals, &contract),
            None => TokenConfig::native(&symbol, decimals),
        };

        let unit = Duration::from_millis(vars.nonzero("SPIN_TIME_UNIT_MS", DEFAULT_TIME_UNIT_MS)?);
        let timings = RevealTimings {
            countdown_tick: unit,
            countdown_ticks: vars.nonzero("SPIN_COUNTDOWN_UNITS", COUNTDOWN_UNITS)?,
            tip_interval: unit * vars.nonzero("SPIN_TIP_UNITS", TIP_INTERVAL_UNITS)?,
            spin: unit * vars.parsed("SPIN_SPIN_UNITS", SPIN_DURATION_UNITS)?,
            reveal: unit * vars.parsed("SPIN_REVEAL_UNITS", REVEAL_DURATION_UNITS)?,
        };

        let mut spin = SpinConfig::new(&collection_address, token);
        spin.timings = timings;
        spin.wheel = WheelLayout::new(vars.parsed("SPIN_SKEW_CORRECTION", SEGMENT_SKEW_CORRECTION)?);

        Ok(Self {
            api_base_url: vars
                .get("SPIN_API_BASE_URL")
                .unwrap_or_else(|| API_BASE_URL.to_string()),
            request_timeout: Duration::from_millis(vars.parsed("SPIN_REQUEST_TIMEOUT_MS", 15_000u64)?),
            confirmation_timeout: Duration::from_millis(
                vars.parsed("SPIN_CONFIRM_TIMEOUT_MS", 120_000u64)?,
            ),
            confirmation_poll: Duration::from_millis(vars.nonzero("SPIN_CONFIRM_POLL_MS", 2_000u64)?),
            spin,
        })
    }
}
