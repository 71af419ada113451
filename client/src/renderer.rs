use std::fmt;

/// Animation intensity hint for the ambient background effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Idle,
    Active,
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pace::Idle => write!(f, "idle"),
            Pace::Active => write!(f, "active"),
        }
    }
}

/// The continuously running background effect. Its only coupling to the spin pipeline is
/// the pace it is told to run at.
pub trait AmbientRenderer: Send + Sync {
    fn set_pace(&self, pace: Pace);
}

/// Renderer for headless runs: records pace changes in the log.
#[derive(Debug, Default)]
pub struct LoggingRenderer;

impl AmbientRenderer for LoggingRenderer {
    fn set_pace(&self, pace: Pace) {
        tracing::debug!("Ambient renderer pace set to {}", pace);
    }
}
