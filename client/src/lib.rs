//! Client side of the spin-to-win game: balance checks, on-chain payment, outcome resolution
//! and the timed wheel reveal, coordinated by [`machine::SpinMachine`].

pub mod balance_guard;
pub mod cashier;
pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod machine;
pub mod outcome_client;
pub mod renderer;
pub mod sim;
pub mod timers;
pub mod transfer;
