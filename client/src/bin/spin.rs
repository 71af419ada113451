use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use client::balance_guard::BalanceGuard;
use client::config::ClientConfig;
use client::logging;
use client::machine::{SpinMachine, SpinPhase, SpinServices, SpinView};
use client::outcome_client::{HttpOutcomeAuthority, OutcomeClient};
use client::renderer::LoggingRenderer;
use client::sim::SimulatedChain;
use client::transfer::TokenTransferService;
use shared::amount::{from_base_units, to_base_units};
use shared::wheel_geometry::{segment_under_pointer, whole_degrees};
use tokio::sync::watch;
use tokio::time::{interval, Instant};

/// Runs one spin against the configured outcome authority, paying from a simulated wallet.
#[derive(Debug, Parser)]
#[command(name = "spin", version)]
struct Args {
    /// Bet in whole token units, e.g. 0.2
    #[arg(long)]
    bet: String,

    /// Starting balance of the simulated wallet
    #[arg(long, default_value = "10")]
    balance: String,

    /// Address of the simulated wallet
    #[arg(long, env = "SPIN_ACCOUNT", default_value = "0x1111111111111111111111111111111111111111")]
    account: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::setup();
    let args = Args::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let token = config.spin.token.clone();

    let starting_balance = match to_base_units(&args.balance, token.decimals) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Invalid --balance: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let authority = match HttpOutcomeAuthority::new(&config.api_base_url, config.request_timeout) {
        Ok(authority) => authority,
        Err(e) => {
            eprintln!("Could not build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let chain = Arc::new(SimulatedChain::new(&args.account));
    chain.set_balance(&args.account, &token, starting_balance);

    let services = SpinServices {
        wallet: chain.clone(),
        guard: BalanceGuard::new(chain.clone()),
        transfers: TokenTransferService::new(
            chain.clone(),
            config.confirmation_poll,
            config.confirmation_timeout,
        ),
        outcomes: OutcomeClient::new(Arc::new(authority)),
        renderer: Arc::new(LoggingRenderer),
    };
    let machine = SpinMachine::new(services, config.spin.clone());

    let printer = tokio::spawn(print_view(machine.subscribe()));

    let handle = match machine.request_spin(&args.bet) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Spin refused: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match handle.await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Spin task failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    machine.teardown();
    printer.abort();

    match result {
        Ok(receipt) => {
            let segments = machine.view().wheel.outcomes.len();
            let angle = match whole_degrees(receipt.stop_angle) {
                Some(degrees) => degrees.to_string(),
                None => format!("{:.3}", receipt.stop_angle),
            };
            println!(
                "Won {} ({}x), wheel stopped at {} degrees on segment {}",
                receipt.winner.label,
                receipt.winner.payout_multiplier,
                angle,
                segment_under_pointer(receipt.stop_angle, segments)
            );
            println!("Payment: {}", receipt.transaction);
            println!(
                "Remaining balance: {} {}",
                from_base_units(chain.balance(&args.account, &token), token.decimals),
                token.symbol
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", e.notice().message);
            ExitCode::FAILURE
        }
    }
}

async fn print_view(mut views: watch::Receiver<SpinView>) {
    let mut last_line = String::new();
    let mut frames = interval(Duration::from_millis(500));
    let mut spin_started: Option<Instant> = None;

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return;
                }
                let view = views.borrow_and_update().clone();
                if view.phase == SpinPhase::Spinning && spin_started.is_none() {
                    spin_started = Some(Instant::now());
                } else if view.phase != SpinPhase::Spinning {
                    spin_started = None;
                }

                let line = describe(&view);
                if line != last_line {
                    println!("{}", line);
                    last_line = line;
                }
            }
            _ = frames.tick() => {
                let animation = views.borrow().wheel.animation;
                let (Some(started), Some(animation)) = (spin_started, animation) else {
                    continue;
                };
                println!("  wheel at {:.1} degrees", animation.angle_at(started.elapsed()));
            }
        }
    }
}

fn describe(view: &SpinView) -> String {
    match view.phase {
        SpinPhase::CountingDown => format!(
            "{:?}: {} | {}",
            view.phase,
            view.countdown_remaining.unwrap_or(0),
            view.tip.as_deref().unwrap_or("")
        ),
        SpinPhase::Spinning => format!("{:?} | {}", view.phase, view.tip.as_deref().unwrap_or("")),
        SpinPhase::Revealing => format!(
            "{:?}: {}",
            view.phase,
            view.revealed.as_ref().map(|o| o.label.as_str()).unwrap_or("")
        ),
        SpinPhase::Failed => format!(
            "{:?}: {}",
            view.phase,
            view.notice.as_ref().map(|n| n.message.as_str()).unwrap_or("")
        ),
        phase => format!("{:?}", phase),
    }
}
