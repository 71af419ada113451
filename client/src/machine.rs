//! The spin state machine.
//!
//! One attempt runs as one tokio task: guard, transfer and resolve are awaited strictly in
//! sequence, then the countdown, spin and reveal play out on the clock. The machine is the only
//! writer of the published [`SpinView`]; renderers and UI code subscribe to it read-only.
//!
//! ```text
//! Idle -> Guarding -> Transferring -> Resolving -> CountingDown -> Spinning -> Revealing
//!      -> Settling -> Idle
//! any  -> Failed -> (dismiss_notice) -> Idle
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared::shared_spin_game::Outcome;
use shared::wheel_geometry::WheelRotation;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::balance_guard::BalanceGuard;
use crate::chain::{TransactionId, WalletProvider};
use crate::config::SpinConfig;
use crate::error::{FundsState, SpinError, SpinNotice, SpinRejected};
use crate::outcome_client::{OutcomeClient, Resolution};
use crate::renderer::{AmbientRenderer, Pace};
use crate::timers::{ScopedTimerSet, TimerSlot};
use crate::transfer::TokenTransferService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinPhase {
    Idle,
    Guarding,
    Transferring,
    Resolving,
    CountingDown,
    Spinning,
    Revealing,
    Settling,
    Failed,
}

impl SpinPhase {
    pub fn pace(self) -> Pace {
        match self {
            SpinPhase::Guarding
            | SpinPhase::Transferring
            | SpinPhase::Resolving
            | SpinPhase::CountingDown
            | SpinPhase::Spinning
            | SpinPhase::Revealing => Pace::Active,
            SpinPhase::Idle | SpinPhase::Settling | SpinPhase::Failed => Pace::Idle,
        }
    }
}

/// The unit of work for one bet. `winner` is only ever set together with the outcomes it was
/// chosen from, when the attempt leaves `Resolving`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinAttempt {
    pub bet_amount: String,
    pub account: Option<String>,
    pub transfer_id: Option<TransactionId>,
    pub outcomes: Vec<Outcome>,
    pub winner: Option<Outcome>,
    pub stop_angle: Option<f64>,
    pub started_at: Instant,
}

impl SpinAttempt {
    fn new(bet_amount: &str, started_at: Instant) -> Self {
        Self {
            bet_amount: bet_amount.to_string(),
            account: None,
            transfer_id: None,
            outcomes: Vec::new(),
            winner: None,
            stop_angle: None,
            started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WheelState {
    /// Segments in display order, from the latest resolve response.
    pub outcomes: Vec<Outcome>,
    pub rotation: f64,
    pub animation: Option<WheelRotation>,
    pub spins_applied: u64,
}

/// Everything a renderer needs to draw the spin, published on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinView {
    pub phase: SpinPhase,
    pub attempt: Option<SpinAttempt>,
    pub wheel: WheelState,
    pub countdown_remaining: Option<u32>,
    pub tip: Option<String>,
    /// Winning outcome shown in the result modal.
    pub revealed: Option<Outcome>,
    pub notice: Option<SpinNotice>,
}

impl Default for SpinView {
    fn default() -> Self {
        Self {
            phase: SpinPhase::Idle,
            attempt: None,
            wheel: WheelState::default(),
            countdown_remaining: None,
            tip: None,
            revealed: None,
            notice: None,
        }
    }
}

/// Result of an attempt whose payment was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinReceipt {
    pub transaction: TransactionId,
    pub winner: Outcome,
    pub stop_angle: f64,
    /// False when teardown cut the animation short.
    pub revealed: bool,
}

pub struct SpinServices {
    pub wallet: Arc<dyn WalletProvider>,
    pub guard: BalanceGuard,
    pub transfers: TokenTransferService,
    pub outcomes: OutcomeClient,
    pub renderer: Arc<dyn AmbientRenderer>,
}

struct Inner {
    services: SpinServices,
    config: SpinConfig,
    view: watch::Sender<SpinView>,
    timers: Mutex<ScopedTimerSet>,
    pace: Mutex<Pace>,
    shutdown: CancellationToken,
}

#[derive(Clone)]
pub struct SpinMachine {
    inner: Arc<Inner>,
}

impl SpinMachine {
    pub fn new(services: SpinServices, config: SpinConfig) -> Self {
        let (view, _) = watch::channel(SpinView::default());
        services.renderer.set_pace(Pace::Idle);
        Self {
            inner: Arc::new(Inner {
                services,
                config,
                view,
                timers: Mutex::new(ScopedTimerSet::new()),
                pace: Mutex::new(Pace::Idle),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SpinView> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> SpinView {
        self.inner.view.borrow().clone()
    }

    pub fn phase(&self) -> SpinPhase {
        self.inner.view.borrow().phase
    }

    pub fn armed_timers(&self) -> usize {
        self.inner.timers.lock().armed()
    }

    /// Starts an attempt for `bet_amount`, or refuses immediately when one is already running
    /// or a failure notice is still showing. Must be called from within a tokio runtime.
    pub fn request_spin(
        &self,
        bet_amount: &str,
    ) -> Result<JoinHandle<Result<SpinReceipt, SpinError>>, SpinRejected> {
        if self.inner.shutdown.is_cancelled() {
            return Err(SpinRejected::TornDown);
        }
        let runtime = Handle::try_current().map_err(|_| SpinRejected::NoRuntime)?;

        let started_at = Instant::now();
        let mut rejection = None;
        self.inner.view.send_if_modified(|view| match view.phase {
            SpinPhase::Idle => {
                view.phase = SpinPhase::Guarding;
                view.attempt = Some(SpinAttempt::new(bet_amount, started_at));
                view.countdown_remaining = None;
                view.tip = None;
                view.revealed = None;
                view.notice = None;
                view.wheel.animation = None;
                true
            }
            SpinPhase::Failed => {
                rejection = Some(SpinRejected::NoticePending);
                false
            }
            phase => {
                rejection = Some(SpinRejected::Busy(phase));
                false
            }
        });

        if let Some(rejection) = rejection {
            tracing::warn!("Spin request for {} refused: {}", bet_amount, rejection);
            return Err(rejection);
        }

        tracing::info!("Spin requested with bet {}", bet_amount);
        self.inner.update_pace(SpinPhase::Guarding.pace());

        let inner = self.inner.clone();
        let bet_amount = bet_amount.to_string();
        Ok(runtime.spawn(async move { inner.run_attempt(bet_amount).await }))
    }

    /// Acknowledges a failure notice, re-enabling spin requests.
    pub fn dismiss_notice(&self) -> bool {
        self.inner.view.send_if_modified(|view| {
            if view.phase != SpinPhase::Failed {
                return false;
            }
            view.phase = SpinPhase::Idle;
            view.notice = None;
            true
        })
    }

    /// Stops every cosmetic timer and the reveal sequence. A transfer or resolve call already
    /// in flight still runs to completion; its result is returned without being animated.
    pub fn teardown(&self) {
        tracing::info!("Tearing down spin machine");
        self.inner.shutdown.cancel();
        self.inner.timers.lock().disarm_all();
        self.inner.update_pace(Pace::Idle);
    }
}

impl Inner {
    async fn run_attempt(self: Arc<Self>, bet_amount: String) -> Result<SpinReceipt, SpinError> {
        match self.drive(&bet_amount).await {
            Ok(receipt) => Ok(receipt),
            Err(error) => {
                self.fail(&error);
                Err(error)
            }
        }
    }

    async fn drive(self: &Arc<Self>, bet_amount: &str) -> Result<SpinReceipt, SpinError> {
        let account = self
            .services
            .wallet
            .current_address()
            .await
            .map_err(SpinError::Wallet)?;
        self.update_attempt(|attempt| attempt.account = Some(account.clone()));

        let required = self
            .services
            .guard
            .ensure_sufficient(&account, bet_amount, &self.config.token)
            .await?;

        self.transition(SpinPhase::Transferring, |_| {});
        let transaction = self
            .services
            .transfers
            .transfer(
                &account,
                &self.config.collection_address,
                required,
                &self.config.token,
            )
            .await?;
        self.update_attempt(|attempt| attempt.transfer_id = Some(transaction.clone()));

        self.transition(SpinPhase::Resolving, |_| {});
        let resolution = self
            .services
            .outcomes
            .resolve(&transaction, bet_amount, &account)
            .await
            .map_err(|source| SpinError::Resolution {
                transaction: transaction.clone(),
                source,
            })?;

        // Computed once; the wheel must not be re-aimed after this point.
        let stop_angle = self
            .config
            .wheel
            .compute_stop_angle(
                resolution.winner.id,
                &resolution.outcomes,
                &mut rand::thread_rng(),
            )
            .map_err(|source| SpinError::Geometry {
                transaction: transaction.clone(),
                source,
            })?;

        let receipt = SpinReceipt {
            transaction,
            winner: resolution.winner.clone(),
            stop_angle,
            revealed: false,
        };

        if self.shutdown.is_cancelled() {
            return Ok(self.abandon(receipt));
        }

        let timings = self.config.timings;
        self.begin_countdown(&resolution, stop_angle);
        if !self.pause(timings.countdown()).await {
            return Ok(self.abandon(receipt));
        }

        self.start_spin(stop_angle, timings.spin);
        if !self.pause(timings.spin).await {
            return Ok(self.abandon(receipt));
        }

        self.reveal(&resolution.winner);
        if !self.pause(timings.reveal).await {
            return Ok(self.abandon(receipt));
        }

        self.settle();
        Ok(SpinReceipt {
            revealed: true,
            ..receipt
        })
    }

    fn begin_countdown(self: &Arc<Self>, resolution: &Resolution, stop_angle: f64) {
        let ticks = self.config.timings.countdown_ticks;
        let first_tip = self.config.tips.first().cloned();

        self.transition(SpinPhase::CountingDown, |view| {
            if let Some(attempt) = view.attempt.as_mut() {
                attempt.outcomes = resolution.outcomes.clone();
                attempt.winner = Some(resolution.winner.clone());
                attempt.stop_angle = Some(stop_angle);
            }
            view.wheel.outcomes = resolution.outcomes.clone();
            view.countdown_remaining = Some(ticks);
            view.tip = first_tip;
        });

        let mut timers = self.timers.lock();

        let weak = Arc::downgrade(self);
        timers.every(TimerSlot::Countdown, self.config.timings.countdown_tick, move || {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let mut more = false;
            inner.view.send_modify(|view| {
                if let Some(remaining) = view.countdown_remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                    more = *remaining > 0;
                }
            });
            more
        });

        let tips = self.config.tips.clone();
        if tips.len() > 1 {
            let weak = Arc::downgrade(self);
            let mut index = 0;
            timers.every(TimerSlot::TipRotation, self.config.timings.tip_interval, move || {
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                index = (index + 1) % tips.len();
                let tip = tips[index].clone();
                inner.view.send_modify(|view| view.tip = Some(tip));
                true
            });
        }
    }

    fn start_spin(&self, stop_angle: f64, duration: Duration) {
        self.timers.lock().disarm(TimerSlot::Countdown);
        self.transition(SpinPhase::Spinning, |view| {
            view.countdown_remaining = None;
            let from = view.wheel.rotation.rem_euclid(360.0);
            view.wheel.rotation = stop_angle;
            view.wheel.animation = Some(WheelRotation {
                from,
                to: stop_angle,
                duration,
            });
            view.wheel.spins_applied += 1;
        });
    }

    fn reveal(&self, winner: &Outcome) {
        self.timers.lock().disarm_all();
        self.transition(SpinPhase::Revealing, |view| {
            view.tip = None;
            view.revealed = Some(winner.clone());
        });
    }

    fn settle(&self) {
        self.timers.lock().disarm_all();
        self.transition(SpinPhase::Settling, |view| {
            view.revealed = None;
            view.tip = None;
            view.countdown_remaining = None;
        });
        self.transition(SpinPhase::Idle, |view| view.attempt = None);
    }

    fn abandon(&self, receipt: SpinReceipt) -> SpinReceipt {
        tracing::info!(
            "Attempt for {} stopped by teardown; outcome was {}",
            receipt.transaction,
            receipt.winner.label
        );
        self.settle();
        receipt
    }

    fn fail(&self, error: &SpinError) {
        self.timers.lock().disarm_all();
        let notice = error.notice();
        match notice.funds {
            FundsState::SpentAwaitingOutcome => {
                tracing::error!("Spin failed after payment: {}", error)
            }
            FundsState::Uncertain => tracing::error!("Spin transfer failed: {}", error),
            FundsState::Untouched => tracing::warn!("Spin failed before payment: {}", error),
        }
        self.transition(SpinPhase::Failed, |view| {
            view.attempt = None;
            view.countdown_remaining = None;
            view.tip = None;
            view.revealed = None;
            view.notice = Some(notice);
        });
    }

    /// Sleeps for a cosmetic delay; false when teardown interrupted it.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = sleep(duration) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }

    fn transition<F>(&self, phase: SpinPhase, apply: F)
    where
        F: FnOnce(&mut SpinView),
    {
        self.view.send_modify(|view| {
            view.phase = phase;
            apply(view);
        });
        tracing::debug!("Spin phase -> {:?}", phase);
        self.update_pace(phase.pace());
    }

    fn update_attempt<F>(&self, apply: F)
    where
        F: FnOnce(&mut SpinAttempt),
    {
        self.view.send_modify(|view| {
            if let Some(attempt) = view.attempt.as_mut() {
                apply(attempt);
            }
        });
    }

    fn update_pace(&self, pace: Pace) {
        let pace = if self.shutdown.is_cancelled() {
            Pace::Idle
        } else {
            pace
        };
        let mut current = self.pace.lock();
        if *current != pace {
            *current = pace;
            self.services.renderer.set_pace(pace);
        }
    }
}
