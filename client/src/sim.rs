//! In-memory wallet and balance source.
//!
//! Backs the `spin` demo binary and the tests. Transfers move balances between addresses
//! immediately and confirm after a configurable number of confirmation polls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::shared_spin_game::{TokenConfig, TokenKind};

use crate::chain::{BalanceSource, TransactionId, TransferCall, WalletError, WalletProvider};

#[derive(Default)]
struct SimState {
    owner: Option<String>,
    native_asset: Option<String>,
    balances: HashMap<(String, String), u128>,
    queued_ids: VecDeque<String>,
    issued: u64,
    submitted: Vec<TransferCall>,
    pending: HashMap<TransactionId, u32>,
    confirmed: HashSet<TransactionId>,
    confirm_after_polls: u32,
    never_confirm: bool,
    reject_transfers: Option<WalletError>,
    fail_balance_queries: Option<WalletError>,
    balance_queries: u32,
    latency: Duration,
}

pub struct SimulatedChain {
    state: Mutex<SimState>,
}

fn asset_key(token: &TokenConfig) -> String {
    match &token.kind {
        TokenKind::Native => format!("native:{}", token.symbol),
        TokenKind::Fungible { contract } => format!("token:{}", contract.to_lowercase()),
    }
}

fn balance_key(address: &str, asset: String) -> (String, String) {
    (address.to_lowercase(), asset)
}

impl SimulatedChain {
    pub fn new(owner: &str) -> Self {
        Self {
            state: Mutex::new(SimState {
                owner: Some(owner.to_string()),
                ..SimState::default()
            }),
        }
    }

    pub fn set_balance(&self, address: &str, token: &TokenConfig, amount: u128) {
        let mut state = self.state.lock();
        if token.kind == TokenKind::Native {
            state.native_asset = Some(asset_key(token));
        }
        state
            .balances
            .insert(balance_key(address, asset_key(token)), amount);
    }

    pub fn balance(&self, address: &str, token: &TokenConfig) -> u128 {
        self.state
            .lock()
            .balances
            .get(&balance_key(address, asset_key(token)))
            .copied()
            .unwrap_or(0)
    }

    /// The next transfer is issued this id instead of a generated one.
    pub fn queue_transaction_id(&self, id: &str) {
        self.state.lock().queued_ids.push_back(id.to_string());
    }

    pub fn confirm_after_polls(&self, polls: u32) {
        self.state.lock().confirm_after_polls = polls;
    }

    pub fn never_confirm(&self) {
        self.state.lock().never_confirm = true;
    }

    pub fn reject_transfers(&self, error: WalletError) {
        self.state.lock().reject_transfers = Some(error);
    }

    pub fn fail_balance_queries(&self, error: WalletError) {
        self.state.lock().fail_balance_queries = Some(error);
    }

    pub fn disconnect(&self) {
        self.state.lock().owner = None;
    }

    /// Delay applied to every call, to keep an attempt in flight for a while.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    pub fn submitted_transfers(&self) -> Vec<TransferCall> {
        self.state.lock().submitted.clone()
    }

    pub fn balance_queries(&self) -> u32 {
        self.state.lock().balance_queries
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl WalletProvider for SimulatedChain {
    async fn current_address(&self) -> Result<String, WalletError> {
        self.state.lock().owner.clone().ok_or(WalletError::NotConnected)
    }

    async fn sign_and_send_transfer(&self, call: &TransferCall) -> Result<TransactionId, WalletError> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if let Some(error) = state.reject_transfers.clone() {
            return Err(error);
        }
        let owner = state.owner.clone().ok_or(WalletError::NotConnected)?;

        let asset = match call {
            TransferCall::Native { .. } => state
                .native_asset
                .clone()
                .unwrap_or_else(|| "native:".to_string()),
            TransferCall::Fungible { contract, .. } => format!("token:{}", contract.to_lowercase()),
        };

        let from = balance_key(&owner, asset.clone());
        let available = state.balances.get(&from).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(call.amount())
            .ok_or_else(|| WalletError::Network("insufficient funds for transfer".to_string()))?;
        state.balances.insert(from, remaining);
        *state
            .balances
            .entry(balance_key(call.destination(), asset))
            .or_insert(0) += call.amount();

        let id = match state.queued_ids.pop_front() {
            Some(id) => id,
            None => {
                state.issued += 1;
                format!("0x{:064x}", state.issued)
            }
        };
        let transaction = TransactionId(id);
        let polls = state.confirm_after_polls;
        state.pending.insert(transaction.clone(), polls);
        state.submitted.push(call.clone());

        Ok(transaction)
    }

    async fn is_confirmed(&self, transaction: &TransactionId) -> Result<bool, WalletError> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.never_confirm {
            return Ok(false);
        }
        if state.confirmed.contains(transaction) {
            return Ok(true);
        }
        let Some(remaining) = state.pending.get_mut(transaction) else {
            return Err(WalletError::Network(format!("unknown transaction {}", transaction)));
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(false);
        }
        state.pending.remove(transaction);
        state.confirmed.insert(transaction.clone());
        Ok(true)
    }
}

#[async_trait]
impl BalanceSource for SimulatedChain {
    async fn get_balance(&self, address: &str, token: &TokenConfig) -> Result<u128, WalletError> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        state.balance_queries += 1;
        if let Some(error) = state.fail_balance_queries.clone() {
            return Err(error);
        }
        Ok(state
            .balances
            .get(&balance_key(address, asset_key(token)))
            .copied()
            .unwrap_or(0))
    }
}
