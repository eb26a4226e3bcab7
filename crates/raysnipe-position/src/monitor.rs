//! Slot-synchronized dual-vault PnL monitor.
//!
//! One monitor runs per position. It seeds both vault observations with
//! one-shot reads, then follows the two change-notification streams,
//! re-reading the changed vault's balance at each notification. A PnL
//! snapshot reaches the exit engine only when both vaults have reported the
//! same slot and that slot is newer than the last one processed — the sole
//! ordering imposed on two streams the transport does not order.
//!
//! Terminal paths: the admission lock closes (exit completed or external
//! cancellation), the SOL reserve falls below the liquidity floor, or the
//! notification transport dies. Every path unregisters both subscriptions,
//! and the release guard leaves the lock closed no matter how the monitor
//! exits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use raysnipe_core::{unrealized_pnl, PnlInput, PnlSnapshot, Slot};

use crate::admission::{AdmissionLock, ReleaseGuard};
use crate::chain::{ChainReader, VaultSubscription};
use crate::engine::{EngineState, ExitEngine, ExitPolicy, ExitSwap};
use crate::error::ChainError;
use crate::position::{Position, ReservePair, VaultObservation, VaultRole};

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// SOL-side reserve floor in lamports; below it the pool is treated as
    /// rugged and the monitor aborts without attempting an exit swap.
    #[serde(default = "default_min_sol_liquidity_lamports")]
    pub min_sol_liquidity_lamports: u64,
}

fn default_min_sol_liquidity_lamports() -> u64 {
    // 0.1 SOL.
    100_000_000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            min_sol_liquidity_lamports: default_min_sol_liquidity_lamports(),
        }
    }
}

/// How the monitor terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// An exit swap ran to a known outcome and closed the lock.
    Completed,
    /// The SOL reserve fell below the liquidity floor; no swap attempted.
    LiquidityAborted,
    /// The lock was closed externally, or the notification transport died.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct VaultDecimals {
    token: u32,
    sol: u32,
}

/// Dual-vault monitor for one open position.
pub struct VaultMonitor<C: ChainReader, S: ExitSwap> {
    config: MonitorConfig,
    chain: Arc<C>,
    lock: AdmissionLock,
    position: Arc<Position>,
    engine: ExitEngine<S>,
}

impl<C: ChainReader, S: ExitSwap> VaultMonitor<C, S> {
    pub fn new(
        config: MonitorConfig,
        policy: ExitPolicy,
        chain: Arc<C>,
        swapper: Arc<S>,
        lock: AdmissionLock,
        position: Arc<Position>,
    ) -> Self {
        let engine = ExitEngine::new(policy, lock.clone(), swapper, Arc::clone(&position));
        Self {
            config,
            chain,
            lock,
            position,
            engine,
        }
    }

    /// Run the monitor to one of its terminal conditions.
    ///
    /// Seed-read and subscription failures are fatal for the run; the
    /// release guard still leaves the admission lock closed.
    pub async fn run(mut self) -> Result<MonitorOutcome, ChainError> {
        let _guard = ReleaseGuard::new(self.lock.clone());

        info!(
            token = %self.position.token_mint,
            token_vault = %self.position.token_vault,
            sol_vault = %self.position.sol_vault,
            "Starting vault monitor"
        );

        let token_seed = self.chain.read_balance(&self.position.token_vault).await?;
        let sol_seed = self.chain.read_balance(&self.position.sol_vault).await?;
        let decimals = VaultDecimals {
            token: token_seed.decimals,
            sol: sol_seed.decimals,
        };

        let mut reserves = ReservePair::new();
        reserves.record(
            VaultRole::Token,
            VaultObservation {
                reserve: token_seed.reserve,
                slot: 0,
            },
        );
        reserves.record(
            VaultRole::Sol,
            VaultObservation {
                reserve: sol_seed.reserve,
                slot: 0,
            },
        );

        if self.below_floor(sol_seed.reserve) {
            warn!(
                token = %self.position.token_mint,
                sol_reserve = sol_seed.reserve,
                floor = self.config.min_sol_liquidity_lamports,
                "Initial SOL liquidity below floor, aborting before subscribing"
            );
            self.engine.terminate();
            return Ok(MonitorOutcome::LiquidityAborted);
        }

        // Observational baseline. The seeded slot-0 readings never pass the
        // synchronization predicate, so this snapshot cannot trigger an exit.
        self.compute_pnl(&reserves, decimals, 0);

        let mut token_sub = self.chain.subscribe(&self.position.token_vault).await?;
        let mut sol_sub = self.chain.subscribe(&self.position.sol_vault).await?;
        info!(
            token_subscription = token_sub.id,
            sol_subscription = sol_sub.id,
            "Subscribed to vault change notifications"
        );

        let outcome = self
            .event_loop(&mut reserves, decimals, &mut token_sub, &mut sol_sub)
            .await;

        for id in [token_sub.id, sol_sub.id] {
            if let Err(e) = self.chain.unsubscribe(id).await {
                warn!(subscription = id, error = %e, "Unsubscribe failed");
            }
        }
        debug!("Vault subscriptions unregistered");

        self.engine.terminate();
        info!(token = %self.position.token_mint, ?outcome, "Vault monitor terminated");
        Ok(outcome)
    }

    async fn event_loop(
        &mut self,
        reserves: &mut ReservePair,
        decimals: VaultDecimals,
        token_sub: &mut VaultSubscription,
        sol_sub: &mut VaultSubscription,
    ) -> MonitorOutcome {
        loop {
            tokio::select! {
                () = self.lock.wait_closed() => {
                    return if self.engine.state() == EngineState::ExitRequested {
                        debug!("Admission lock closed by exit completion");
                        MonitorOutcome::Completed
                    } else {
                        info!("Admission lock closed externally, monitor cancelled");
                        MonitorOutcome::Cancelled
                    };
                }

                notice = token_sub.rx.recv() => match notice {
                    Some(notice) => {
                        if let Some(outcome) = self
                            .handle_notice(VaultRole::Token, notice.slot, reserves, decimals)
                            .await
                        {
                            return outcome;
                        }
                    }
                    None => {
                        warn!("Token vault notification stream ended");
                        return MonitorOutcome::Cancelled;
                    }
                },

                notice = sol_sub.rx.recv() => match notice {
                    Some(notice) => {
                        if let Some(outcome) = self
                            .handle_notice(VaultRole::Sol, notice.slot, reserves, decimals)
                            .await
                        {
                            return outcome;
                        }
                    }
                    None => {
                        warn!("SOL vault notification stream ended");
                        return MonitorOutcome::Cancelled;
                    }
                },
            }
        }
    }

    /// Process one change notification. Returns a terminal outcome only for
    /// the liquidity abort; every failure in here is transient and the next
    /// notification retries independently.
    async fn handle_notice(
        &mut self,
        role: VaultRole,
        slot: Slot,
        reserves: &mut ReservePair,
        decimals: VaultDecimals,
    ) -> Option<MonitorOutcome> {
        let account = match role {
            VaultRole::Token => &self.position.token_vault,
            VaultRole::Sol => &self.position.sol_vault,
        };

        let balance = match self.chain.read_balance(account).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(vault = %role, slot, error = %e, "Balance re-read failed, skipping notification");
                return None;
            }
        };

        reserves.record(
            role,
            VaultObservation {
                reserve: balance.reserve,
                slot,
            },
        );
        trace!(vault = %role, reserve = balance.reserve, slot, "Vault observation updated");

        // Liquidity disappearance overrides any PnL computation.
        if role == VaultRole::Sol && self.below_floor(balance.reserve) {
            warn!(
                token = %self.position.token_mint,
                sol_reserve = balance.reserve,
                floor = self.config.min_sol_liquidity_lamports,
                "SOL liquidity below floor, possible rug pull, aborting monitor"
            );
            return Some(MonitorOutcome::LiquidityAborted);
        }

        let Some(sync_slot) = reserves.synchronized_slot() else {
            trace!(vault = %role, slot, "Waiting for slot synchronization");
            return None;
        };
        reserves.mark_processed(sync_slot);

        if !self.lock.is_open() || self.engine.exit_in_flight() {
            debug!(
                slot = sync_slot,
                "Synchronized snapshot discarded, lock closed or exit in flight"
            );
            return None;
        }

        if let Some(snapshot) = self.compute_pnl(reserves, decimals, sync_slot) {
            self.engine.evaluate(&snapshot);
        }

        None
    }

    /// Compute and log a PnL snapshot from the current observations.
    fn compute_pnl(
        &self,
        reserves: &ReservePair,
        decimals: VaultDecimals,
        slot: Slot,
    ) -> Option<PnlSnapshot> {
        let token = reserves.observation(VaultRole::Token)?;
        let sol = reserves.observation(VaultRole::Sol)?;

        let input = PnlInput {
            token_reserve: token.reserve,
            sol_reserve: sol.reserve,
            token_decimals: decimals.token,
            sol_decimals: decimals.sol,
            token_balance: self.position.token_balance,
            sol_paid: self.position.sol_paid,
            sol_paid_usd: self.position.sol_paid_usd,
            fallback_price: self.position.entry_price_usd,
        };

        match unrealized_pnl(&input) {
            Ok(snapshot) => {
                if snapshot.price_is_suspect() {
                    warn!(
                        price_usd = %snapshot.price_usd,
                        token_reserve = token.reserve,
                        sol_reserve = sol.reserve,
                        "Suspicious computed price"
                    );
                }
                info!(
                    token = %self.position.token_mint,
                    slot,
                    price_usd = %snapshot.price_usd,
                    pnl_usd = %snapshot.pnl_usd,
                    pnl_percent = %snapshot.pnl_percent,
                    "Unrealized PnL"
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(slot, error = %e, "PnL computation failed, skipping snapshot");
                None
            }
        }
    }

    fn below_floor(&self, sol_reserve: u128) -> bool {
        sol_reserve < u128::from(self.config.min_sol_liquidity_lamports)
    }
}
