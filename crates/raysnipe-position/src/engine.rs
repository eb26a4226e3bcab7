//! Risk-triggered exit decision engine.
//!
//! Turns a synchronized PnL snapshot into at most one exit swap request.
//! The in-flight guard is distinct from the admission lock: it covers the
//! window between requesting an exit swap and learning its outcome, so a
//! second vault update cannot fire a duplicate sell while one is pending.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use raysnipe_core::{PnlSnapshot, TxSignature};

use crate::admission::AdmissionLock;
use crate::error::ExitSwapError;
use crate::position::Position;

/// Exit thresholds, percent of cost basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitPolicy {
    /// Unrealized gain at or above this percentage takes profit.
    #[serde(default = "default_take_profit_percent")]
    pub take_profit_percent: Decimal,
    /// Unrealized loss at or beyond this percentage stops out.
    #[serde(default = "default_stop_loss_percent")]
    pub stop_loss_percent: Decimal,
}

fn default_take_profit_percent() -> Decimal {
    Decimal::from(30)
}

fn default_stop_loss_percent() -> Decimal {
    Decimal::from(12)
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            take_profit_percent: default_take_profit_percent(),
            stop_loss_percent: default_stop_loss_percent(),
        }
    }
}

/// Engine lifecycle state.
///
/// `Monitoring -> ExitRequested -> terminated` on a threshold crossing;
/// a liquidity abort goes straight from `Monitoring` to
/// `MonitoringTerminated` without requesting a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Monitoring,
    ExitRequested,
    MonitoringTerminated,
}

/// Which threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    TakeProfit,
    StopLoss,
}

impl std::fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitTrigger::TakeProfit => write!(f, "take profit"),
            ExitTrigger::StopLoss => write!(f, "stop loss"),
        }
    }
}

/// Confirmation of a completed exit swap.
#[derive(Debug, Clone)]
pub struct ExitReceipt {
    pub signature: TxSignature,
}

/// The opaque "sell the whole position" collaborator.
///
/// Implementations build, sign, send and confirm the exit swap; the engine
/// only cares whether an outcome is known.
pub trait ExitSwap: Send + Sync + 'static {
    fn execute_exit(
        &self,
        position: &Position,
        trigger: ExitTrigger,
    ) -> impl Future<Output = Result<ExitReceipt, ExitSwapError>> + Send;
}

/// Exit decision state machine for one position.
///
/// `evaluate` is called by the monitor on every synchronized PnL snapshot.
/// The first threshold crossing spawns the exit swap task; whatever its
/// outcome, the task clears the in-flight guard and closes the admission
/// lock, which is what terminates the monitor.
pub struct ExitEngine<S: ExitSwap> {
    policy: ExitPolicy,
    lock: AdmissionLock,
    swapper: Arc<S>,
    position: Arc<Position>,
    in_flight: Arc<AtomicBool>,
    state: EngineState,
}

impl<S: ExitSwap> ExitEngine<S> {
    pub fn new(
        policy: ExitPolicy,
        lock: AdmissionLock,
        swapper: Arc<S>,
        position: Arc<Position>,
    ) -> Self {
        Self {
            policy,
            lock,
            swapper,
            position,
            in_flight: Arc::new(AtomicBool::new(false)),
            state: EngineState::Monitoring,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// True from the moment an exit swap is requested until its result is
    /// known.
    pub fn exit_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Apply the threshold rules to a synchronized PnL snapshot.
    ///
    /// Returns the trigger when this snapshot requested an exit. Snapshots
    /// arriving while an exit is already in flight are logged and discarded.
    pub fn evaluate(&mut self, snapshot: &PnlSnapshot) -> Option<ExitTrigger> {
        if self.state != EngineState::Monitoring {
            return None;
        }

        if self.exit_in_flight() {
            debug!(
                token = %self.position.token_mint,
                pnl_percent = %snapshot.pnl_percent,
                "Exit already in flight, discarding snapshot"
            );
            return None;
        }

        let trigger = if snapshot.pnl_percent >= self.policy.take_profit_percent {
            ExitTrigger::TakeProfit
        } else if snapshot.pnl_percent <= -self.policy.stop_loss_percent {
            ExitTrigger::StopLoss
        } else {
            return None;
        };

        info!(
            token = %self.position.token_mint,
            trigger = %trigger,
            pnl_percent = %snapshot.pnl_percent,
            pnl_usd = %snapshot.pnl_usd,
            "Exit threshold crossed, requesting exit swap"
        );

        self.in_flight.store(true, Ordering::Release);
        self.state = EngineState::ExitRequested;
        self.spawn_exit_task(trigger);

        Some(trigger)
    }

    /// Mark the engine terminated; further snapshots are ignored.
    pub fn terminate(&mut self) {
        self.state = EngineState::MonitoringTerminated;
    }

    fn spawn_exit_task(&self, trigger: ExitTrigger) {
        let swapper = Arc::clone(&self.swapper);
        let position = Arc::clone(&self.position);
        let in_flight = Arc::clone(&self.in_flight);
        let lock = self.lock.clone();

        tokio::spawn(async move {
            match swapper.execute_exit(&position, trigger).await {
                Ok(receipt) => {
                    info!(
                        token = %position.token_mint,
                        trigger = %trigger,
                        signature = %receipt.signature,
                        "Exit swap confirmed"
                    );
                }
                Err(e) => {
                    // No automatic retry: the tokens stay in the wallet and
                    // must be reconciled out-of-band.
                    error!(
                        token = %position.token_mint,
                        trigger = %trigger,
                        raw_balance = position.token_balance_raw,
                        error = %e,
                        "Exit swap failed, position abandoned"
                    );
                }
            }

            // Outcome known: drop the duplicate guard, then close the lock.
            // Closing the lock is what wakes and terminates the monitor.
            in_flight.store(false, Ordering::Release);
            lock.set_open(false);
        });
    }
}

impl<S: ExitSwap> std::fmt::Debug for ExitEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitEngine")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("in_flight", &self.exit_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use raysnipe_core::{Address, Price, TokenAmount};
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_position() -> Arc<Position> {
        Arc::new(Position {
            token_mint: Address::new("Ba4HgVv5mr3Cz1PJr4s9PmemcPSqB6GPfcdev5xppump"),
            sol_mint: Address::new("So11111111111111111111111111111111111111112"),
            token_vault: Address::new("FvHwEZGVUW2VfYwTJ26boywb8ES216DC4sJgJbfJZqLM"),
            sol_vault: Address::new("H6hgxFc8uYxtRcSiPsuLcnW1eFANkGGCNN9Xe3iWxiyG"),
            entry_price_usd: Price::new(dec!(1.5)),
            token_balance: TokenAmount::new(dec!(100)),
            token_balance_raw: 100_000_000,
            sol_paid: dec!(1.0),
            sol_paid_usd: dec!(150),
            entry_timestamp: Utc::now(),
        })
    }

    fn snapshot(pnl_percent: Decimal) -> PnlSnapshot {
        PnlSnapshot {
            price_usd: Price::new(dec!(2)),
            current_value: dec!(200),
            pnl_usd: pnl_percent / dec!(100) * dec!(150),
            pnl_percent,
        }
    }

    struct CountingSwap {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSwap {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ExitSwap for CountingSwap {
        async fn execute_exit(
            &self,
            _position: &Position,
            _trigger: ExitTrigger,
        ) -> Result<ExitReceipt, ExitSwapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExitSwapError::Failed("rpc unreachable".into()))
            } else {
                Ok(ExitReceipt {
                    signature: TxSignature::new("5h6xBEauJ3PK6SWCZ1PGjBvj8vDd"),
                })
            }
        }
    }

    fn engine(policy: ExitPolicy, swap: Arc<CountingSwap>) -> (ExitEngine<CountingSwap>, AdmissionLock) {
        let lock = AdmissionLock::new();
        lock.set_open(true);
        let engine = ExitEngine::new(policy, lock.clone(), swap, test_position());
        (engine, lock)
    }

    #[tokio::test]
    async fn test_flat_pnl_stays_monitoring() {
        let swap = CountingSwap::new(false);
        let (mut engine, lock) = engine(ExitPolicy::default(), Arc::clone(&swap));

        assert_eq!(engine.evaluate(&snapshot(dec!(5))), None);
        assert_eq!(engine.evaluate(&snapshot(dec!(-5))), None);

        assert_eq!(engine.state(), EngineState::Monitoring);
        assert!(!engine.exit_in_flight());
        assert!(lock.is_open());
        assert_eq!(swap.calls(), 0);
    }

    #[tokio::test]
    async fn test_take_profit_requests_exit_and_closes_lock() {
        let swap = CountingSwap::new(false);
        let (mut engine, lock) = engine(ExitPolicy::default(), Arc::clone(&swap));

        let trigger = engine.evaluate(&snapshot(dec!(30)));
        assert_eq!(trigger, Some(ExitTrigger::TakeProfit));
        assert_eq!(engine.state(), EngineState::ExitRequested);

        tokio::time::timeout(Duration::from_millis(200), lock.wait_closed())
            .await
            .expect("exit task must close the lock");

        assert_eq!(swap.calls(), 1);
        assert!(!engine.exit_in_flight());
    }

    #[tokio::test]
    async fn test_stop_loss_at_exact_threshold_triggers() {
        let swap = CountingSwap::new(false);
        let (mut engine, lock) = engine(ExitPolicy::default(), Arc::clone(&swap));

        let trigger = engine.evaluate(&snapshot(dec!(-12)));
        assert_eq!(trigger, Some(ExitTrigger::StopLoss));

        tokio::time::timeout(Duration::from_millis(200), lock.wait_closed())
            .await
            .expect("exit task must close the lock");
        assert_eq!(swap.calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_snapshot_while_in_flight_is_discarded() {
        let swap = CountingSwap::new(false);
        let (mut engine, _lock) = engine(ExitPolicy::default(), Arc::clone(&swap));

        assert!(engine.evaluate(&snapshot(dec!(40))).is_some());
        // Engine state already left Monitoring; a second crossing snapshot
        // must not request another swap.
        assert_eq!(engine.evaluate(&snapshot(dec!(50))), None);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(swap.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_exit_still_releases_lock() {
        let swap = CountingSwap::new(true);
        let (mut engine, lock) = engine(ExitPolicy::default(), Arc::clone(&swap));

        assert_eq!(engine.evaluate(&snapshot(dec!(30))), Some(ExitTrigger::TakeProfit));

        tokio::time::timeout(Duration::from_millis(200), lock.wait_closed())
            .await
            .expect("failed exit must still close the lock");

        assert_eq!(swap.calls(), 1);
        assert!(!engine.exit_in_flight());
    }

    #[tokio::test]
    async fn test_terminated_engine_ignores_snapshots() {
        let swap = CountingSwap::new(false);
        let (mut engine, _lock) = engine(ExitPolicy::default(), Arc::clone(&swap));

        engine.terminate();
        assert_eq!(engine.evaluate(&snapshot(dec!(100))), None);
        assert_eq!(swap.calls(), 0);
    }

    #[test]
    fn test_policy_defaults() {
        let policy: ExitPolicy = toml::from_str("").unwrap();
        assert_eq!(policy.take_profit_percent, dec!(30));
        assert_eq!(policy.stop_loss_percent, dec!(12));
    }
}
