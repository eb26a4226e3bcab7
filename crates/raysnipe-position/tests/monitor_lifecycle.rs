//! Vault monitor lifecycle integration tests.
//!
//! Drives a full monitor run against a hand-rolled mock chain reader and
//! exit swapper:
//! - slot synchronization (one computation per synchronized slot)
//! - stale slots never recomputed
//! - liquidity floor abort, with no swap attempted
//! - idempotent exit while a swap is in flight
//! - lock released on every termination path

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use raysnipe_core::{Address, Price, Slot, TokenAmount, TxSignature};
use raysnipe_position::{
    AdmissionLock, BalanceSnapshot, ChainError, ChainReader, ExitPolicy, ExitReceipt, ExitSwap,
    ExitSwapError, ExitTrigger, MonitorConfig, MonitorOutcome, Position, VaultMonitor,
    VaultNotice, VaultSubscription,
};

const TOKEN_VAULT: &str = "FvHwEZGVUW2VfYwTJ26boywb8ES216DC4sJgJbfJZqLM";
const SOL_VAULT: &str = "H6hgxFc8uYxtRcSiPsuLcnW1eFANkGGCNN9Xe3iWxiyG";

// Reserves priced exactly at the entry price (flat PnL): 1000 token-units
// against 10 SOL is 0.01 SOL per token, $1.50 at the entry's $150/SOL rate.
const FLAT_TOKEN_RESERVE: u128 = 1_000_000_000;
const FLAT_SOL_RESERVE: u128 = 10_000_000_000;

// The concrete profit vector: 1.0 token-unit against 2.0 SOL values the
// 100-token position at $30,000 on a $150 basis (+19,900%).
const PROFIT_TOKEN_RESERVE: u128 = 1_000_000;
const PROFIT_SOL_RESERVE: u128 = 2_000_000_000;

fn test_position() -> Arc<Position> {
    Arc::new(Position {
        token_mint: Address::new("Ba4HgVv5mr3Cz1PJr4s9PmemcPSqB6GPfcdev5xppump"),
        sol_mint: Address::new("So11111111111111111111111111111111111111112"),
        token_vault: Address::new(TOKEN_VAULT),
        sol_vault: Address::new(SOL_VAULT),
        entry_price_usd: Price::new(dec!(1.5)),
        token_balance: TokenAmount::new(dec!(100)),
        token_balance_raw: 100_000_000,
        sol_paid: dec!(1.0),
        sol_paid_usd: dec!(150),
        entry_timestamp: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Mock chain reader
// ---------------------------------------------------------------------------

struct MockChainInner {
    /// account -> (reserve, decimals); a missing entry fails the read.
    reserves: Mutex<HashMap<String, (u128, u32)>>,
    /// account -> live notification sender.
    senders: Mutex<HashMap<String, mpsc::Sender<VaultNotice>>>,
    subscribed: Mutex<Vec<String>>,
    unsubscribed: Mutex<Vec<u64>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
struct MockChain {
    inner: Arc<MockChainInner>,
}

impl MockChain {
    fn new() -> Self {
        Self {
            inner: Arc::new(MockChainInner {
                reserves: Mutex::new(HashMap::new()),
                senders: Mutex::new(HashMap::new()),
                subscribed: Mutex::new(Vec::new()),
                unsubscribed: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn set_reserve(&self, account: &str, reserve: u128, decimals: u32) {
        self.inner
            .reserves
            .lock()
            .insert(account.to_string(), (reserve, decimals));
    }

    fn fail_reads(&self, account: &str) {
        self.inner.reserves.lock().remove(account);
    }

    async fn notify(&self, account: &str, slot: Slot) {
        let sender = self
            .inner
            .senders
            .lock()
            .get(account)
            .cloned()
            .expect("account not subscribed");
        sender
            .send(VaultNotice { slot })
            .await
            .expect("monitor stopped receiving");
    }

    /// Drop all notification senders so consumers observe end-of-stream.
    fn kill_streams(&self) {
        self.inner.senders.lock().clear();
    }

    fn subscription_count(&self) -> usize {
        self.inner.subscribed.lock().len()
    }

    fn unsubscribed(&self) -> Vec<u64> {
        self.inner.unsubscribed.lock().clone()
    }

    async fn wait_for_subscriptions(&self, count: usize) {
        timeout(Duration::from_secs(2), async {
            while self.subscription_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("monitor never subscribed");
    }
}

impl ChainReader for MockChain {
    async fn read_balance(&self, account: &Address) -> Result<BalanceSnapshot, ChainError> {
        let entry = self.inner.reserves.lock().get(account.as_str()).copied();
        match entry {
            Some((reserve, decimals)) => Ok(BalanceSnapshot {
                reserve,
                decimals,
                slot: 0,
            }),
            None => Err(ChainError::Read(format!("no balance for {account}"))),
        }
    }

    async fn subscribe(&self, account: &Address) -> Result<VaultSubscription, ChainError> {
        let (tx, rx) = mpsc::channel(16);
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .senders
            .lock()
            .insert(account.as_str().to_string(), tx);
        self.inner.subscribed.lock().push(account.as_str().to_string());
        Ok(VaultSubscription { id, rx })
    }

    async fn unsubscribe(&self, id: u64) -> Result<(), ChainError> {
        self.inner.unsubscribed.lock().push(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock exit swapper
// ---------------------------------------------------------------------------

struct MockSwap {
    calls: AtomicUsize,
    /// When present, `execute_exit` blocks until the test adds a permit.
    gate: Option<Semaphore>,
    fail: bool,
}

impl MockSwap {
    fn immediate() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail: false,
        })
    }

    fn gated() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Some(Semaphore::new(0)),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.gate
            .as_ref()
            .expect("swap is not gated")
            .add_permits(1);
    }
}

impl ExitSwap for MockSwap {
    async fn execute_exit(
        &self,
        _position: &Position,
        _trigger: ExitTrigger,
    ) -> Result<ExitReceipt, ExitSwapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| ExitSwapError::Failed("gate closed".into()))?;
        }

        if self.fail {
            Err(ExitSwapError::Failed("send failed".into()))
        } else {
            Ok(ExitReceipt {
                signature: TxSignature::new(
                    "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXFSDwt8GFXM7W5Ncn16wmqokgpiKRLuS83KUxyZyv2sUYv",
                ),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn spawn_monitor(
    chain: &MockChain,
    swap: Arc<MockSwap>,
    lock: &AdmissionLock,
) -> JoinHandle<Result<MonitorOutcome, ChainError>> {
    let monitor = VaultMonitor::new(
        MonitorConfig::default(),
        ExitPolicy::default(),
        Arc::new(chain.clone()),
        swap,
        lock.clone(),
        test_position(),
    );
    tokio::spawn(monitor.run())
}

fn flat_chain() -> MockChain {
    let chain = MockChain::new();
    chain.set_reserve(TOKEN_VAULT, FLAT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, FLAT_SOL_RESERVE, 9);
    chain
}

async fn finish(
    handle: JoinHandle<Result<MonitorOutcome, ChainError>>,
) -> Result<MonitorOutcome, ChainError> {
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor did not terminate")
        .expect("monitor task panicked")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// The seeded slot-0 snapshot is observational only, and a PnL computation
/// happens exactly when both vaults agree on a new slot. Reserves cross the
/// take-profit threshold from the start, so a premature computation would
/// show up as an extra swap call.
#[tokio::test]
async fn test_take_profit_after_slot_synchronization() {
    let chain = MockChain::new();
    chain.set_reserve(TOKEN_VAULT, PROFIT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, PROFIT_SOL_RESERVE, 9);

    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    // Seed alone must not have triggered anything.
    assert_eq!(swap.calls(), 0);

    chain.notify(TOKEN_VAULT, 5).await;
    chain.notify(SOL_VAULT, 4).await;
    // Still unsynchronized: token at 5, sol at 4.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(swap.calls(), 0);

    chain.notify(SOL_VAULT, 5).await;

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Completed);
    assert_eq!(swap.calls(), 1);
    assert!(!lock.is_open());
    assert_eq!(chain.unsubscribed().len(), 2);
}

/// After slot 5 is processed, late notifications at an older slot never
/// reach the decision path, even when both vaults agree on it and the
/// reserves would cross the threshold.
#[tokio::test]
async fn test_stale_slot_is_never_recomputed() {
    let chain = flat_chain();
    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    // Synchronize once at slot 5 with flat reserves: computed, no trigger.
    chain.notify(TOKEN_VAULT, 5).await;
    chain.notify(SOL_VAULT, 5).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(swap.calls(), 0);

    // Reserves now cross take-profit, but the agreeing slot is stale.
    chain.set_reserve(TOKEN_VAULT, PROFIT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, PROFIT_SOL_RESERVE, 9);
    chain.notify(TOKEN_VAULT, 3).await;
    chain.notify(SOL_VAULT, 3).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(swap.calls(), 0);

    lock.set_open(false);
    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Cancelled);
    assert!(!lock.is_open());
}

/// A SOL reserve under the floor terminates the monitor with no exit swap.
#[tokio::test]
async fn test_liquidity_floor_aborts_without_swap() {
    let chain = flat_chain();
    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    // Liquidity pulled: 0.05 SOL left against a 0.1 SOL floor.
    chain.set_reserve(SOL_VAULT, 50_000_000, 9);
    chain.notify(SOL_VAULT, 7).await;

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::LiquidityAborted);
    assert_eq!(swap.calls(), 0);
    assert!(!lock.is_open());
    assert_eq!(chain.unsubscribed().len(), 2);
}

/// A pool that is already drained at seed time aborts before subscribing.
#[tokio::test]
async fn test_initial_liquidity_below_floor_skips_subscription() {
    let chain = MockChain::new();
    chain.set_reserve(TOKEN_VAULT, FLAT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, 50_000_000, 9);

    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::LiquidityAborted);
    assert_eq!(chain.subscription_count(), 0);
    assert_eq!(swap.calls(), 0);
    assert!(!lock.is_open());
}

/// Two synchronized threshold crossings while an exit swap is pending
/// produce exactly one swap request.
#[tokio::test]
async fn test_duplicate_crossing_fires_single_exit() {
    let chain = flat_chain();
    let swap = MockSwap::gated();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    chain.set_reserve(TOKEN_VAULT, PROFIT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, PROFIT_SOL_RESERVE, 9);

    // First crossing: swap requested, held pending by the gate.
    chain.notify(TOKEN_VAULT, 5).await;
    chain.notify(SOL_VAULT, 5).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(swap.calls(), 1);

    // Second synchronized crossing while the exit is in flight.
    chain.notify(TOKEN_VAULT, 6).await;
    chain.notify(SOL_VAULT, 6).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(swap.calls(), 1);

    swap.release();
    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Completed);
    assert_eq!(swap.calls(), 1);
    assert!(!lock.is_open());
}

/// A failed exit swap still ends the position and releases the lock.
#[tokio::test]
async fn test_failed_exit_releases_lock() {
    let chain = MockChain::new();
    chain.set_reserve(TOKEN_VAULT, PROFIT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, PROFIT_SOL_RESERVE, 9);

    let swap = MockSwap::failing();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    chain.notify(TOKEN_VAULT, 5).await;
    chain.notify(SOL_VAULT, 5).await;

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Completed);
    assert_eq!(swap.calls(), 1);
    assert!(!lock.is_open());
}

/// Closing the admission lock externally cancels the monitor and
/// unregisters both subscriptions.
#[tokio::test]
async fn test_external_cancellation_releases_cleanly() {
    let chain = flat_chain();
    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    lock.set_open(false);

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Cancelled);
    assert_eq!(swap.calls(), 0);
    assert!(!lock.is_open());
    assert_eq!(chain.unsubscribed().len(), 2);
}

/// A dead notification transport terminates the monitor with the lock
/// closed rather than leaving it stranded open.
#[tokio::test]
async fn test_transport_death_cancels_monitor() {
    let chain = flat_chain();
    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    chain.kill_streams();

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Cancelled);
    assert!(!lock.is_open());
}

/// Balance re-read failures are transient: the notification is skipped and
/// later notifications still drive the monitor to an exit.
#[tokio::test]
async fn test_read_failure_is_transient() {
    let chain = flat_chain();
    let swap = MockSwap::immediate();
    let lock = AdmissionLock::new();
    lock.set_open(true);

    let handle = spawn_monitor(&chain, Arc::clone(&swap), &lock);
    chain.wait_for_subscriptions(2).await;

    // This notification's re-read fails and is skipped.
    chain.fail_reads(TOKEN_VAULT);
    chain.notify(TOKEN_VAULT, 5).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(swap.calls(), 0);

    // Reads recover with crossing reserves; the next pair synchronizes.
    chain.set_reserve(TOKEN_VAULT, PROFIT_TOKEN_RESERVE, 6);
    chain.set_reserve(SOL_VAULT, PROFIT_SOL_RESERVE, 9);
    chain.notify(TOKEN_VAULT, 6).await;
    chain.notify(SOL_VAULT, 6).await;

    let outcome = finish(handle).await.unwrap();
    assert_eq!(outcome, MonitorOutcome::Completed);
    assert_eq!(swap.calls(), 1);
    assert!(!lock.is_open());
}
