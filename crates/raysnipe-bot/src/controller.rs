//! Position lifecycle controller.
//!
//! The sequential pipeline from a pool-creation signal to a closed
//! position: fetch the pool's keys, run the risk gate, buy, fix the cost
//! basis, open the admission lock, run the vault monitor to termination.
//! A failure at any step before the lock opens simply returns the
//! controller to the ready state; once the lock is open, the monitor's
//! release guard owns closing it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use raysnipe_core::{Address, TxSignature};
use raysnipe_detector::fetch_pool_keys;
use raysnipe_executor::SwapEngine;
use raysnipe_position::{AdmissionLock, MonitorOutcome, Position, VaultMonitor};
use raysnipe_risk::RugCheckGate;
use raysnipe_rpc::{PubsubClient, RpcClient};

use crate::chain::RpcChainReader;
use crate::config::AppConfig;
use crate::error::AppResult;

/// Single-flight position lifecycle, gated by the admission lock.
pub struct LifecycleController {
    config: AppConfig,
    lock: AdmissionLock,
    rpc: RpcClient,
    gate: RugCheckGate,
    engine: Arc<SwapEngine>,
}

impl LifecycleController {
    pub fn new(
        config: AppConfig,
        lock: AdmissionLock,
        rpc: RpcClient,
        gate: RugCheckGate,
        engine: Arc<SwapEngine>,
    ) -> Self {
        Self {
            config,
            lock,
            rpc,
            gate,
            engine,
        }
    }

    /// The caller's throttling view of the admission lock.
    pub fn is_busy(&self) -> bool {
        self.lock.is_open()
    }

    /// Run one full lifecycle for a pool-creation signal.
    ///
    /// Signals arriving while a position is open are dropped, not queued.
    pub async fn run_once(&self, signature: TxSignature) -> AppResult<()> {
        if self.lock.is_open() {
            debug!(signature = %signature, "Position already open, dropping pool signal");
            return Ok(());
        }

        info!(signature = %signature, "New liquidity pool found, fetching details");

        let keys = fetch_pool_keys(&self.rpc, &signature, &self.config.detector).await?;

        if self.config.rug_check.ignore_pump_fun && is_pump_fun_mint(&keys.token_mint) {
            info!(token = %keys.token_mint, "Skipping pump.fun token");
            return Ok(());
        }

        let verdict = self.gate.check(&keys.token_mint).await?;
        if !verdict.passed {
            info!(
                token = %keys.token_mint,
                failures = verdict.failures.len(),
                "Rug check rejected token"
            );
            return Ok(());
        }

        sleep(Duration::from_millis(self.config.controller.entry_delay_ms)).await;

        let entry_signature = self.engine.buy(&keys.sol_mint, &keys.token_mint).await?;
        let details = self
            .engine
            .entry_details(&entry_signature, &keys.token_mint, &keys.sol_mint)
            .await?;

        let position = Arc::new(Position {
            token_mint: keys.token_mint,
            sol_mint: keys.sol_mint,
            token_vault: keys.token_vault,
            sol_vault: keys.sol_vault,
            entry_price_usd: details.purchase_price_usd,
            token_balance: details.tokens_received,
            token_balance_raw: details.tokens_received_raw,
            sol_paid: details.sol_spent,
            sol_paid_usd: details.sol_paid_usd,
            entry_timestamp: details
                .block_time
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
        });

        // Entry confirmed and priced: the position exists and the gate
        // closes behind it.
        self.lock.set_open(true);
        info!(
            token = %position.token_mint,
            entry_price_usd = %position.entry_price_usd,
            balance = %position.token_balance,
            "Position opened"
        );

        sleep(Duration::from_millis(
            self.config.controller.monitor_start_delay_ms,
        ))
        .await;

        let outcome = self.run_monitor(Arc::clone(&position)).await;

        // The release guard closes the lock on every monitor exit; this is
        // the controller's own check of that invariant.
        if self.lock.is_open() {
            warn!("Admission lock still open after monitor exit, forcing closed");
            self.lock.set_open(false);
        }

        match outcome? {
            MonitorOutcome::Completed => {
                info!(token = %position.token_mint, "Position closed")
            }
            MonitorOutcome::LiquidityAborted => {
                warn!(token = %position.token_mint, "Position abandoned on liquidity abort")
            }
            MonitorOutcome::Cancelled => {
                info!(token = %position.token_mint, "Position monitoring cancelled")
            }
        }

        Ok(())
    }

    /// Run the vault monitor on a dedicated pubsub connection, torn down
    /// with the position.
    async fn run_monitor(&self, position: Arc<Position>) -> AppResult<MonitorOutcome> {
        let pubsub = PubsubClient::connect(&self.config.rpc.ws_url).await?;
        let chain = Arc::new(RpcChainReader::new(
            self.rpc.clone(),
            pubsub,
            self.config.rpc.account_commitment.clone(),
        ));

        let monitor = VaultMonitor::new(
            self.config.monitor.clone(),
            self.config.exit.clone(),
            Arc::clone(&chain),
            Arc::clone(&self.engine),
            self.lock.clone(),
            position,
        );
        let result = monitor.run().await;

        chain.shutdown();
        Ok(result?)
    }
}

/// Pump.fun vanity mints end in "pump".
fn is_pump_fun_mint(mint: &Address) -> bool {
    mint.as_str().trim().to_lowercase().ends_with("pump")
}
