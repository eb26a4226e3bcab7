//! Application wiring and the detection feed loop.
//!
//! Owns the long-lived pieces (HTTP client, swap engine, risk gate,
//! admission lock) and runs the pool-creation watch: subscribe to the AMM
//! program's log stream, filter for pool initializations, hand each signal
//! to the lifecycle controller. A dead feed connection is re-established
//! after a fixed delay; ctrl-c shuts the whole process down.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use raysnipe_detector::pool_creation_signature;
use raysnipe_executor::{SwapEngine, TradingWallet};
use raysnipe_position::AdmissionLock;
use raysnipe_risk::RugCheckGate;
use raysnipe_rpc::{PubsubClient, RpcClient};

use crate::config::AppConfig;
use crate::controller::LifecycleController;
use crate::error::AppResult;

const FEED_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// The assembled application.
pub struct Application {
    config: AppConfig,
    controller: LifecycleController,
}

impl Application {
    pub fn new(config: AppConfig, wallet_key: &str) -> AppResult<Self> {
        let rpc = RpcClient::new(
            &config.rpc.http_url,
            Duration::from_millis(config.rpc.request_timeout_ms),
        )?;
        let wallet = TradingWallet::from_base58_key(wallet_key)?;
        info!(wallet = %wallet.address(), "Trading wallet loaded");

        let engine = Arc::new(SwapEngine::new(config.executor.clone(), rpc.clone(), wallet)?);
        let gate = RugCheckGate::new(config.rug_check.clone())?;
        let lock = AdmissionLock::new();

        let controller =
            LifecycleController::new(config.clone(), lock, rpc, gate, engine);

        Ok(Self { config, controller })
    }

    /// Run until ctrl-c.
    pub async fn run(&self) -> AppResult<()> {
        info!(
            ws_url = %self.config.rpc.ws_url,
            amm_program = %self.config.detector.amm_program_id,
            "Starting pool-creation watch"
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    return Ok(());
                }

                result = self.watch_feed() => {
                    match result {
                        Ok(()) => warn!("Detection feed ended"),
                        Err(e) => warn!(error = %e, "Detection feed failed"),
                    }
                    info!(
                        delay_secs = FEED_RECONNECT_DELAY.as_secs(),
                        "Reconnecting detection feed"
                    );
                    sleep(FEED_RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// One feed connection's lifetime: subscribe, filter, dispatch.
    async fn watch_feed(&self) -> AppResult<()> {
        let pubsub = PubsubClient::connect(&self.config.rpc.ws_url).await?;
        let mut subscription = pubsub
            .logs_subscribe(
                &self.config.detector.amm_program_id,
                &self.config.rpc.logs_commitment,
            )
            .await?;

        info!("Listening for pool-creation transactions");

        while let Some(notice) = subscription.recv().await {
            let Some(signature) = pool_creation_signature(&notice) else {
                continue;
            };

            if self.controller.is_busy() {
                debug!(signature = %signature, "Position open, dropping pool-creation signal");
                continue;
            }

            // The feed pauses while a lifecycle runs; signals arriving in
            // the meantime overflow the notification buffer and are
            // dropped, which is the single-position backpressure policy.
            if let Err(e) = self.controller.run_once(signature).await {
                error!(error = %e, "Position lifecycle failed");
            }
            info!("Resuming pool-creation watch");
        }

        pubsub.shutdown();
        Ok(())
    }
}
