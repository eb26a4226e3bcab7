//! Chain-reader adapter over the JSON-RPC clients.
//!
//! Bridges the monitor's [`ChainReader`] seam to the transport crates: one
//! shared HTTP client for balance reads, one per-position pubsub connection
//! for change notifications. Each confirmed subscription gets a forwarding
//! task that strips the notification down to its slot; the monitor re-reads
//! the balance itself.

use tokio::sync::mpsc;
use tracing::debug;

use raysnipe_core::Address;
use raysnipe_position::{
    BalanceSnapshot, ChainError, ChainReader, VaultNotice, VaultSubscription,
};
use raysnipe_rpc::{PubsubClient, RpcClient};

/// Vault accounts change at most once per slot; a small forwarding buffer
/// is plenty.
const FORWARD_BUFFER: usize = 64;

/// [`ChainReader`] over the shared HTTP client and a dedicated pubsub
/// connection. Created per position and torn down with it.
pub struct RpcChainReader {
    rpc: RpcClient,
    pubsub: PubsubClient,
    commitment: String,
}

impl RpcChainReader {
    pub fn new(rpc: RpcClient, pubsub: PubsubClient, commitment: impl Into<String>) -> Self {
        Self {
            rpc,
            pubsub,
            commitment: commitment.into(),
        }
    }

    /// Close the underlying pubsub connection. Idempotent.
    pub fn shutdown(&self) {
        self.pubsub.shutdown();
    }
}

impl ChainReader for RpcChainReader {
    async fn read_balance(&self, account: &Address) -> Result<BalanceSnapshot, ChainError> {
        let balance = self
            .rpc
            .get_token_account_balance(account)
            .await
            .map_err(|e| ChainError::Read(e.to_string()))?;

        Ok(BalanceSnapshot {
            reserve: balance.amount,
            decimals: balance.decimals,
            slot: balance.slot,
        })
    }

    async fn subscribe(&self, account: &Address) -> Result<VaultSubscription, ChainError> {
        let mut subscription = self
            .pubsub
            .account_subscribe(account, &self.commitment)
            .await
            .map_err(|e| ChainError::Subscribe(e.to_string()))?;
        let id = subscription.id;

        // Forward notifications as bare slots; when either side goes away
        // the other observes end-of-stream.
        let (tx, rx) = mpsc::channel(FORWARD_BUFFER);
        let account = account.clone();
        tokio::spawn(async move {
            while let Some(notice) = subscription.recv().await {
                if tx.send(VaultNotice { slot: notice.slot() }).await.is_err() {
                    break;
                }
            }
            debug!(account = %account, "Vault notification forwarding ended");
        });

        Ok(VaultSubscription { id, rx })
    }

    async fn unsubscribe(&self, id: u64) -> Result<(), ChainError> {
        self.pubsub
            .account_unsubscribe(id)
            .await
            .map_err(|e| ChainError::Subscribe(e.to_string()))
    }
}
