//! The chain-reader seam the vault monitor consumes.
//!
//! One-shot balance reads plus push-based change notifications per account.
//! The production implementation adapts the JSON-RPC clients; tests drive
//! the monitor through hand-rolled mocks.

use std::future::Future;

use tokio::sync::mpsc;

use raysnipe_core::{Address, Slot};

use crate::error::ChainError;

/// A point-in-time token-account balance.
#[derive(Debug, Clone, Copy)]
pub struct BalanceSnapshot {
    /// Raw amount in base units.
    pub reserve: u128,
    /// Mint decimals, captured by the monitor during the seed reads.
    pub decimals: u32,
    /// Slot the read was served at.
    pub slot: Slot,
}

/// A change notification for a subscribed account.
///
/// Carries only the slot: the monitor re-reads the balance itself rather
/// than trusting pushed account data.
#[derive(Debug, Clone, Copy)]
pub struct VaultNotice {
    pub slot: Slot,
}

/// An active account subscription.
///
/// The stream ends (`recv` returns `None`) when the subscription or the
/// underlying connection is gone.
pub struct VaultSubscription {
    pub id: u64,
    pub rx: mpsc::Receiver<VaultNotice>,
}

/// Balance reads and change subscriptions for vault accounts.
///
/// The two vault notification streams are independent; implementations make
/// no ordering promise between them. Read failures are transient from the
/// monitor's point of view, subscription failures are fatal for the run.
pub trait ChainReader: Send + Sync {
    fn read_balance(
        &self,
        account: &Address,
    ) -> impl Future<Output = Result<BalanceSnapshot, ChainError>> + Send;

    fn subscribe(
        &self,
        account: &Address,
    ) -> impl Future<Output = Result<VaultSubscription, ChainError>> + Send;

    fn unsubscribe(&self, id: u64) -> impl Future<Output = Result<(), ChainError>> + Send;
}
