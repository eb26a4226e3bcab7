//! Single-flight position lifecycle for raysnipe.
//!
//! The only part of the system with real concurrency coordination:
//! - [`AdmissionLock`]: at most one open position, closed-state notification
//! - [`VaultMonitor`]: slot-synchronized dual-reserve PnL monitoring
//! - [`ExitEngine`]: risk-triggered, idempotent exit decision machine
//!
//! # Key Components
//!
//! - [`Position`]: the single currently-open trade
//! - [`ReservePair`]: per-vault observation slots with the slot-join predicate
//! - [`ChainReader`]: balance reads + change subscriptions, as the monitor
//!   consumes them (implemented by the bot's RPC adapter and test mocks)
//! - [`ExitSwap`]: the opaque "sell the whole position" collaborator

pub mod admission;
pub mod chain;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod position;

pub use admission::{AdmissionLock, ReleaseGuard};
pub use chain::{BalanceSnapshot, ChainReader, VaultNotice, VaultSubscription};
pub use engine::{EngineState, ExitEngine, ExitPolicy, ExitReceipt, ExitSwap, ExitTrigger};
pub use error::{ChainError, ExitSwapError};
pub use monitor::{MonitorConfig, MonitorOutcome, VaultMonitor};
pub use position::{Position, ReservePair, VaultObservation, VaultRole};
