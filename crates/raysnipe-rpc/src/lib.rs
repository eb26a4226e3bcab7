//! Solana JSON-RPC transport for raysnipe.
//!
//! Two clients share this crate:
//! - [`RpcClient`]: request/response JSON-RPC 2.0 over HTTP (balance reads,
//!   transaction fetches, sends, confirmation polling)
//! - [`PubsubClient`]: JSON-RPC 2.0 over WebSocket (accountSubscribe /
//!   logsSubscribe push notifications)
//!
//! The pubsub transport delivers the two vault notification streams with no
//! ordering guarantee between them; consumers synchronize on slots.

pub mod error;
pub mod http;
pub mod message;
pub mod pubsub;

pub use error::{RpcError, RpcResult};
pub use http::{RpcClient, TokenBalance};
pub use message::{
    AccountNotification, LogsNotification, LogsValue, RpcContext, SignatureStatus,
};
pub use pubsub::{AccountSubscription, LogsSubscription, PubsubClient, SubscriptionId};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
