//! JSON-RPC wire frames and notification payloads.
//!
//! The WebSocket carries three frame shapes: request replies (matched by
//! request id), error replies, and subscription notifications (matched by
//! subscription id). HTTP responses reuse the reply shape.

use raysnipe_core::Slot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// Error object attached to a failed reply.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Reply to a request (success or error), matched by request id.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcReply {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// Push notification for an active subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcNotificationFrame {
    pub method: String,
    pub params: NotificationParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationParams {
    pub subscription: u64,
    pub result: Value,
}

/// Incoming WebSocket frame.
///
/// Replies carry an `id`; notifications carry a `method` — serde picks the
/// matching variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WsIncoming {
    Reply(RpcReply),
    Notification(RpcNotificationFrame),
}

/// Slot context attached to every RPC result.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RpcContext {
    pub slot: Slot,
}

/// accountNotification payload.
///
/// Only the slot matters here: the monitor re-reads the token balance over
/// HTTP rather than decoding the pushed account data.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountNotification {
    pub context: RpcContext,
}

impl AccountNotification {
    pub fn slot(&self) -> Slot {
        self.context.slot
    }
}

/// logsNotification payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsNotification {
    pub context: RpcContext,
    pub value: LogsValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsValue {
    pub signature: String,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// getSignatureStatuses entry (null for unknown signatures).
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureStatus {
    #[serde(rename = "confirmationStatus")]
    pub confirmation_status: Option<String>,
    #[serde(default)]
    pub err: Option<Value>,
}

impl SignatureStatus {
    /// Confirmed or better, with no execution error.
    pub fn is_confirmed(&self) -> bool {
        self.err.is_none()
            && matches!(
                self.confirmation_status.as_deref(),
                Some("confirmed") | Some("finalized")
            )
    }
}
