//! WebSocket pubsub client.
//!
//! A single IO task owns the socket. Callers talk to it through a command
//! channel: subscribe commands carry a oneshot for the confirmation reply,
//! and each confirmed subscription gets its own bounded notification
//! channel, routed by subscription id.
//!
//! When the socket dies, every routed channel is dropped, so consumers
//! observe end-of-stream instead of hanging; the owner decides whether to
//! reconnect (the detection feed does, the vault monitor tears down).

use std::collections::HashMap;

use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use raysnipe_core::Address;

use crate::error::{RpcError, RpcResult};
use crate::message::{AccountNotification, LogsNotification, RpcRequest, WsIncoming};

/// Server-assigned subscription id.
pub type SubscriptionId = u64;

/// Per-subscription notification buffer. Vault accounts update at most once
/// per slot, so a small buffer is plenty.
const NOTIFICATION_BUFFER: usize = 64;

enum Command {
    Subscribe {
        method: &'static str,
        params: Value,
        reply: oneshot::Sender<RpcResult<RawSubscription>>,
    },
    Unsubscribe {
        method: &'static str,
        id: SubscriptionId,
        reply: oneshot::Sender<RpcResult<()>>,
    },
}

struct RawSubscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Value>,
}

/// Active account subscription: id plus its notification stream.
pub struct AccountSubscription {
    pub id: SubscriptionId,
    rx: mpsc::Receiver<Value>,
}

impl AccountSubscription {
    /// Next account notification; `None` once the subscription or the
    /// underlying connection is gone. Unparseable frames are skipped.
    pub async fn recv(&mut self) -> Option<AccountNotification> {
        loop {
            let value = self.rx.recv().await?;
            match serde_json::from_value(value) {
                Ok(notice) => return Some(notice),
                Err(e) => warn!(error = %e, "Skipping malformed account notification"),
            }
        }
    }
}

/// Active logs subscription.
pub struct LogsSubscription {
    pub id: SubscriptionId,
    rx: mpsc::Receiver<Value>,
}

impl LogsSubscription {
    pub async fn recv(&mut self) -> Option<LogsNotification> {
        loop {
            let value = self.rx.recv().await?;
            match serde_json::from_value(value) {
                Ok(notice) => return Some(notice),
                Err(e) => warn!(error = %e, "Skipping malformed logs notification"),
            }
        }
    }
}

/// WebSocket pubsub client handle.
///
/// Cheap to clone; all clones talk to the same connection. Dropping the last
/// handle (or calling [`PubsubClient::shutdown`]) closes the socket.
#[derive(Clone)]
pub struct PubsubClient {
    cmd_tx: mpsc::Sender<Command>,
    shutdown_token: CancellationToken,
}

impl PubsubClient {
    /// Connect and spawn the IO task.
    pub async fn connect(url: &str) -> RpcResult<Self> {
        info!(url = %url, "Connecting pubsub WebSocket");

        let (ws_stream, _response) = connect_async(url).await?;
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let shutdown_token = CancellationToken::new();

        let task = IoTask {
            cmd_rx,
            shutdown_token: shutdown_token.clone(),
            next_request_id: 1,
            pending: HashMap::new(),
            routes: HashMap::new(),
        };
        tokio::spawn(task.run(ws_stream));

        Ok(Self {
            cmd_tx,
            shutdown_token,
        })
    }

    /// Subscribe to change notifications on a token account.
    pub async fn account_subscribe(
        &self,
        account: &Address,
        commitment: &str,
    ) -> RpcResult<AccountSubscription> {
        let params = json!([
            account.as_str(),
            {"encoding": "base64", "commitment": commitment}
        ]);
        let raw = self.subscribe("accountSubscribe", params).await?;
        debug!(account = %account, subscription = raw.id, "Account subscription confirmed");

        Ok(AccountSubscription {
            id: raw.id,
            rx: raw.rx,
        })
    }

    pub async fn account_unsubscribe(&self, id: SubscriptionId) -> RpcResult<()> {
        self.unsubscribe("accountUnsubscribe", id).await
    }

    /// Subscribe to log notifications for transactions mentioning `program`.
    pub async fn logs_subscribe(
        &self,
        program: &Address,
        commitment: &str,
    ) -> RpcResult<LogsSubscription> {
        let params = json!([
            {"mentions": [program.as_str()]},
            {"commitment": commitment}
        ]);
        let raw = self.subscribe("logsSubscribe", params).await?;
        info!(program = %program, subscription = raw.id, "Logs subscription confirmed");

        Ok(LogsSubscription {
            id: raw.id,
            rx: raw.rx,
        })
    }

    pub async fn logs_unsubscribe(&self, id: SubscriptionId) -> RpcResult<()> {
        self.unsubscribe("logsUnsubscribe", id).await
    }

    /// Close the connection. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    async fn subscribe(&self, method: &'static str, params: Value) -> RpcResult<RawSubscription> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Subscribe {
                method,
                params,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RpcError::ConnectionFailed("pubsub connection closed".into()))?;

        reply_rx
            .await
            .map_err(|_| RpcError::ConnectionFailed("pubsub connection closed".into()))?
    }

    async fn unsubscribe(&self, method: &'static str, id: SubscriptionId) -> RpcResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Unsubscribe {
                method,
                id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RpcError::ConnectionFailed("pubsub connection closed".into()))?;

        reply_rx
            .await
            .map_err(|_| RpcError::ConnectionFailed("pubsub connection closed".into()))?
    }
}

enum Pending {
    Subscribe(oneshot::Sender<RpcResult<RawSubscription>>),
    Unsubscribe(oneshot::Sender<RpcResult<()>>),
}

struct IoTask {
    cmd_rx: mpsc::Receiver<Command>,
    shutdown_token: CancellationToken,
    next_request_id: u64,
    /// request id -> reply slot for in-flight subscribe/unsubscribe calls.
    pending: HashMap<u64, Pending>,
    /// subscription id -> notification route.
    routes: HashMap<SubscriptionId, mpsc::Sender<Value>>,
}

impl IoTask {
    async fn run(
        mut self,
        ws_stream: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    ) {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    debug!("Pubsub shutdown requested");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if let Err(e) = self.handle_command(cmd, &mut write).await {
                                error!(error = %e, "Pubsub write failed");
                                break;
                            }
                        }
                        None => {
                            // All handles dropped.
                            debug!("Pubsub handles dropped, closing");
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            warn!(?frame, "Pubsub closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "Pubsub read error");
                            break;
                        }
                        None => {
                            warn!("Pubsub stream ended");
                            break;
                        }
                    }
                }
            }
        }

        // Dropping the routes closes every consumer's stream; dropping the
        // pending replies fails every in-flight call.
        self.routes.clear();
        for (_, pending) in self.pending.drain() {
            match pending {
                Pending::Subscribe(reply) => {
                    let _ = reply.send(Err(RpcError::ConnectionFailed(
                        "pubsub connection closed".into(),
                    )));
                }
                Pending::Unsubscribe(reply) => {
                    let _ = reply.send(Err(RpcError::ConnectionFailed(
                        "pubsub connection closed".into(),
                    )));
                }
            }
        }

        debug!("Pubsub IO task terminated");
    }

    async fn handle_command<W>(&mut self, cmd: Command, write: &mut W) -> RpcResult<()>
    where
        W: Sink<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        match cmd {
            Command::Subscribe {
                method,
                params,
                reply,
            } => {
                let id = self.next_request_id;
                self.next_request_id += 1;

                let request = RpcRequest::new(id, method, params);
                let text = serde_json::to_string(&request)?;
                self.pending.insert(id, Pending::Subscribe(reply));

                write
                    .send(Message::Text(text))
                    .await
                    .map_err(|e| RpcError::ConnectionFailed(format!("send: {e}")))?;
            }
            Command::Unsubscribe { method, id, reply } => {
                let request_id = self.next_request_id;
                self.next_request_id += 1;

                // Stop routing immediately; late notifications for a
                // cancelled subscription are of no interest.
                self.routes.remove(&id);

                let request = RpcRequest::new(request_id, method, json!([id]));
                let text = serde_json::to_string(&request)?;
                self.pending.insert(request_id, Pending::Unsubscribe(reply));

                write
                    .send(Message::Text(text))
                    .await
                    .map_err(|e| RpcError::ConnectionFailed(format!("send: {e}")))?;
            }
        }

        Ok(())
    }

    fn handle_text(&mut self, text: &str) {
        let frame: WsIncoming = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable pubsub frame");
                return;
            }
        };

        match frame {
            WsIncoming::Reply(reply) => {
                let Some(pending) = self.pending.remove(&reply.id) else {
                    debug!(id = reply.id, "Reply for unknown request id");
                    return;
                };

                match pending {
                    Pending::Subscribe(sender) => {
                        let outcome = if let Some(err) = reply.error {
                            Err(RpcError::Rpc {
                                code: err.code,
                                message: err.message,
                            })
                        } else {
                            match reply.result.as_ref().and_then(Value::as_u64) {
                                Some(sub_id) => {
                                    let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
                                    self.routes.insert(sub_id, tx);
                                    Ok(RawSubscription { id: sub_id, rx })
                                }
                                None => Err(RpcError::SubscriptionFailed(
                                    "subscribe reply is not a subscription id".into(),
                                )),
                            }
                        };
                        let _ = sender.send(outcome);
                    }
                    Pending::Unsubscribe(sender) => {
                        let outcome = match reply.error {
                            Some(err) => Err(RpcError::Rpc {
                                code: err.code,
                                message: err.message,
                            }),
                            None => Ok(()),
                        };
                        let _ = sender.send(outcome);
                    }
                }
            }
            WsIncoming::Notification(frame) => {
                let sub_id = frame.params.subscription;
                let send_result = match self.routes.get(&sub_id) {
                    Some(route) => route.try_send(frame.params.result),
                    None => {
                        debug!(subscription = sub_id, "Notification for unrouted subscription");
                        return;
                    }
                };

                match send_result {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(subscription = sub_id, "Notification buffer full, dropping");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(subscription = sub_id, "Consumer gone, dropping route");
                        self.routes.remove(&sub_id);
                    }
                }
            }
        }
    }
}
