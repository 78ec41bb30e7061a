// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user notification push channel.
//!
//! One WebSocket connection per channel instance, owned by a spawned task.
//! Every (re)connect starts with the handshake call (so an expired session is
//! masked by the HTTP client) followed by an unread-snapshot request to
//! reconcile local state. Abnormal closure reconnects with capped exponential
//! backoff; a close with code 1000 — ours or the server's — is deliberate and
//! terminal.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::config::ReconnectPolicy;
use crate::notify::{ChannelEvent, ClientMessage, Notification, NotificationFeed, PushMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the transport dropped without a close frame.
const ABNORMAL_CLOSE: u16 = 1006;

/// Live notification channel for one user.
pub struct NotificationChannel {
    feed: Arc<RwLock<NotificationFeed>>,
    event_tx: broadcast::Sender<ChannelEvent>,
    out_tx: mpsc::UnboundedSender<ClientMessage>,
    cancel: CancellationToken,
}

/// How one served connection ended.
enum SocketExit {
    /// Normal closure (code 1000) from either side. Terminal.
    Deliberate,
    /// Anything else: abnormal close code, read/write error, or EOF.
    Abnormal(u16),
}

impl NotificationChannel {
    /// Open a channel for `user_id` and start its owning task.
    ///
    /// Connection setup failures are handled inside the task via the
    /// reconnect policy; observe them through [`subscribe`](Self::subscribe).
    pub fn connect(client: Arc<ApiClient>, user_id: i64) -> Self {
        let feed = Arc::new(RwLock::new(NotificationFeed::default()));
        let (event_tx, _) = broadcast::channel(64);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let policy = client.config().reconnect_policy();
        let task = ChannelTask {
            client,
            user_id,
            feed: Arc::clone(&feed),
            event_tx: event_tx.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(async move {
            task.run(out_rx, policy).await;
        });

        Self { feed, event_tx, out_tx, cancel }
    }

    /// Subscribe to channel events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the local notification list, newest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.feed.read().await.items().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.feed.read().await.unread_count()
    }

    /// Mark a notification as read.
    ///
    /// The local copy is updated optimistically no matter what; the
    /// `mark_read` acknowledgement is sent best-effort if the channel task is
    /// still alive. Returns `true` if the local flag changed.
    pub async fn mark_as_read(&self, id: i64) -> bool {
        let changed = self.feed.write().await.mark_read(id);
        let _ = self.out_tx.send(ClientMessage::MarkRead { notification_id: id });
        changed
    }

    /// Request a fresh unread snapshot over the open channel, e.g. when a
    /// display surface opens and needs an up-to-date view.
    pub fn request_unread(&self) {
        let _ = self.out_tx.send(ClientMessage::FetchUnreadNotifications);
    }

    /// Deliberately close the channel. The socket is closed with code 1000
    /// ("unmounting") and no reconnect is attempted — including a reconnect
    /// already waiting out its backoff delay.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State moved into the owning task.
struct ChannelTask {
    client: Arc<ApiClient>,
    user_id: i64,
    feed: Arc<RwLock<NotificationFeed>>,
    event_tx: broadcast::Sender<ChannelEvent>,
    cancel: CancellationToken,
}

impl ChannelTask {
    async fn run(
        self,
        mut out_rx: mpsc::UnboundedReceiver<ClientMessage>,
        policy: ReconnectPolicy,
    ) {
        let mut attempts = 0u32;
        let mut backoff = policy.initial;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let dialed = tokio::select! {
                _ = self.cancel.cancelled() => break,
                dialed = self.open_socket() => dialed,
            };
            match dialed {
                Ok(ws) => {
                    attempts = 0;
                    backoff = policy.initial;
                    let _ = self.event_tx.send(ChannelEvent::Connected);

                    match self.serve(ws, &mut out_rx).await {
                        SocketExit::Deliberate => break,
                        SocketExit::Abnormal(code) => {
                            tracing::debug!(user_id = self.user_id, code, "notification channel dropped");
                            let _ = self.event_tx.send(ChannelEvent::Disconnected { code });
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(user_id = self.user_id, err = %e, "notification channel connect failed");
                }
            }

            attempts += 1;
            if attempts > policy.max_attempts {
                tracing::warn!(
                    user_id = self.user_id,
                    attempts,
                    "notification channel giving up after repeated failures"
                );
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(policy.max);
        }

        let _ = self.event_tx.send(ChannelEvent::Closed);
    }

    /// Handshake for the channel URL, then dial it.
    async fn open_socket(&self) -> anyhow::Result<WsStream> {
        let endpoint = self.client.notification_endpoint(self.user_id).await?;
        let (ws, _) = tokio_tungstenite::connect_async(endpoint.websocket_url.as_str()).await?;
        Ok(ws)
    }

    /// Serve one connection until it ends.
    async fn serve(
        &self,
        ws: WsStream,
        out_rx: &mut mpsc::UnboundedReceiver<ClientMessage>,
    ) -> SocketExit {
        let (mut write, mut read) = ws.split();

        // Resync: reconcile the local feed against the server's unread set.
        if let Err(e) = send_message(&mut write, &ClientMessage::FetchUnreadNotifications).await {
            tracing::debug!(err = %e, "unread resync request failed");
            return SocketExit::Abnormal(ABNORMAL_CLOSE);
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: "unmounting".into() };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    return SocketExit::Deliberate;
                }

                outgoing = out_rx.recv() => {
                    match outgoing {
                        Some(msg) => {
                            if let Err(e) = send_message(&mut write, &msg).await {
                                tracing::debug!(err = %e, "outgoing channel send failed");
                                return SocketExit::Abnormal(ABNORMAL_CLOSE);
                            }
                        }
                        // Sender side gone: the handle was dropped.
                        None => {
                            let frame = CloseFrame { code: CloseCode::Normal, reason: "unmounting".into() };
                            let _ = write.send(Message::Close(Some(frame))).await;
                            return SocketExit::Deliberate;
                        }
                    }
                }

                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => self.handle_push(text.as_str()).await,
                        Some(Ok(Message::Close(frame))) => {
                            let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                            if code == 1000 {
                                return SocketExit::Deliberate;
                            }
                            return SocketExit::Abnormal(code);
                        }
                        Some(Ok(_)) => {} // ping/pong/binary ignored
                        Some(Err(e)) => {
                            tracing::debug!(err = %e, "notification channel read error");
                            return SocketExit::Abnormal(ABNORMAL_CLOSE);
                        }
                        None => return SocketExit::Abnormal(ABNORMAL_CLOSE),
                    }
                }
            }
        }
    }

    /// Dispatch one server frame. A malformed payload is logged and skipped;
    /// it never tears down the channel.
    async fn handle_push(&self, text: &str) {
        match serde_json::from_str::<PushMessage>(text) {
            Ok(PushMessage::NewNotification { notification }) => {
                let fresh = self.feed.write().await.insert_new(notification.clone());
                if fresh {
                    let _ = self.event_tx.send(ChannelEvent::NewNotification(notification));
                }
            }
            Ok(PushMessage::UnreadNotifications { notifications }) => {
                let unread = {
                    let mut feed = self.feed.write().await;
                    feed.merge_snapshot(notifications);
                    feed.unread_count()
                };
                let _ = self.event_tx.send(ChannelEvent::Snapshot { unread });
            }
            Err(e) => {
                tracing::debug!(err = %e, "ignoring malformed push message");
            }
        }
    }
}

async fn send_message(
    write: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    msg: &ClientMessage,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(msg)?;
    write.send(Message::Text(text.into())).await?;
    Ok(())
}
