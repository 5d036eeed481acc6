//! Reconnecting hub listener.
//!
//! `HubClient::start` spawns one task that owns the websocket. Each connection
//! attempt reads the access token from the session store afresh, performs the
//! protocol handshake and then forwards `NewOrderNotification` invocations as
//! `HubEvent`s. A dropped connection is retried following the configured delay
//! list; a completed handshake starts the list over.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::protocol::{self, HubMessage};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::SessionStore;

pub const NEW_ORDER_TARGET: &str = "NewOrderNotification";
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    Connected,
    NewOrder { arguments: Vec<Value>, received_at: DateTime<Utc> },
    Reconnecting { attempt: usize, delay: Duration },
    Disconnected { reason: Option<String> },
}

/// How one connection ended.
enum ConnectionEnd {
    Stopped,
    Closed { error: Option<String>, allow_reconnect: bool },
    Lost { handshaken: bool, reason: String },
}

#[derive(Clone)]
pub struct HubClient {
    url: Url,
    store: SessionStore,
    reconnect_delays: Vec<Duration>,
}

impl HubClient {
    pub fn new(config: &ClientConfig, store: SessionStore) -> ClientResult<Self> {
        Ok(Self::with_url(config.hub_url()?, store, config.reconnect_delays.clone()))
    }

    pub fn with_url(url: Url, store: SessionStore, reconnect_delays: Vec<Duration>) -> Self {
        Self { url, store, reconnect_delays }
    }

    /// Hub URL for the next attempt, carrying the current access token if any.
    pub fn connect_url(&self) -> Url {
        let mut url = self.url.clone();
        if let Some(token) = self.store.session().access_token() {
            url.query_pairs_mut().append_pair("access_token", token.as_str());
        }
        url
    }

    /// Spawn the listener. Must be called inside a tokio runtime.
    pub fn start(self) -> (HubHandle, mpsc::UnboundedReceiver<HubEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(events_tx, stop_rx).await });
        (HubHandle { stop: stop_tx, task }, events_rx)
    }

    async fn run(self, events: mpsc::UnboundedSender<HubEvent>, mut stop: watch::Receiver<bool>) {
        let mut attempt = 0usize;
        loop {
            let reason = match self.connect_and_listen(&events, &mut stop).await {
                ConnectionEnd::Stopped => {
                    info!(target: "hub", "listener stopped");
                    let _ = events.send(HubEvent::Disconnected { reason: None });
                    return;
                }
                ConnectionEnd::Closed { error, allow_reconnect: false } => {
                    info!(target: "hub", error = ?error, "server closed the connection");
                    let _ = events.send(HubEvent::Disconnected { reason: error });
                    return;
                }
                ConnectionEnd::Closed { error, allow_reconnect: true } => {
                    attempt = 0;
                    error.unwrap_or_else(|| "server requested reconnect".to_string())
                }
                ConnectionEnd::Lost { handshaken, reason } => {
                    if handshaken {
                        attempt = 0;
                    }
                    reason
                }
            };

            let Some(delay) = self.reconnect_delays.get(attempt).copied() else {
                warn!(target: "hub", %reason, attempts = attempt, "reconnect attempts exhausted");
                let _ = events.send(HubEvent::Disconnected { reason: Some(reason) });
                return;
            };
            attempt += 1;
            warn!(target: "hub", %reason, attempt, delay_ms = delay.as_millis() as u64, "connection lost; reconnecting");
            let _ = events.send(HubEvent::Reconnecting { attempt, delay });
            tokio::select! {
                _ = sleep(delay) => {}
                _ = stop.changed() => {
                    let _ = events.send(HubEvent::Disconnected { reason: None });
                    return;
                }
            }
        }
    }

    async fn connect_and_listen(
        &self,
        events: &mpsc::UnboundedSender<HubEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> ConnectionEnd {
        if *stop.borrow() {
            return ConnectionEnd::Stopped;
        }
        let url = self.connect_url();
        let request = match url.as_str().into_client_request() {
            Ok(r) => r,
            Err(e) => return ConnectionEnd::Lost { handshaken: false, reason: e.to_string() },
        };
        let connected = tokio::select! {
            res = tokio_tungstenite::connect_async(request) => res,
            _ = stop.changed() => return ConnectionEnd::Stopped,
        };
        let mut ws = match connected {
            Ok((ws, _resp)) => ws,
            Err(e) => return ConnectionEnd::Lost { handshaken: false, reason: e.to_string() },
        };
        debug!(target: "hub", url = %self.url, "socket open; sending handshake");
        if let Err(e) = ws.send(Message::Text(protocol::handshake_request())).await {
            return ConnectionEnd::Lost { handshaken: false, reason: e.to_string() };
        }

        let mut handshaken = false;
        let mut keepalive = interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
        loop {
            tokio::select! {
                frame = ws.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => {
                            return ConnectionEnd::Lost { handshaken, reason: "socket closed".to_string() };
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return ConnectionEnd::Lost { handshaken, reason: e.to_string() },
                    };
                    for record in protocol::split_records(&text) {
                        if !handshaken {
                            if let Err(e) = protocol::parse_handshake_response(record) {
                                let _ = ws.close(None).await;
                                return ConnectionEnd::Lost { handshaken, reason: e.to_string() };
                            }
                            handshaken = true;
                            info!(target: "hub", "connected");
                            let _ = events.send(HubEvent::Connected);
                            continue;
                        }
                        match protocol::decode(record) {
                            Ok(HubMessage::Invocation { target, arguments }) if target == NEW_ORDER_TARGET => {
                                debug!(target: "hub", args = arguments.len(), "new order notification");
                                let _ = events.send(HubEvent::NewOrder { arguments, received_at: Utc::now() });
                            }
                            Ok(HubMessage::Invocation { target, .. }) => {
                                debug!(target: "hub", %target, "ignoring invocation");
                            }
                            Ok(HubMessage::Close { error, allow_reconnect }) => {
                                let _ = ws.close(None).await;
                                return ConnectionEnd::Closed { error, allow_reconnect };
                            }
                            Ok(HubMessage::Ping) | Ok(HubMessage::Other(_)) => {}
                            Err(e) => warn!(target: "hub", error = %e, "dropping malformed record"),
                        }
                    }
                }
                _ = keepalive.tick(), if handshaken => {
                    if let Err(e) = ws.send(Message::Text(protocol::ping())).await {
                        return ConnectionEnd::Lost { handshaken, reason: e.to_string() };
                    }
                }
                _ = stop.changed() => {
                    let _ = ws.close(None).await;
                    return ConnectionEnd::Stopped;
                }
            }
        }
    }
}

pub struct HubHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HubHandle {
    pub fn is_finished(&self) -> bool { self.task.is_finished() }

    /// Stop listening, close the socket and wait for the task to exit.
    pub async fn stop(self) -> ClientResult<()> {
        self.stop.send_replace(true);
        self.task.await.map_err(|e| ClientError::hub(format!("listener task failed: {}", e)))
    }
}
