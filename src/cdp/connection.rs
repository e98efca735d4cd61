//! CDP WebSocket connection implementation
//!
//! This module provides the WebSocket transport to a page target and the
//! connection manager that owns it, reconnecting with exponential backoff.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};

use super::discovery::TargetDiscovery;
use super::traits::{Connector, Transport};
use crate::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Close handshakes on a dead socket must not stall a reconnect
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket transport to a single target
#[derive(Debug)]
pub struct WebSocketTransport {
    url: String,
    stream: WsStream,
}

impl WebSocketTransport {
    /// Open a WebSocket to `url`
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to WebSocket: {}", url);

        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::transport(format!("Failed to connect to {}: {}", url, e)))?;

        info!("WebSocket connection established");
        Ok(Self {
            url: url.to_string(),
            stream,
        })
    }

    /// Address this transport is connected to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        debug!("WebSocket: Sending message: {}", text);
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::transport(format!("Failed to send message: {}", e)))
    }

    async fn next_text(&mut self) -> Result<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data)
                        .map_err(|e| Error::transport(format!("Non UTF-8 binary frame: {}", e)));
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| Error::transport(format!("Failed to send pong: {}", e)))?;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    info!("WebSocket close frame received");
                    return Err(Error::transport(format!(
                        "WebSocket closed by peer: {:?}",
                        frame
                    )));
                }
                Some(Err(e)) => {
                    return Err(Error::transport(format!("WebSocket error: {}", e)));
                }
                None => return Err(Error::transport("WebSocket stream closed")),
            }
        }
    }

    async fn ping(&mut self) -> Result<()> {
        self.stream
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| Error::transport(format!("Ping failed: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| Error::transport(format!("Failed to close WebSocket: {}", e)))
    }
}

/// Connector that re-runs discovery before every WebSocket handshake
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    discovery: TargetDiscovery,
}

impl WebSocketConnector {
    /// Create a connector over the given discovery
    pub fn new(discovery: TargetDiscovery) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let target = self.discovery.discover().await?;
        let transport = WebSocketTransport::connect(&target.ws_url).await?;
        Ok(Box::new(transport))
    }
}

/// Bounded attempt budget with doubling delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Owns the single live transport and replaces it wholesale on failure
#[derive(Debug)]
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    policy: RetryPolicy,
    connections: u64,
}

impl ConnectionManager {
    /// Create a disconnected manager
    pub fn new(connector: Box<dyn Connector>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            transport: None,
            policy,
            connections: 0,
        }
    }

    /// Retry policy shared with the dispatcher
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether a transport is currently held
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Number of transports opened over this manager's lifetime
    pub fn connection_count(&self) -> u64 {
        self.connections
    }

    /// Drop any current transport and open a new one, retrying with backoff
    #[instrument(skip(self))]
    pub async fn connect(&mut self) -> Result<()> {
        self.discard().await;

        let max_attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.connector.connect().await {
                Ok(transport) => {
                    self.transport = Some(transport);
                    self.connections += 1;
                    info!(
                        "Connected on attempt {} (connection #{})",
                        attempt, self.connections
                    );
                    return Ok(());
                }
                Err(e @ Error::Discovery(_)) => return Err(e),
                Err(e) => {
                    warn!("Connect attempt {}/{} failed: {}", attempt, max_attempts, e);
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(Error::connection(format!(
            "Failed to connect after {} attempts: {}",
            max_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Probe the current transport and reconnect if it is missing or dead
    pub async fn ensure_connected(&mut self) -> Result<&mut Box<dyn Transport>> {
        let alive = match self.transport.as_mut() {
            Some(transport) => match transport.ping().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Liveness probe failed, reconnecting: {}", e);
                    false
                }
            },
            None => false,
        };

        if !alive {
            self.connect().await?;
        }

        self.transport
            .as_mut()
            .ok_or_else(|| Error::connection("No transport after connect"))
    }

    /// Close and forget the current transport, if any
    pub async fn discard(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await {
                Ok(Ok(())) => debug!("Closed stale transport"),
                Ok(Err(e)) => debug!("Ignoring close failure on stale transport: {}", e),
                Err(_) => debug!("Timed out closing stale transport"),
            }
        }
    }
}
