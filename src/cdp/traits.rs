//! CDP (Chrome DevTools Protocol) layer traits
//!
//! This module defines the abstract interfaces for CDP communication.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// CDP event representation
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    pub params: Value,
    /// Session ID (for multi-session targets)
    pub session_id: Option<String>,
    /// When the client read the event off the connection
    pub received_at: DateTime<Utc>,
}

/// A resolved page target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// Opaque target identifier (empty when derived from the version endpoint)
    pub target_id: String,
    /// WebSocket address to connect to
    pub ws_url: String,
}

/// One live duplex message stream to a target.
///
/// Implementations are used by a single owner, one request at a time.
#[async_trait]
pub trait Transport: Send + std::fmt::Debug {
    /// Write one text frame
    async fn send_text(&mut self, text: String) -> Result<(), crate::Error>;

    /// Read the next text frame, answering pings and skipping control frames
    async fn next_text(&mut self) -> Result<String, crate::Error>;

    /// Liveness probe; must not wait for the pong
    async fn ping(&mut self) -> Result<(), crate::Error>;

    /// Close the stream
    async fn close(&mut self) -> Result<(), crate::Error>;
}

/// Produces fresh transports, resolving the target address each time.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Open a new transport. `Error::Discovery` aborts without retry.
    async fn connect(&self) -> Result<Box<dyn Transport>, crate::Error>;
}
