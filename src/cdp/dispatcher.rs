//! Command dispatcher
//!
//! Correlates one outbound command with its response over the managed
//! connection. Transport failures are recovered by reconnecting and re-sending
//! the same command within the retry budget.

use chrono::Utc;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

use super::command::Command;
use super::connection::{ConnectionManager, RetryPolicy, WebSocketConnector};
use super::discovery::TargetDiscovery;
use super::traits::{CdpEvent, Connector};
use super::types::{CdpInbound, CdpNotification, CdpRequest};
use crate::config::{Config, TimeoutConfig};
use crate::{Error, Result};

/// Out-of-band events retained between drains
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Sends typed commands and waits for their matching responses
#[derive(Debug)]
pub struct Dispatcher {
    connection: ConnectionManager,
    timeouts: TimeoutConfig,
    next_id: u64,
    events: VecDeque<CdpEvent>,
}

impl Dispatcher {
    /// Create a dispatcher over an existing connection manager
    pub fn new(connection: ConnectionManager, timeouts: TimeoutConfig) -> Self {
        Self {
            connection,
            timeouts,
            next_id: 1,
            events: VecDeque::new(),
        }
    }

    /// Dispatcher over an arbitrary connector, with budgets taken from `config`
    pub fn with_connector(connector: Box<dyn Connector>, config: &Config) -> Self {
        let policy = RetryPolicy::new(config.connect_attempts, config.backoff_base());
        Self::new(
            ConnectionManager::new(connector, policy),
            config.timeouts.clone(),
        )
    }

    /// Dispatcher that discovers and connects to the configured debugging port
    pub fn from_config(config: &Config) -> Result<Self> {
        let discovery = TargetDiscovery::new(&config.host, config.port)?;
        Ok(Self::with_connector(
            Box::new(WebSocketConnector::new(discovery)),
            config,
        ))
    }

    /// Underlying connection manager
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Send `command` and return its result payload
    #[instrument(skip(self, command), fields(method = command.method()))]
    pub async fn send(&mut self, command: Command) -> Result<Value> {
        let method = command.method();
        let params = command.params()?;
        let timeout = command.timeout(&self.timeouts);
        let policy = self.connection.policy().clone();

        let mut last_error = None;
        for attempt in 1..=policy.max_attempts {
            match self.attempt(method, params.as_ref(), timeout).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transport() => {
                    warn!(
                        "{} failed on attempt {}/{}: {}",
                        method, attempt, policy.max_attempts, e
                    );
                    self.connection.discard().await;
                    last_error = Some(e);
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.delay_after(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::connection(format!(
            "{} failed after {} attempts: {}",
            method,
            policy.max_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// One write-then-read cycle on the current (or a fresh) transport
    async fn attempt(
        &mut self,
        method: &str,
        params: Option<&Value>,
        timeout: std::time::Duration,
    ) -> Result<Value> {
        let transport = self.connection.ensure_connected().await?;

        let id = self.next_id;
        self.next_id += 1;

        let request = serde_json::to_string(&CdpRequest { id, method, params })?;
        debug!("Sending CDP command {}: {}", id, method);
        transport.send_text(request).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let text = match tokio::time::timeout_at(deadline, transport.next_text()).await {
                Ok(frame) => frame?,
                Err(_) => {
                    return Err(Error::transport(format!(
                        "Command {} ({}) timed out after {:?}",
                        id, method, timeout
                    )));
                }
            };

            match CdpInbound::parse(&text) {
                Ok(CdpInbound::Response(response)) if response.id == id => {
                    if let Some(error) = response.error {
                        return Err(Error::protocol(error.code, error.message, error.data));
                    }
                    return Ok(response.result);
                }
                Ok(CdpInbound::Response(response)) => {
                    debug!("Discarding response for unknown command ID: {}", response.id);
                }
                Ok(CdpInbound::Notification(notification)) => {
                    Self::enqueue(&mut self.events, notification);
                }
                Ok(CdpInbound::Unrecognized(_)) => warn!("Unknown message format: {}", text),
                // Only one command is in flight, so an unparseable frame is its reply
                Err(malformed) if malformed.id == Some(id) || malformed.is_syntax() => {
                    warn!("Malformed reply to command {} ({}): {}", id, method, malformed.error);
                    return Err(Error::Serialization(malformed.error));
                }
                Err(malformed) => {
                    warn!("Discarding malformed frame: {}", malformed.error);
                }
            }
        }
    }

    fn enqueue(events: &mut VecDeque<CdpEvent>, notification: CdpNotification) {
        debug!("Received event: {}", notification.method);
        if events.len() == EVENT_QUEUE_CAPACITY {
            if let Some(dropped) = events.pop_front() {
                warn!("Event queue full, dropping {}", dropped.method);
            }
        }
        events.push_back(CdpEvent {
            method: notification.method,
            params: notification.params,
            session_id: notification.session_id,
            received_at: Utc::now(),
        });
    }

    /// Take all queued out-of-band events, oldest first
    pub fn drain_events(&mut self) -> Vec<CdpEvent> {
        self.events.drain(..).collect()
    }

    /// Close the connection
    pub async fn close(&mut self) {
        self.connection.discard().await;
    }
}
