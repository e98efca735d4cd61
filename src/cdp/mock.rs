//! Mock CDP implementation for testing
//!
//! A scripted in-memory browser: it records every command and connect, can be
//! told to fail connects, sends or pings, and answers commands through a
//! caller-supplied handler.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

use crate::cdp::traits::{Connector, Transport};
use crate::Error;

/// 1x1 transparent PNG
pub const MOCK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// How the mock answers one command
#[derive(Debug, Clone)]
pub enum MockReply {
    /// `{"id": .., "result": value}`
    Result(Value),
    /// `{"id": .., "error": {code, message}}`
    Error { code: i64, message: String },
    /// The connection breaks after the command is written
    DropConnection,
    /// Never answer
    NoReply,
    /// Verbatim frame; `{id}` is replaced with the command id
    Raw(String),
}

impl MockReply {
    /// `Runtime.evaluate` result returning `value` by value
    pub fn evaluated(value: Value) -> Self {
        MockReply::Result(json!({
            "result": { "type": "object", "value": value }
        }))
    }

    /// `Runtime.evaluate` result carrying a thrown exception
    pub fn exception(description: &str) -> Self {
        MockReply::Result(json!({
            "result": { "type": "object", "subtype": "error", "description": description },
            "exceptionDetails": {
                "exceptionId": 1,
                "text": "Uncaught",
                "lineNumber": 0,
                "columnNumber": 0,
                "exception": { "type": "object", "subtype": "error", "description": description }
            }
        }))
    }
}

/// A command the mock received
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RecordedCommand {
    /// `params.expression` for `Runtime.evaluate`, empty otherwise
    pub fn expression(&self) -> &str {
        self.params
            .get("expression")
            .and_then(|e| e.as_str())
            .unwrap_or("")
    }
}

type Handler = Box<dyn FnMut(&str, &Value) -> MockReply + Send>;

#[derive(Default)]
struct MockState {
    connect_failures: u32,
    discovery_failure: Option<String>,
    send_failures: u32,
    ping_failures: u32,
    handler: Option<Handler>,
    pending_frames: VecDeque<String>,
    commands: Vec<RecordedCommand>,
    connect_attempts: Vec<Instant>,
    send_attempts: Vec<Instant>,
    closed: usize,
}

/// Shared handle to the scripted browser
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBrowser").finish_non_exhaustive()
    }
}

impl MockBrowser {
    /// Create a browser that answers every command with defaults
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not cascade into unrelated assertions
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Connector producing transports to this browser
    pub fn connector(&self) -> MockConnector {
        MockConnector {
            browser: self.clone(),
        }
    }

    /// Answer commands with `handler` instead of the defaults
    pub fn on<F>(&self, handler: F)
    where
        F: FnMut(&str, &Value) -> MockReply + Send + 'static,
    {
        self.state().handler = Some(Box::new(handler));
    }

    /// Fail the next `n` connect attempts with a transport error
    pub fn fail_connects(&self, n: u32) {
        self.state().connect_failures = n;
    }

    /// Fail every connect with a discovery error
    pub fn fail_discovery(&self, message: &str) {
        self.state().discovery_failure = Some(message.to_string());
    }

    /// Fail the next `n` writes with a transport error
    pub fn fail_sends(&self, n: u32) {
        self.state().send_failures = n;
    }

    /// Fail the next `n` liveness probes
    pub fn fail_pings(&self, n: u32) {
        self.state().ping_failures = n;
    }

    /// Queue an event frame delivered before the next reply
    pub fn push_event(&self, method: &str, params: Value) {
        let frame = json!({ "method": method, "params": params }).to_string();
        self.state().pending_frames.push_back(frame);
    }

    /// Queue a raw frame delivered before the next reply
    pub fn push_frame(&self, frame: Value) {
        self.state().pending_frames.push_back(frame.to_string());
    }

    /// Commands successfully written, in order
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state().commands.clone()
    }

    /// Method names of [`MockBrowser::commands`]
    pub fn methods(&self) -> Vec<String> {
        self.state()
            .commands
            .iter()
            .map(|c| c.method.clone())
            .collect()
    }

    /// Instants of every connect attempt, failed or not
    pub fn connect_attempts(&self) -> Vec<Instant> {
        self.state().connect_attempts.clone()
    }

    /// Instants of every write attempt, failed or not
    pub fn send_attempts(&self) -> Vec<Instant> {
        self.state().send_attempts.clone()
    }

    /// Number of transports closed by the client
    pub fn closed_transports(&self) -> usize {
        self.state().closed
    }

    fn default_reply(method: &str) -> MockReply {
        match method {
            "Page.navigate" => MockReply::Result(json!({
                "frameId": "mock-frame",
                "loaderId": "mock-loader"
            })),
            "Runtime.evaluate" => MockReply::Result(json!({
                "result": { "type": "undefined" }
            })),
            "Page.captureScreenshot" => MockReply::Result(json!({ "data": MOCK_PNG_BASE64 })),
            _ => MockReply::Result(json!({})),
        }
    }
}

/// Connector for [`MockBrowser`]
#[derive(Debug, Clone)]
pub struct MockConnector {
    browser: MockBrowser,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, Error> {
        let mut state = self.browser.state();
        state.connect_attempts.push(Instant::now());

        if let Some(message) = &state.discovery_failure {
            return Err(Error::discovery(message.clone()));
        }

        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(Error::transport("Connection refused"));
        }

        Ok(Box::new(MockTransport {
            browser: self.browser.clone(),
            outbox: VecDeque::new(),
            broken: false,
        }))
    }
}

/// Transport produced by [`MockConnector`]
#[derive(Debug)]
pub struct MockTransport {
    browser: MockBrowser,
    outbox: VecDeque<String>,
    broken: bool,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&mut self, text: String) -> Result<(), Error> {
        let reply = {
            let mut state = self.browser.state();
            state.send_attempts.push(Instant::now());

            if self.broken {
                return Err(Error::transport("Broken pipe"));
            }
            if state.send_failures > 0 {
                state.send_failures -= 1;
                self.broken = true;
                return Err(Error::transport("Broken pipe"));
            }

            let request: Value = serde_json::from_str(&text)?;
            let id = request.get("id").and_then(|i| i.as_u64()).unwrap_or(0);
            let method = request
                .get("method")
                .and_then(|m| m.as_str())
                .unwrap_or("")
                .to_string();
            let params = request.get("params").cloned().unwrap_or(Value::Null);

            state.commands.push(RecordedCommand {
                id,
                method: method.clone(),
                params: params.clone(),
            });

            while let Some(frame) = state.pending_frames.pop_front() {
                self.outbox.push_back(frame);
            }

            let reply = match state.handler.as_mut() {
                Some(handler) => handler(&method, &params),
                None => MockBrowser::default_reply(&method),
            };
            (id, reply)
        };

        match reply {
            (id, MockReply::Result(result)) => {
                self.outbox
                    .push_back(json!({ "id": id, "result": result }).to_string());
            }
            (id, MockReply::Error { code, message }) => {
                self.outbox.push_back(
                    json!({ "id": id, "error": { "code": code, "message": message } }).to_string(),
                );
            }
            (id, MockReply::Raw(frame)) => {
                self.outbox.push_back(frame.replace("{id}", &id.to_string()));
            }
            (_, MockReply::DropConnection) => self.broken = true,
            (_, MockReply::NoReply) => {}
        }
        Ok(())
    }

    async fn next_text(&mut self) -> Result<String, Error> {
        if let Some(frame) = self.outbox.pop_front() {
            return Ok(frame);
        }
        if self.broken {
            return Err(Error::transport("Connection reset by peer"));
        }
        std::future::pending::<Result<String, Error>>().await
    }

    async fn ping(&mut self) -> Result<(), Error> {
        let mut state = self.browser.state();
        if state.ping_failures > 0 {
            state.ping_failures -= 1;
            return Err(Error::transport("Ping failed"));
        }
        if self.broken {
            return Err(Error::transport("Ping failed"));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.browser.state().closed += 1;
        Ok(())
    }
}
