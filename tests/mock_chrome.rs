//! Mock Chrome DevTools Protocol server
//!
//! This module provides a mock Chrome page target for testing the full client
//! stack without requiring a real Chrome instance.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub const MOCK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[derive(Default)]
struct ServerState {
    drop_first: bool,
    connections: AtomicU32,
    methods: Mutex<Vec<String>>,
}

/// Mock Chrome server
pub struct MockChromeServer {
    addr: String,
    state: Arc<ServerState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockChromeServer {
    /// Start a new mock Chrome server
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        Self::launch(false).await
    }

    /// Start a server whose first connection dies right after its first command
    pub async fn start_dropping_first() -> Result<Self, Box<dyn std::error::Error>> {
        Self::launch(true).await
    }

    async fn launch(drop_first: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let ws_addr = format!("ws://{}/devtools/page/test-target-1", addr);

        let state = Arc::new(ServerState {
            drop_first,
            ..Default::default()
        });
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                let connection_id = accept_state.connections.fetch_add(1, Ordering::SeqCst);
                                tracing::info!("Mock Chrome: Connection {} from {}", connection_id, peer_addr);
                                tokio::spawn(Self::handle_connection(stream, connection_id, accept_state.clone()));
                            }
                            Err(e) => {
                                tracing::error!("Mock Chrome: Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Mock Chrome: Shutdown signal received");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            addr: ws_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Handle a WebSocket connection
    async fn handle_connection(stream: TcpStream, connection_id: u32, state: Arc<ServerState>) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                tracing::error!("Mock Chrome: WebSocket handshake error: {}", e);
                return;
            }
        };
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let Ok(req) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    let method = req["method"].as_str().unwrap_or("unknown").to_string();
                    state
                        .methods
                        .lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .push(method.clone());

                    if state.drop_first && connection_id == 0 {
                        tracing::debug!("Mock Chrome: Dropping connection {}", connection_id);
                        return;
                    }

                    if method == "Page.navigate" {
                        let event = json!({
                            "method": "Page.frameStartedLoading",
                            "params": { "frameId": "test-frame" }
                        });
                        if ws_sender.send(Message::Text(event.to_string())).await.is_err() {
                            break;
                        }
                    }

                    let response = Self::create_cdp_response(&req);
                    if ws_sender.send(Message::Text(response.to_string())).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!("Mock Chrome: Connection {} closed", connection_id);
                    break;
                }
                Err(e) => {
                    tracing::error!("Mock Chrome: WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    fn evaluated(id: i64, value: Value) -> Value {
        json!({
            "id": id,
            "result": { "result": { "type": "object", "value": value } }
        })
    }

    /// Create a CDP response for a request
    fn create_cdp_response(req: &Value) -> Value {
        let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("unknown");
        let id = req.get("id").and_then(|i| i.as_i64()).unwrap_or(0);

        match method {
            "Page.navigate" => json!({
                "id": id,
                "result": {
                    "frameId": "test-frame",
                    "loaderId": "test-loader"
                }
            }),
            "Runtime.evaluate" => {
                let expr = req["params"]["expression"].as_str().unwrap_or("");
                if expr.contains("chaser-pilot:ready_state") {
                    Self::evaluated(id, json!({
                        "readyState": "complete",
                        "url": "https://example.com/",
                        "title": "Mock Page"
                    }))
                } else if expr.contains("chaser-pilot:snapshot") {
                    Self::evaluated(id, Self::get_snapshot())
                } else if expr.contains("chaser-pilot:locate_ref") {
                    if expr.contains(")(1, ") {
                        Self::evaluated(id, json!({ "x": 60, "y": 24.5 }))
                    } else {
                        Self::evaluated(id, json!({ "error": "ref not found" }))
                    }
                } else if expr.contains("chaser-pilot:click_ref") {
                    Self::evaluated(id, json!({ "ok": true }))
                } else if expr.contains("chaser-pilot:page_metrics") {
                    Self::evaluated(id, json!({
                        "scrollWidth": 1280,
                        "scrollHeight": 2400,
                        "viewportWidth": 1280,
                        "viewportHeight": 720,
                        "devicePixelRatio": 1
                    }))
                } else if expr.contains("throw") {
                    json!({
                        "id": id,
                        "result": {
                            "result": { "type": "object", "subtype": "error" },
                            "exceptionDetails": {
                                "exceptionId": 1,
                                "text": "Uncaught",
                                "lineNumber": 0,
                                "columnNumber": 6,
                                "exception": {
                                    "type": "object",
                                    "subtype": "error",
                                    "description": "Error: boom"
                                }
                            }
                        }
                    })
                } else {
                    json!({
                        "id": id,
                        "result": {
                            "result": {
                                "type": "string",
                                "value": "test-result"
                            }
                        }
                    })
                }
            }
            "Input.dispatchMouseEvent"
            | "Input.dispatchKeyEvent"
            | "Emulation.setDeviceMetricsOverride"
            | "Emulation.clearDeviceMetricsOverride" => json!({
                "id": id,
                "result": {}
            }),
            "Page.captureScreenshot" => json!({
                "id": id,
                "result": {
                    "data": MOCK_PNG_BASE64
                }
            }),
            _ => json!({
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!("'{}' wasn't found", method)
                }
            }),
        }
    }

    /// Get the WebSocket endpoint URL
    pub fn ws_endpoint(&self) -> &str {
        &self.addr
    }

    /// Connections accepted so far
    pub fn connection_count(&self) -> u32 {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Methods received, in order, across all connections
    pub fn methods(&self) -> Vec<String> {
        self.state
            .methods
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// `/json` target list pointing at this server
    pub fn get_targets(&self) -> Value {
        json!([
            {
                "id": "test-target-1",
                "type": "page",
                "title": "Test Page",
                "url": "about:blank",
                "webSocketDebuggerUrl": self.addr
            }
        ])
    }

    /// Snapshot returned for every snapshot call
    pub fn get_snapshot() -> Value {
        json!({
            "tree": "button \"Submit\" [e1]\nlink \"More\" [e2] href=\"/more\"\n\n[viewport: 1280x720]",
            "viewport": { "width": 1280, "height": 720 },
            "url": "https://example.com/",
            "title": "Mock Page",
            "generation": "mock-gen",
            "counter": 2,
            "refs": [
                { "ref": "e1", "index": 1, "role": "button", "name": "Submit" },
                { "ref": "e2", "index": 2, "role": "link", "name": "More" }
            ]
        })
    }
}

impl Drop for MockChromeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chrome_startup() {
        let server = MockChromeServer::start().await.unwrap();
        assert!(server.ws_endpoint().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_targets_point_at_server() {
        let server = MockChromeServer::start().await.unwrap();
        let targets = server.get_targets();
        assert_eq!(targets[0]["webSocketDebuggerUrl"], server.ws_endpoint());
    }

    #[test]
    fn test_unknown_method_is_protocol_error() {
        let response = MockChromeServer::create_cdp_response(&json!({ "id": 7, "method": "Foo.bar" }));
        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], -32601);
    }
}
