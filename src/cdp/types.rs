//! CDP (Chrome DevTools Protocol) type definitions
//!
//! This module defines the core data structures for CDP communication.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest<'a> {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: &'a str,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a serde_json::Value>,
}

/// CDP JSON-RPC notification (event)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    #[serde(default)]
    pub params: serde_json::Value,
    /// Session ID for multi-session targets
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Inbound frame, classified
#[derive(Debug, Clone)]
pub enum CdpInbound {
    /// Reply to a command
    Response(CdpRpcResponse),
    /// Out-of-band event
    Notification(CdpNotification),
    /// Valid JSON that is neither a reply nor an event
    Unrecognized(serde_json::Value),
}

/// Frame that could not be decoded
#[derive(Debug)]
pub struct MalformedFrame {
    /// The frame's `id`, when it carried one
    pub id: Option<u64>,
    /// Decoder failure
    pub error: serde_json::Error,
}

impl MalformedFrame {
    /// Whether the frame was not JSON at all
    pub fn is_syntax(&self) -> bool {
        self.error.is_syntax() || self.error.is_eof()
    }
}

impl CdpInbound {
    /// Classify an inbound text frame
    ///
    /// Chrome escapes strings cut inside a surrogate pair as a lone `\uD83D`,
    /// which strict JSON decoders reject; such escapes are decoded as U+FFFD.
    /// A frame with an `id` must decode as a response, and the failure keeps
    /// that id so the caller can attribute it.
    pub fn parse(text: &str) -> std::result::Result<Self, MalformedFrame> {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => serde_json::from_str(&replace_lone_surrogates(text))
                .map_err(|error| MalformedFrame { id: None, error })?,
        };

        if let Some(id) = value.get("id") {
            let id = id.as_u64();
            return serde_json::from_value(value)
                .map(CdpInbound::Response)
                .map_err(|error| MalformedFrame { id, error });
        }
        if value.get("method").is_some() {
            return serde_json::from_value(value)
                .map(CdpInbound::Notification)
                .map_err(|error| MalformedFrame { id: None, error });
        }
        Ok(CdpInbound::Unrecognized(value))
    }
}

/// Rewrite `\uD800`..`\uDFFF` escapes that are not part of a pair to `\uFFFD`
fn replace_lone_surrogates(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) != Some(&b'u') {
            i += 2;
            continue;
        }
        let lone = match hex_unit(bytes, i + 2) {
            Some(0xD800..=0xDBFF) => {
                let paired = bytes.get(i + 6) == Some(&b'\\')
                    && bytes.get(i + 7) == Some(&b'u')
                    && matches!(hex_unit(bytes, i + 8), Some(0xDC00..=0xDFFF));
                if paired {
                    i += 12;
                    continue;
                }
                true
            }
            Some(0xDC00..=0xDFFF) => true,
            _ => false,
        };
        if lone {
            out.push_str(&text[last..i]);
            out.push_str("\\uFFFD");
            last = i + 6;
        }
        i += 6;
    }

    out.push_str(&text[last..]);
    out
}

fn hex_unit(bytes: &[u8], at: usize) -> Option<u16> {
    let digits = std::str::from_utf8(bytes.get(at..at + 4)?).ok()?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
    /// Unserializable value
    #[serde(rename = "unserializableValue", default)]
    pub unserializable_value: Option<String>,
}

/// Exception details
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception ID
    #[serde(default)]
    pub exception_id: i64,
    /// Exception text
    #[serde(default)]
    pub text: Option<String>,
    /// Line number
    #[serde(default)]
    pub line_number: i64,
    /// Column number
    #[serde(default)]
    pub column_number: i64,
    /// Exception object
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Most specific human-readable description available
    pub fn describe(&self) -> String {
        let detail = self
            .exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .or_else(|| self.text.clone())
            .unwrap_or_else(|| "Unknown error".to_string());
        format!(
            "{} (line {}, column {})",
            detail, self.line_number, self.column_number
        )
    }
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
    /// Exception details if evaluation failed
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}
