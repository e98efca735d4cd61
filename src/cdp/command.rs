//! Typed CDP commands
//!
//! Every command the client can issue is a variant of [`Command`] with a typed
//! parameter struct. Method strings exist only in [`Command::method`].

use serde::Serialize;
use serde_json::Value;

use crate::config::TimeoutConfig;
use crate::Result;

/// `Page.navigate` parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// `Runtime.evaluate` parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Serialize the result into the response instead of returning a handle
    pub return_by_value: bool,
    /// Resolve a returned promise before responding
    pub await_promise: bool,
}

impl EvaluateParams {
    /// By-value, promise-awaiting evaluation
    pub fn by_value<S: Into<String>>(expression: S) -> Self {
        Self {
            expression: expression.into(),
            return_by_value: true,
            await_promise: true,
        }
    }
}

/// Mouse event kinds understood by `Input.dispatchMouseEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    MousePressed,
    MouseReleased,
    MouseMoved,
    MouseWheel,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    None,
    Left,
    Middle,
    Right,
}

/// `Input.dispatchMouseEvent` parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseEventParams {
    pub r#type: MouseEventType,
    pub x: f64,
    pub y: f64,
    pub button: MouseButton,
    pub click_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
}

impl MouseEventParams {
    /// Single left-button press or release at `(x, y)`
    pub fn left(r#type: MouseEventType, x: f64, y: f64) -> Self {
        Self {
            r#type,
            x,
            y,
            button: MouseButton::Left,
            click_count: 1,
            delta_x: None,
            delta_y: None,
        }
    }

    /// Wheel event at `(x, y)`
    pub fn wheel(x: f64, y: f64, delta_x: f64, delta_y: f64) -> Self {
        Self {
            r#type: MouseEventType::MouseWheel,
            x,
            y,
            button: MouseButton::None,
            click_count: 0,
            delta_x: Some(delta_x),
            delta_y: Some(delta_y),
        }
    }
}

/// Key event kinds understood by `Input.dispatchKeyEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
    RawKeyDown,
    Char,
}

/// `Input.dispatchKeyEvent` parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventParams {
    pub r#type: KeyEventType,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `Page.captureScreenshot` parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshotParams {
    /// Image format ("png")
    pub format: String,
    /// Capture content outside the visible viewport
    pub capture_beyond_viewport: bool,
}

/// `Emulation.setDeviceMetricsOverride` parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetricsParams {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
}

/// Supported CDP commands
#[derive(Debug, Clone)]
pub enum Command {
    Navigate(NavigateParams),
    Evaluate(EvaluateParams),
    DispatchMouseEvent(MouseEventParams),
    DispatchKeyEvent(KeyEventParams),
    CaptureScreenshot(CaptureScreenshotParams),
    SetDeviceMetricsOverride(DeviceMetricsParams),
    ClearDeviceMetricsOverride,
}

impl Command {
    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            Command::Navigate(_) => "Page.navigate",
            Command::Evaluate(_) => "Runtime.evaluate",
            Command::DispatchMouseEvent(_) => "Input.dispatchMouseEvent",
            Command::DispatchKeyEvent(_) => "Input.dispatchKeyEvent",
            Command::CaptureScreenshot(_) => "Page.captureScreenshot",
            Command::SetDeviceMetricsOverride(_) => "Emulation.setDeviceMetricsOverride",
            Command::ClearDeviceMetricsOverride => "Emulation.clearDeviceMetricsOverride",
        }
    }

    /// Wire parameter payload, `None` for parameterless commands
    pub fn params(&self) -> Result<Option<Value>> {
        let value = match self {
            Command::Navigate(p) => serde_json::to_value(p)?,
            Command::Evaluate(p) => serde_json::to_value(p)?,
            Command::DispatchMouseEvent(p) => serde_json::to_value(p)?,
            Command::DispatchKeyEvent(p) => serde_json::to_value(p)?,
            Command::CaptureScreenshot(p) => serde_json::to_value(p)?,
            Command::SetDeviceMetricsOverride(p) => serde_json::to_value(p)?,
            Command::ClearDeviceMetricsOverride => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Response timeout for this command
    pub fn timeout(&self, config: &TimeoutConfig) -> std::time::Duration {
        let secs = match self {
            Command::Navigate(_) => config.navigation_secs,
            Command::Evaluate(_) => config.execution_secs,
            Command::CaptureScreenshot(_) => config.screenshot_secs,
            _ => config.default_secs,
        };
        std::time::Duration::from_secs(secs)
    }
}
