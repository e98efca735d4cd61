//! Pointer, keyboard and scroll input

use phf::phf_map;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

use super::Page;
use crate::cdp::command::{
    Command, KeyEventParams, KeyEventType, MouseEventParams, MouseEventType,
};
use crate::scripts::{
    ClickRefCall, Edge, FillRefCall, LocateRefCall, PageMetricsCall, Point, RefReply,
    ScrollEdgeCall,
};
use crate::snapshot::{ElementRef, RefOutcome, StaleRef};
use crate::{Error, Result};

/// Wheel distance used when the caller gives none
pub const DEFAULT_SCROLL_AMOUNT: u32 = 500;

/// key / code / keyCode triple for a named key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedKey {
    pub key: &'static str,
    pub code: &'static str,
    pub key_code: u32,
    /// Text inserted by the key, if any
    pub text: Option<&'static str>,
}

static NAMED_KEYS: phf::Map<&'static str, NamedKey> = phf_map! {
    "enter" => NamedKey { key: "Enter", code: "Enter", key_code: 13, text: Some("\r") },
    "tab" => NamedKey { key: "Tab", code: "Tab", key_code: 9, text: None },
    "escape" => NamedKey { key: "Escape", code: "Escape", key_code: 27, text: None },
    "esc" => NamedKey { key: "Escape", code: "Escape", key_code: 27, text: None },
    "backspace" => NamedKey { key: "Backspace", code: "Backspace", key_code: 8, text: None },
    "arrowup" => NamedKey { key: "ArrowUp", code: "ArrowUp", key_code: 38, text: None },
    "arrowdown" => NamedKey { key: "ArrowDown", code: "ArrowDown", key_code: 40, text: None },
    "arrowleft" => NamedKey { key: "ArrowLeft", code: "ArrowLeft", key_code: 37, text: None },
    "arrowright" => NamedKey { key: "ArrowRight", code: "ArrowRight", key_code: 39, text: None },
};

impl NamedKey {
    /// Case-insensitive lookup
    pub fn lookup(name: &str) -> Option<&'static NamedKey> {
        NAMED_KEYS.get(name.trim().to_ascii_lowercase().as_str())
    }
}

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Top,
    Bottom,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Top => "top",
            ScrollDirection::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

impl FromStr for ScrollDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            "top" => Ok(ScrollDirection::Top),
            "bottom" => Ok(ScrollDirection::Bottom),
            other => Err(Error::invalid_argument(format!(
                "Unknown scroll direction '{}' (expected up, down, top or bottom)",
                other
            ))),
        }
    }
}

impl Page {
    /// Current centre of `target`, scrolled into view
    pub async fn locate(&mut self, target: &ElementRef) -> Result<RefOutcome<Point>> {
        let reply = self.bridge.call(&LocateRefCall { target }).await?;
        Ok(Self::resolve(target, reply))
    }

    /// Click `target`.
    ///
    /// A click always has two effects: the element's own `click()` is invoked
    /// in the page, and a left-button press/release pair is dispatched at its
    /// centre. Handlers that only listen for real pointer events rely on the
    /// second half, so neither may be skipped.
    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn click(&mut self, target: &ElementRef) -> Result<RefOutcome<Point>> {
        let point = match self.locate(target).await? {
            RefOutcome::Done(point) => point,
            RefOutcome::Stale(stale) => return Ok(RefOutcome::Stale(stale)),
        };

        let reply = self.bridge.call(&ClickRefCall { target }).await?;
        if let RefOutcome::Stale(stale) = Self::resolve(target, reply) {
            return Ok(RefOutcome::Stale(stale));
        }

        for kind in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.dispatcher()
                .send(Command::DispatchMouseEvent(MouseEventParams::left(
                    kind, point.x, point.y,
                )))
                .await?;
        }

        debug!("Clicked {} at ({}, {})", target, point.x, point.y);
        Ok(RefOutcome::Done(point))
    }

    /// Type `text` into `target`, or into the focused element when no ref is given.
    ///
    /// With a ref the value is set directly and `input`/`change` are fired.
    /// Without one each character is sent as a key down/up pair. `submit`
    /// presses Enter afterwards.
    #[instrument(skip(self, text), fields(len = text.chars().count()))]
    pub async fn type_text(
        &mut self,
        text: &str,
        target: Option<&ElementRef>,
        submit: bool,
    ) -> Result<RefOutcome<()>> {
        match target {
            Some(target) => {
                let reply = self.bridge.call(&FillRefCall { target, text }).await?;
                if let RefOutcome::Stale(stale) = Self::resolve(target, reply) {
                    return Ok(RefOutcome::Stale(stale));
                }
            }
            None => {
                for ch in text.chars() {
                    let key = ch.to_string();
                    self.key_event(KeyEventType::KeyDown, &key, None, None, Some(key.as_str()))
                        .await?;
                    self.key_event(KeyEventType::KeyUp, &key, None, None, None)
                        .await?;
                }
            }
        }

        if submit {
            self.press_key("Enter").await?;
        }
        Ok(RefOutcome::Done(()))
    }

    /// Press and release a named key
    #[instrument(skip(self))]
    pub async fn press_key(&mut self, name: &str) -> Result<()> {
        let named = NamedKey::lookup(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Unknown key '{}' (expected Enter, Tab, Escape, Backspace or an arrow key)",
                name
            ))
        })?;

        self.key_event(
            KeyEventType::KeyDown,
            named.key,
            Some(named.code),
            Some(named.key_code),
            named.text,
        )
        .await?;
        self.key_event(
            KeyEventType::KeyUp,
            named.key,
            Some(named.code),
            Some(named.key_code),
            None,
        )
        .await
    }

    async fn key_event(
        &mut self,
        kind: KeyEventType,
        key: &str,
        code: Option<&str>,
        key_code: Option<u32>,
        text: Option<&str>,
    ) -> Result<()> {
        self.dispatcher()
            .send(Command::DispatchKeyEvent(KeyEventParams {
                r#type: kind,
                key: key.to_string(),
                code: code.map(str::to_string),
                windows_virtual_key_code: key_code,
                text: text.map(str::to_string),
            }))
            .await?;
        Ok(())
    }

    /// Scroll the page. `amount` (pixels) applies to up/down only.
    #[instrument(skip(self))]
    pub async fn scroll(&mut self, direction: ScrollDirection, amount: Option<u32>) -> Result<()> {
        let delta = f64::from(amount.unwrap_or(DEFAULT_SCROLL_AMOUNT));
        let delta_y = match direction {
            ScrollDirection::Up => -delta,
            ScrollDirection::Down => delta,
            ScrollDirection::Top | ScrollDirection::Bottom => {
                let edge = if direction == ScrollDirection::Top {
                    Edge::Top
                } else {
                    Edge::Bottom
                };
                let position = self.bridge.call(&ScrollEdgeCall { edge }).await?;
                debug!("Scrolled to {} at y={}", direction, position.y);
                return Ok(());
            }
        };

        let metrics = self.bridge.call(&PageMetricsCall).await?;
        let x = metrics.viewport_width / 2.0;
        let y = metrics.viewport_height / 2.0;
        self.dispatcher()
            .send(Command::DispatchMouseEvent(MouseEventParams::wheel(
                x, y, 0.0, delta_y,
            )))
            .await?;
        Ok(())
    }

    fn resolve<T>(target: &ElementRef, reply: RefReply<T>) -> RefOutcome<T> {
        match reply {
            RefReply::Found(value) => RefOutcome::Done(value),
            RefReply::Missing { error } => {
                debug!("{} is stale: {}", target, error);
                RefOutcome::Stale(StaleRef::new(target))
            }
        }
    }
}
