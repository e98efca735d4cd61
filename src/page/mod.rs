//! Interaction Engine
//!
//! [`Page`] is the caller-facing handle to the remote page. It owns the
//! script bridge (and through it the dispatcher and connection), so every
//! operation takes `&mut self` and at most one command is ever in flight.
//!
//! Element-targeted operations take an [`ElementRef`](crate::snapshot::ElementRef)
//! from a previous [`Snapshot`] and return a [`RefOutcome`](crate::snapshot::RefOutcome):
//! a ref that no longer resolves in the page is a value, not an error.

mod input;
mod screenshot;


pub use input::{NamedKey, ScrollDirection, DEFAULT_SCROLL_AMOUNT};

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::cdp::command::{Command, NavigateParams};
use crate::cdp::traits::{CdpEvent, Connector};
use crate::cdp::{Dispatcher, ScriptBridge};
use crate::config::Config;
use crate::scripts::{PageState, PageTextCall, ReadyStateCall, SnapshotCall};
use crate::snapshot::{Snapshot, SnapshotOptions};
use crate::{Error, Result};

/// readyState polls after `Page.navigate`
const LOAD_POLL_ATTEMPTS: u32 = 50;
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where a navigation ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub url: String,
    pub title: String,
}

impl From<PageState> for Navigation {
    fn from(state: PageState) -> Self {
        Self {
            url: state.url,
            title: state.title,
        }
    }
}

/// Remote page handle
#[derive(Debug)]
pub struct Page {
    bridge: ScriptBridge,
    config: Config,
}

impl Page {
    pub fn new(bridge: ScriptBridge, config: Config) -> Self {
        Self { bridge, config }
    }

    /// Page on the debugging endpoint named by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let dispatcher = Dispatcher::from_config(&config)?;
        Ok(Self::new(ScriptBridge::new(dispatcher), config))
    }

    /// Page over an arbitrary connector
    pub fn with_connector(connector: Box<dyn Connector>, config: Config) -> Self {
        let dispatcher = Dispatcher::with_connector(connector, &config);
        Self::new(ScriptBridge::new(dispatcher), config)
    }

    pub fn bridge(&mut self) -> &mut ScriptBridge {
        &mut self.bridge
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn dispatcher(&mut self) -> &mut Dispatcher {
        self.bridge.dispatcher()
    }

    /// Navigate and wait (bounded) for the document to finish loading
    #[instrument(skip(self))]
    pub async fn navigate(&mut self, url: &str) -> Result<Navigation> {
        if url.trim().is_empty() {
            return Err(Error::invalid_argument("URL must not be empty"));
        }

        let result = self
            .dispatcher()
            .send(Command::Navigate(NavigateParams {
                url: url.to_string(),
            }))
            .await?;

        if let Some(error_text) = result.get("errorText").and_then(|e| e.as_str()) {
            if !error_text.is_empty() {
                return Err(Error::navigation_failed(format!("{}: {}", url, error_text)));
            }
        }

        let state = self.wait_for_load().await?;
        info!("Navigated to {} ({})", state.url, state.ready_state);
        Ok(state.into())
    }

    /// Poll `document.readyState` until `complete`, giving up quietly after the poll budget
    async fn wait_for_load(&mut self) -> Result<PageState> {
        let mut last = None;
        for _ in 0..LOAD_POLL_ATTEMPTS {
            match self.bridge.call(&ReadyStateCall).await {
                Ok(state) if state.ready_state == "complete" => return Ok(state),
                Ok(state) => last = Some(state),
                // The old execution context may be torn down mid-navigation
                Err(e @ (Error::Script(_) | Error::Protocol { .. })) => {
                    debug!("readyState not available yet: {}", e);
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }

        warn!("Page did not reach readyState=complete, continuing");
        match last {
            Some(state) => Ok(state),
            None => self.bridge.call(&ReadyStateCall).await,
        }
    }

    /// Run the accessibility snapshotter
    #[instrument(skip(self))]
    pub async fn snapshot(&mut self, options: SnapshotOptions) -> Result<Snapshot> {
        let snapshot = self
            .bridge
            .call(&SnapshotCall {
                filter: options.filter,
                max_depth: options.max_depth,
            })
            .await?;
        debug!(
            "Snapshot of {}: {} refs, counter {}",
            snapshot.url,
            snapshot.refs.len(),
            snapshot.counter
        );
        Ok(snapshot)
    }

    /// Snapshot using the configured depth
    pub async fn read(&mut self, filter: crate::snapshot::Filter) -> Result<Snapshot> {
        let options = SnapshotOptions {
            filter,
            max_depth: self.config.snapshot_depth,
        };
        self.snapshot(options).await
    }

    /// Readable page text, whitespace-collapsed and capped at `text_limit`
    pub async fn page_text(&mut self) -> Result<String> {
        let limit = self.config.text_limit;
        self.bridge.call(&PageTextCall { limit }).await
    }

    /// Sleep without touching the connection
    pub async fn wait(&self, duration: Duration) {
        debug!("Waiting {:?}", duration);
        tokio::time::sleep(duration).await;
    }

    /// Out-of-band protocol events received so far
    pub fn drain_events(&mut self) -> Vec<CdpEvent> {
        self.dispatcher().drain_events()
    }

    /// Close the connection
    pub async fn close(&mut self) {
        self.dispatcher().close().await;
    }
}
