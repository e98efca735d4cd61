//! Chaser-Pilot: remote browser automation over the Chrome DevTools Protocol
//!
//! This library drives an already-running browser through its debugging port:
//! it discovers a page target, keeps one self-healing connection to it, and
//! acts on the page through accessibility snapshots and stable element refs.

pub mod error;
pub mod config;

pub mod cdp;
pub mod page;
pub mod scripts;
pub mod snapshot;

// Re-exports
pub use error::{Error, Result};
pub use page::{Navigation, Page};
pub use snapshot::{ElementRef, Filter, RefOutcome, Snapshot, SnapshotOptions, StaleRef};

/// Chaser-Pilot library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
