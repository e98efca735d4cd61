//! Accessibility snapshot model
//!
//! The snapshot itself is computed inside the page (see `scripts/snapshot.js`).
//! This module holds its options, its decoded result, and the client-side
//! handle type for element refs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Which elements a snapshot includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Only actionable elements
    #[default]
    Interactive,
    /// Interactive, landmark/structural, named, and non-generic elements
    All,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Interactive => "interactive",
            Filter::All => "all",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(Filter::Interactive),
            "all" => Ok(Filter::All),
            other => Err(Error::invalid_argument(format!(
                "Unknown filter '{}' (expected interactive or all)",
                other
            ))),
        }
    }
}

/// Snapshot parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub filter: Filter,
    pub max_depth: u32,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            filter: Filter::Interactive,
            max_depth: 50,
        }
    }
}

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One row of the page's ref table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefEntry {
    /// Rendered handle, e.g. `e12`
    #[serde(rename = "ref")]
    pub id: String,
    /// Arena slot
    pub index: u32,
    pub role: String,
    pub name: String,
}

/// Result of one snapshot run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Rendered semantic tree, ending with a viewport annotation
    pub tree: String,
    pub viewport: Viewport,
    pub url: String,
    pub title: String,
    /// Page-load id of the arena that minted the refs
    pub generation: String,
    /// Refs minted so far in this page load
    pub counter: u32,
    /// Refs of the elements included in this snapshot, in tree order
    pub refs: Vec<RefEntry>,
}

impl Snapshot {
    /// Handle for a ref listed in this snapshot, bound to its generation
    pub fn element_ref(&self, id: &str) -> Option<ElementRef> {
        self.refs
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| ElementRef::in_generation(entry.index, self.generation.clone()))
    }

    /// First element with the given role and accessible name
    pub fn find(&self, role: &str, name: &str) -> Option<ElementRef> {
        self.refs
            .iter()
            .find(|entry| entry.role == role && entry.name == name)
            .map(|entry| ElementRef::in_generation(entry.index, self.generation.clone()))
    }

    /// Tree lines without the trailing viewport annotation
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.tree
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with("[viewport:"))
    }
}

/// Client-side handle to an element in the page's ref arena.
///
/// A handle taken from a [`Snapshot`] carries that snapshot's generation and
/// is rejected by the page after a navigation or reload. A handle parsed from
/// text (`e12`) has no generation and is checked only against the live arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    index: u32,
    generation: Option<String>,
}

impl ElementRef {
    /// Unbound handle for slot `index`
    pub fn new(index: u32) -> Self {
        Self {
            index,
            generation: None,
        }
    }

    /// Handle bound to a page-load generation
    pub fn in_generation<S: Into<String>>(index: u32, generation: S) -> Self {
        Self {
            index,
            generation: Some(generation.into()),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> Option<&str> {
        self.generation.as_deref()
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.index)
    }
}

impl FromStr for ElementRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('@')
            .unwrap_or(trimmed)
            .trim_start_matches(['[', 'e'])
            .trim_end_matches(']');

        match digits.parse::<u32>() {
            Ok(index) if index > 0 => Ok(ElementRef::new(index)),
            _ => Err(Error::invalid_argument(format!(
                "Invalid ref '{}' (expected e.g. e12)",
                s
            ))),
        }
    }
}

/// Structured "ref not found" value returned instead of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleRef {
    pub error: String,
    #[serde(rename = "ref")]
    pub id: String,
    pub hint: String,
}

impl StaleRef {
    pub fn new(target: &ElementRef) -> Self {
        Self {
            error: "ref not found".to_string(),
            id: target.to_string(),
            hint: "the page changed since the last snapshot; run read again for fresh refs"
                .to_string(),
        }
    }
}

/// Outcome of a ref-targeted operation
#[derive(Debug, Clone, PartialEq)]
pub enum RefOutcome<T> {
    Done(T),
    Stale(StaleRef),
}

impl<T> RefOutcome<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, RefOutcome::Stale(_))
    }

    pub fn stale(&self) -> Option<&StaleRef> {
        match self {
            RefOutcome::Stale(stale) => Some(stale),
            RefOutcome::Done(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> RefOutcome<U> {
        match self {
            RefOutcome::Done(value) => RefOutcome::Done(f(value)),
            RefOutcome::Stale(stale) => RefOutcome::Stale(stale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        serde_json::from_value(json!({
            "tree": "button \"Submit\" [e1]\n  link \"Docs\" [e2] href=\"/docs\"\n\n[viewport: 1280x720]",
            "viewport": { "width": 1280, "height": 720 },
            "url": "https://example.com/",
            "title": "Example",
            "generation": "lq2x-ab12cd",
            "counter": 2,
            "refs": [
                { "ref": "e1", "index": 1, "role": "button", "name": "Submit" },
                { "ref": "e2", "index": 2, "role": "link", "name": "Docs" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_ref_parsing() {
        assert_eq!("e12".parse::<ElementRef>().unwrap().index(), 12);
        assert_eq!("@e3".parse::<ElementRef>().unwrap().index(), 3);
        assert_eq!("[e7]".parse::<ElementRef>().unwrap().index(), 7);
        assert_eq!("4".parse::<ElementRef>().unwrap().index(), 4);
        assert!("e0".parse::<ElementRef>().is_err());
        assert!("button".parse::<ElementRef>().is_err());
        assert!("".parse::<ElementRef>().is_err());
    }

    #[test]
    fn test_ref_display_round_trips_through_parse() {
        let parsed: ElementRef = "e42".parse().unwrap();
        assert_eq!(parsed.to_string(), "e42");
        assert!(parsed.generation().is_none());
    }

    #[test]
    fn test_snapshot_refs_carry_generation() {
        let snapshot = sample();
        let submit = snapshot.element_ref("e1").unwrap();
        assert_eq!(submit.generation(), Some("lq2x-ab12cd"));
        assert_eq!(snapshot.find("link", "Docs").unwrap().index(), 2);
        assert!(snapshot.element_ref("e9").is_none());
    }

    #[test]
    fn test_lines_skip_viewport_annotation() {
        let snapshot = sample();
        let lines: Vec<&str> = snapshot.lines().collect();
        assert_eq!(lines, vec!["button \"Submit\" [e1]", "  link \"Docs\" [e2] href=\"/docs\""]);
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("ALL".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!("interactive".parse::<Filter>().unwrap(), Filter::Interactive);
        assert!("visible".parse::<Filter>().is_err());
    }

    #[test]
    fn test_stale_ref_shape() {
        let stale = StaleRef::new(&ElementRef::new(12));
        let value = serde_json::to_value(&stale).unwrap();
        assert_eq!(value["error"], "ref not found");
        assert_eq!(value["ref"], "e12");

        let outcome: RefOutcome<()> = RefOutcome::Stale(stale);
        assert!(outcome.is_stale());
    }
}
