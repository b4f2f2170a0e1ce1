//! One-shot change watchers over a deterministic in-memory DOM.
//!
//! A [`Document`] is a small arena DOM that records mutations the way a browser's
//! `MutationObserver` machinery does and delivers them in batches. A
//! [`ChangeWatcher`] subscribes to a node, re-evaluates a text or class predicate
//! once per delivered batch, and fires its callback at most once.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use dom_change_watcher::{ChangeWatcher, Document, WatchConfig};
//!
//! # fn main() -> dom_change_watcher::Result<()> {
//! let mut doc = Document::from_html("<p id='status'>Waiting</p>")?;
//! let fired = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&fired);
//!
//! let target = doc.get_element_by_id("status");
//! let config = WatchConfig::parse("Waiting", "text", "changed_from")?;
//! let watcher = ChangeWatcher::create(&mut doc, target, config, move || {
//!     counter.set(counter.get() + 1);
//! })?;
//!
//! let status = doc.get_element_by_id("status").unwrap();
//! doc.set_text_content(status, "Complete")?;
//! doc.flush_mutations()?;
//!
//! assert_eq!(fired.get(), 1);
//! assert!(!watcher.is_active());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

mod document;
mod dom;
mod html;
mod mutation;
mod runtime_state;
mod scheduler;
mod selector;
mod watcher;

pub use document::Document;
pub use mutation::{
    MutationCallback, MutationKind, MutationRecord, MutationSource, ObserveOptions, ObserverId,
};
pub use runtime_state::PendingTimer;
pub use scheduler::PollConfig;
pub use watcher::{ChangeWatcher, ObservedProperty, TriggerDirection, WatchConfig, WatcherState};

pub(crate) use dom::Dom;
pub(crate) use selector::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    UnsupportedSelector(String),
    SelectorNotFound(String),
    DomOperation(String),
    InvalidTarget(String),
    InvalidConfig(String),
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::DomOperation(msg) => write!(f, "dom operation error: {msg}"),
            Self::InvalidTarget(msg) => write!(f, "invalid watch target: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

/// Handle to a node inside one [`Document`].
///
/// Handles are plain indices; a handle taken from another document is either out of
/// range (rejected) or names an unrelated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".to_string(), classes.join(" "));
    }
}

fn escape_html_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_attr(value: &str) -> String {
    escape_html_text(value).replace('"', "&quot;")
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests;
