//! Processor contract and registry.
//!
//! A processor turns one tweet plus its reply thread into persisted content
//! under a duplicate policy. Implementations are registered in a
//! [`ProcessorRegistry`] under a string selector; batch configuration picks
//! one by name, with typos answered by a did-you-mean hint.

use crate::error::{Result, XportError};
use crate::model::Tweet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What to do when a tweet already has a document in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDuplicate {
    /// Always create a fresh document, even alongside an existing one.
    #[default]
    New,
    /// Overwrite the existing document.
    Update,
    /// Leave the existing document untouched.
    Skip,
}

impl OnDuplicate {
    /// Parse a policy name, quietly falling back to [`OnDuplicate::New`].
    ///
    /// Config files and stored settings carry free-form strings; an unknown
    /// value means "create", never an error.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "update" => Self::Update,
            "skip" => Self::Skip,
            _ => Self::New,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Update => "update",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for OnDuplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processor state after the most recent `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorStatus {
    #[default]
    Pending,
    Success,
    Error,
}

impl fmt::Display for ProcessorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Pluggable formatting/persistence step.
///
/// Every `process` call is independent: status and messages reset on entry
/// and describe only that invocation. Accumulation across a batch is the
/// import action's job.
pub trait Processor {
    /// Persist one tweet and its flattened reply thread.
    ///
    /// # Errors
    ///
    /// Returns an error when persistence or validation fails; the caller
    /// records it and moves on to the next tweet.
    fn process(&mut self, tweet: &Tweet, thread: &[Tweet], on_duplicate: OnDuplicate)
    -> Result<()>;

    /// Outcome of the last invocation.
    fn status(&self) -> ProcessorStatus;

    /// Diagnostics from the last invocation, in emission order.
    fn messages(&self) -> &[String];
}

/// Builder closure producing a fresh processor instance per batch run.
pub type ProcessorBuilder = Box<dyn Fn() -> Result<Box<dyn Processor>>>;

/// Typed selector → constructor registry.
///
/// Selectors resolve through plain lookup (no reflection); an unknown
/// selector is a fatal configuration error carrying the known names so the
/// CLI can suggest the closest one.
#[derive(Default)]
pub struct ProcessorRegistry {
    builders: BTreeMap<String, ProcessorBuilder>,
}

impl ProcessorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder under `selector`, replacing any previous one.
    pub fn register(
        &mut self,
        selector: impl Into<String>,
        builder: impl Fn() -> Result<Box<dyn Processor>> + 'static,
    ) {
        self.builders.insert(selector.into(), Box::new(builder));
    }

    /// Registered selector names, sorted.
    #[must_use]
    pub fn selectors(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    /// Resolve a selector to a fresh processor instance.
    ///
    /// # Errors
    ///
    /// Returns [`XportError::UnknownProcessor`] for unregistered selectors,
    /// or the builder's own error when construction fails.
    pub fn create(&self, selector: &str) -> Result<Box<dyn Processor>> {
        match self.builders.get(selector) {
            Some(builder) => builder(),
            None => Err(XportError::UnknownProcessor {
                selector: selector.to_string(),
                known: self.builders.keys().cloned().collect(),
            }),
        }
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("selectors", &self.selectors())
            .finish()
    }
}
