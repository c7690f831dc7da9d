//! Error classification.
//!
//! Failures reach the client as human-readable messages only, so the default
//! classifier sniffs substrings. This is a known approximation: wording
//! depends on the provider and locale. The classifier sits behind a trait so
//! callers and tests can plug in a deterministic one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials were rejected. Terminal; stored credentials are cleared.
    Authentication,
    /// Likely to succeed on another attempt.
    Transient,
    /// Anything else. Terminal.
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => f.write_str("authentication"),
            Self::Transient => f.write_str("transient"),
            Self::Fatal => f.write_str("fatal"),
        }
    }
}

/// Maps a failure message to an [`ErrorKind`].
pub trait ErrorClassifier: Send + Sync {
    /// Classify `message` from a call to `agent_id`.
    fn classify(&self, message: &str, agent_id: &str) -> ErrorKind;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&str, &str) -> ErrorKind + Send + Sync,
{
    fn classify(&self, message: &str, agent_id: &str) -> ErrorKind {
        self(message, agent_id)
    }
}

/// Case-insensitive substring heuristics.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    authentication: Vec<String>,
    transient: Vec<String>,
}

impl Default for SubstringClassifier {
    fn default() -> Self {
        Self {
            authentication: ["authentication", "unauthorized", "401", "403"]
                .into_iter()
                .map(String::from)
                .collect(),
            transient: ["not found", "timeout", "timed out"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SubstringClassifier {
    /// Create the default classifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker for authentication failures.
    pub fn authentication_marker(mut self, marker: impl Into<String>) -> Self {
        self.authentication.push(marker.into().to_lowercase());
        self
    }

    /// Add a marker for transient failures.
    pub fn transient_marker(mut self, marker: impl Into<String>) -> Self {
        self.transient.push(marker.into().to_lowercase());
        self
    }
}

impl ErrorClassifier for SubstringClassifier {
    fn classify(&self, message: &str, agent_id: &str) -> ErrorKind {
        let message = message.to_lowercase();
        if self.authentication.iter().any(|m| message.contains(m.as_str())) {
            return ErrorKind::Authentication;
        }
        let mentions_agent = !agent_id.is_empty() && message.contains(&agent_id.to_lowercase());
        if mentions_agent || self.transient.iter().any(|m| message.contains(m.as_str())) {
            return ErrorKind::Transient;
        }
        ErrorKind::Fatal
    }
}
