//! Error types for smoothchat.
//!
//! [`ChatError`] is the only error that reaches the chat UI. Its `Display`
//! output is always a displayable sentence, never a debug dump of a nested
//! value.

use thiserror::Error;

/// Message shown to the user when the agent rejects the stored credentials.
pub const LOGIN_AGAIN_MESSAGE: &str = "Authentication failed, please log in again.";

/// Terminal error for a chat turn.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The agent reported an error mid-stream.
    #[error("{0}")]
    Agent(String),

    /// The agent rejected the credentials.
    ///
    /// The raw provider message is kept for logs; users see [`LOGIN_AGAIN_MESSAGE`].
    #[error("Authentication failed, please log in again.")]
    Authentication(String),

    /// The streaming call could not be opened.
    #[error("Failed to reach agent after {attempts} attempt(s): {message}")]
    Connection {
        /// Last failure message.
        message: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The transport failed after the stream was opened.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The turn was cancelled.
    ///
    /// Cancellation is not a failure: it is never handed to an error callback.
    #[error("Turn was cancelled")]
    Cancelled,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Create an agent error.
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent(message.into())
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>, attempts: u32) -> Self {
        Self::Connection {
            message: message.into(),
            attempts,
        }
    }

    /// The normalized message handed to the UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Check whether this is a cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check whether this is an authentication failure.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Result type alias using ChatError.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Failure raised by the RPC collaborator.
///
/// Only the human-readable message is carried; classification happens
/// downstream on that message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Human-readable failure message.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TransportError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TransportError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<TransportError> for ChatError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.message)
    }
}
