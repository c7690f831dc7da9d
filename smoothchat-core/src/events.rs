//! Protocol event types.
//!
//! This module defines the events a remote agent call yields, in order,
//! for a single chat turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Events emitted by a remote agent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The agent failed; terminal for the turn.
    Error {
        /// Error message.
        message: String,
    },

    /// Incremental text to append.
    TextChunk {
        /// The text delta.
        content: String,
    },

    /// Full replacement of all visible text so far.
    TextFull {
        /// The complete text.
        content: String,
    },

    /// A tool invocation started.
    FunctionCall {
        /// Function name.
        name: String,
        /// Call identifier.
        #[serde(alias = "callId")]
        call_id: String,
        /// Raw arguments (usually JSON).
        #[serde(default)]
        arguments: String,
    },

    /// A previously started invocation produced output.
    FunctionCallOutput {
        /// Call identifier of the matching `FunctionCall`.
        #[serde(alias = "callId")]
        call_id: String,
        /// Raw output.
        #[serde(default)]
        content: String,
    },

    /// A new model completion pass began.
    NewCompletionRound {
        /// Completion identifier.
        #[serde(alias = "completionId")]
        completion_id: String,
    },
}

/// Type tag of a [`StreamEvent`], used to configure per-kind display policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// [`StreamEvent::Error`]
    Error,
    /// [`StreamEvent::TextChunk`]
    TextChunk,
    /// [`StreamEvent::TextFull`]
    TextFull,
    /// [`StreamEvent::FunctionCall`]
    FunctionCall,
    /// [`StreamEvent::FunctionCallOutput`]
    FunctionCallOutput,
    /// [`StreamEvent::NewCompletionRound`]
    NewCompletionRound,
}

impl EventKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::TextChunk => "text_chunk",
            Self::TextFull => "text_full",
            Self::FunctionCall => "function_call",
            Self::FunctionCallOutput => "function_call_output",
            Self::NewCompletionRound => "new_completion_round",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StreamEvent {
    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Create a text chunk event.
    pub fn text_chunk(content: impl Into<String>) -> Self {
        Self::TextChunk {
            content: content.into(),
        }
    }

    /// Create a full-text replacement event.
    pub fn text_full(content: impl Into<String>) -> Self {
        Self::TextFull {
            content: content.into(),
        }
    }

    /// Create a function call event.
    pub fn function_call(
        name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::FunctionCall {
            name: name.into(),
            call_id: call_id.into(),
            arguments: arguments.into(),
        }
    }

    /// Create a function output event.
    pub fn function_call_output(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    /// Create a new completion round event.
    pub fn new_completion_round(completion_id: impl Into<String>) -> Self {
        Self::NewCompletionRound {
            completion_id: completion_id.into(),
        }
    }

    /// Get the type tag of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Error { .. } => EventKind::Error,
            Self::TextChunk { .. } => EventKind::TextChunk,
            Self::TextFull { .. } => EventKind::TextFull,
            Self::FunctionCall { .. } => EventKind::FunctionCall,
            Self::FunctionCallOutput { .. } => EventKind::FunctionCallOutput,
            Self::NewCompletionRound { .. } => EventKind::NewCompletionRound,
        }
    }

    /// Check if this event ends the turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Get the text content if this is a text event.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::TextChunk { content } | Self::TextFull { content } => Some(content),
            _ => None,
        }
    }

    /// Decode an event from a JSON frame.
    pub fn from_json(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { message } => write!(f, "[error] {}", message),
            Self::TextChunk { content } => write!(f, "{}", content),
            Self::TextFull { content } => write!(f, "[full] {}", content),
            Self::FunctionCall { name, call_id, .. } => {
                write!(f, "[function_call] {} ({})", name, call_id)
            }
            Self::FunctionCallOutput { call_id, .. } => {
                write!(f, "[function_output] {}", call_id)
            }
            Self::NewCompletionRound { completion_id } => {
                write!(f, "[new_completion] {}", completion_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(StreamEvent::text_chunk("a").kind(), EventKind::TextChunk);
        assert_eq!(
            StreamEvent::function_call("runCode", "c1", "{}").kind(),
            EventKind::FunctionCall
        );
        assert_eq!(EventKind::FunctionCallOutput.as_str(), "function_call_output");
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::error("boom").is_terminal());
        assert!(!StreamEvent::text_chunk("hi").is_terminal());
    }

    #[test]
    fn test_decode_camel_case_frame() {
        let event = StreamEvent::from_json(
            r#"{"type":"function_call","name":"runCode","callId":"c1","arguments":"{}"}"#,
        )
        .unwrap();
        assert_eq!(event, StreamEvent::function_call("runCode", "c1", "{}"));

        let event =
            StreamEvent::from_json(r#"{"type":"new_completion_round","completionId":"r2"}"#)
                .unwrap();
        assert_eq!(event, StreamEvent::new_completion_round("r2"));
    }

    #[test]
    fn test_decode_missing_output_content() {
        let event = StreamEvent::from_json(r#"{"type":"function_call_output","call_id":"c9"}"#)
            .unwrap();
        assert_eq!(event, StreamEvent::function_call_output("c9", ""));
    }

    #[test]
    fn test_display() {
        assert_eq!(StreamEvent::text_chunk("test").to_string(), "test");
        assert_eq!(StreamEvent::error("oops").to_string(), "[error] oops");
    }

    #[test]
    fn test_kind_serde() {
        let kind: EventKind = serde_json::from_str("\"function_call\"").unwrap();
        assert_eq!(kind, EventKind::FunctionCall);
    }
}
