//! # smoothchat - Smooth Streaming for Agent Chat
//!
//! smoothchat turns the irregular event stream of a remote agent call into a
//! smoothly revealed, formatted transcript. Text deltas, full replacements,
//! function-call lifecycles and completion rounds are interpreted into one
//! logical transcript, normalized into markdown-safe markup, and revealed
//! frame by frame at a speed that adapts to the content and to how bursty
//! the network is.
//!
//! ## Quick Start
//!
//! ```ignore
//! use smoothchat::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let connection = Arc::new(ScriptedConnection::new(vec![
//!         StreamEvent::text_chunk("He"),
//!         StreamEvent::text_chunk("llo!"),
//!     ]));
//!     let client = AgentClient::new(AgentClientConfig::new("assistant"), connection);
//!     let observer = Arc::new(RecordingObserver::new());
//!
//!     client.chat(vec![ChatMessage::user("hi")], observer.clone()).await;
//!     println!("{:?}", observer.finishes());
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`smoothchat_core`] - Events, messages, usage, errors and the markup normalizer
//! - [`smoothchat_streaming`] - Pattern detection, adaptive speed and the reveal buffer
//! - [`smoothchat_retries`] - Bounded retries, error classification, cancellation
//! - [`smoothchat_agent`] - Event interpreter, observers, connections and the client

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Events, messages, usage, errors and markup.
pub use smoothchat_core as core;

/// Reveal buffer and pacing.
pub use smoothchat_streaming as streaming;

/// Retries and cancellation.
pub use smoothchat_retries as retries;

/// Event interpreter and agent client.
pub use smoothchat_agent as agent;

// ============================================================================
// Core Type Re-exports (Flat)
// ============================================================================

// Errors
pub use smoothchat_core::{ChatError, Result, TransportError};

// Events and messages
pub use smoothchat_core::{ChatMessage, EventKind, Role, StreamEvent, TurnUsage};

// Markup
pub use smoothchat_core::markup::{normalize, MarkupNormalizer};

// Reveal
pub use smoothchat_streaming::{
    FrameTicker, GenerationPattern, SmoothBuffer, SmoothStreamConfig, SmoothStreamConfigPatch,
    Smoothness,
};

// Retries
pub use smoothchat_retries::{
    with_retry, CancellationToken, ErrorClassifier, ErrorKind, RetryConfig, SubstringClassifier,
};

// Agent
pub use smoothchat_agent::{
    AgentClient, AgentClientConfig, AgentConnection, ChatObserver, ConnectionManager, Connector,
    CredentialStore, EventStream, InMemoryCredentials, RecordingObserver, ScriptedConnection,
    TurnOutcome,
};

/// Prelude for common imports.
///
/// ```rust
/// use smoothchat::prelude::*;
///
/// let config = SmoothStreamConfig::default();
/// assert_eq!(config.smoothness, Smoothness::Medium);
/// ```
pub mod prelude {
    pub use crate::{
        normalize, AgentClient, AgentClientConfig, AgentConnection, ChatError, ChatMessage,
        ChatObserver, EventKind, RecordingObserver, Role, ScriptedConnection, SmoothBuffer,
        SmoothStreamConfig, SmoothStreamConfigPatch, Smoothness, StreamEvent, TurnOutcome,
        TurnUsage,
    };
}
