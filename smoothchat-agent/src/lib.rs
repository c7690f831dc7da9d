//! # smoothchat-agent
//!
//! Streams a remote agent's response into a smoothly revealed transcript.
//!
//! A chat turn opens a streaming call (with bounded retries), interprets the
//! protocol events it yields, and reveals the resulting text through a
//! [`SmoothBuffer`](smoothchat_streaming::SmoothBuffer) at an adaptive pace.
//! Function calls show up as banners that flip from running to completed,
//! and a collapsible summary of every call is appended when the turn ends.
//!
//! ## Core Concepts
//!
//! - **[`AgentClient`]**: runs turns, one at a time; `abort` and `configure_streaming`
//! - **[`ChatObserver`]**: receives updates, the terminal callback and progress signals
//! - **[`AgentConnection`]**: the streaming call provider
//! - **[`ConnectionManager`]**: get-or-create caching of an underlying connection
//! - **[`Interpreter`]**: the per-turn event state machine
//!
//! ## Example
//!
//! ```ignore
//! use smoothchat_agent::{AgentClient, AgentClientConfig, RecordingObserver, ScriptedConnection};
//! use smoothchat_core::{ChatMessage, StreamEvent};
//! use std::sync::Arc;
//!
//! let connection = Arc::new(ScriptedConnection::new(vec![
//!     StreamEvent::text_chunk("He"),
//!     StreamEvent::text_chunk("llo!"),
//! ]));
//! let client = AgentClient::new(AgentClientConfig::new("assistant"), connection);
//! let observer = Arc::new(RecordingObserver::new());
//!
//! client.chat(vec![ChatMessage::user("hi")], observer.clone()).await;
//! assert_eq!(observer.finishes()[0].0, "Hello!");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod connection;
pub mod credentials;
pub mod functions;
pub mod interpreter;
pub mod observer;
pub mod turn;

// Re-exports
pub use client::{AgentClient, AgentClientConfig, DEFAULT_STOP_REASON};
pub use connection::{
    AgentConnection, ConnectionManager, Connector, EventStream, ScriptedConnection,
};
pub use credentials::{CredentialStore, InMemoryCredentials};
pub use functions::{FunctionExecutionRecord, FunctionLog, FunctionSummary};
pub use interpreter::Interpreter;
pub use observer::{ChatObserver, NoopObserver, ObservedEvent, ObserverSink, RecordingObserver};
pub use turn::TurnOutcome;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AgentClient, AgentClientConfig, AgentConnection, ChatObserver, CredentialStore,
        RecordingObserver, TurnOutcome,
    };
}
