//! # smoothchat-core
//!
//! Core types shared by every smoothchat crate.
//!
//! - **Events**: the ordered protocol events produced by a remote agent call
//! - **Messages**: role-tagged chat messages sent to the agent
//! - **Usage**: heuristic per-turn usage statistics
//! - **Errors**: the terminal error surfaced to the chat UI
//! - **Markup**: streaming-safe normalization of pseudo-HTML tags
//!
//! ## Example
//!
//! ```rust
//! use smoothchat_core::{markup::normalize, ChatMessage, StreamEvent};
//!
//! let messages = vec![ChatMessage::user("hi")];
//! assert_eq!(messages[0].content, "hi");
//!
//! let event = StreamEvent::text_chunk("<think>plan");
//! assert!(event.as_text().is_some());
//!
//! // Unclosed tags stay open while content is still arriving.
//! let shown = normalize("<think>plan");
//! assert!(shown.starts_with("> 💭 **Thinking**"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod identifier;
pub mod markup;
pub mod messages;
pub mod usage;

// Re-exports for convenience
pub use errors::{ChatError, Result, TransportError};
pub use events::{EventKind, StreamEvent};
pub use identifier::{generate_turn_id, now_utc};
pub use messages::{ChatMessage, Role};
pub use usage::{TurnUsage, UsageExtra};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::errors::{ChatError, Result, TransportError};
    pub use crate::events::{EventKind, StreamEvent};
    pub use crate::markup::normalize;
    pub use crate::messages::{ChatMessage, Role};
    pub use crate::usage::{TurnUsage, UsageExtra};
}
