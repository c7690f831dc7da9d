//! # smoothchat-streaming
//!
//! Smooth reveal of streamed chat content.
//!
//! Network chunks arrive in irregular bursts. This crate decouples their
//! arrival from what the user sees: content is set as a *target*, and a
//! per-frame tick grows the *displayed* prefix toward it at an adaptive speed.
//!
//! ## Core Concepts
//!
//! - **[`SmoothBuffer`]**: the reveal state machine (`add`, `replace`, `complete`, `stop`, `tick`)
//! - **[`speed()`]**: characters per second for the text at a cursor
//! - **[`PatternDetector`]**: burst/steady/slow classification of chunk arrivals
//! - **[`SmoothStreamConfig`]**: runtime-adjustable reveal settings
//! - **[`FrameTicker`]**: async frame source that drives a buffer
//!
//! ## Example
//!
//! ```ignore
//! use smoothchat_streaming::{FrameTicker, SmoothBuffer, SmoothStreamConfig};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(|displayed: &str, _delta: &str| println!("{displayed}"));
//! let mut buffer = SmoothBuffer::new(SmoothStreamConfig::default().into_shared(), sink);
//!
//! buffer.add_content("Hello");
//! buffer.add_content("Hello, world!");
//!
//! FrameTicker::default().drive(&mut buffer).await;
//! buffer.complete();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod pattern;
pub mod speed;
pub mod ticker;

// Re-exports
pub use buffer::{BufferSnapshot, BufferState, RevealSink, SmoothBuffer};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{SharedStreamConfig, SmoothStreamConfig, SmoothStreamConfigPatch, Smoothness};
pub use error::{StreamError, StreamResult};
pub use pattern::{GenerationPattern, PatternDetector};
pub use speed::{inside_code_fence, speed, speed_with_rng, STATUS_EMOJI};
pub use ticker::{FrameTicker, DEFAULT_FRAME_PERIOD, MIN_FRAME_PERIOD};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BufferSnapshot, BufferState, FrameTicker, GenerationPattern, RevealSink, SmoothBuffer,
        SmoothStreamConfig, SmoothStreamConfigPatch, Smoothness, StreamError, StreamResult,
    };
}
