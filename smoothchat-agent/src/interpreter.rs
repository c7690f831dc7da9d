//! Protocol event interpreter.
//!
//! [`Interpreter`] owns the accumulated content of one turn and turns each
//! [`StreamEvent`] into a content mutation plus a push to the reveal buffer.
//! It is synchronous; the async turn loop in [`crate::turn`] feeds it events
//! and frame ticks.
//!
//! Text is always normalized before it reaches the buffer. When the
//! return-to-user tag shows up after some earlier content, everything before
//! the tag is dropped and the buffer is hard-reset to the remainder.

use crate::functions::{complete_banner, format_result, started_banner, FunctionLog};
use crate::observer::{ChatObserver, ObserverSink};
use smoothchat_core::markup::{find_return_to_user, normalize};
use smoothchat_core::{ChatMessage, EventKind, StreamEvent, TurnUsage};
use smoothchat_streaming::{Clock, SharedStreamConfig, SmoothBuffer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-turn event state machine.
pub struct Interpreter {
    config: SharedStreamConfig,
    buffer: SmoothBuffer,
    observer: Arc<dyn ChatObserver>,
    content: String,
    functions: FunctionLog,
}

impl Interpreter {
    /// Create an interpreter revealing into `observer`.
    pub fn new(config: SharedStreamConfig, observer: Arc<dyn ChatObserver>) -> Self {
        let sink = Arc::new(ObserverSink::new(Arc::clone(&observer)));
        Self {
            buffer: SmoothBuffer::new(Arc::clone(&config), sink),
            config,
            observer,
            content: String::new(),
            functions: FunctionLog::new(),
        }
    }

    /// Drive the reveal buffer from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.buffer = self.buffer.with_clock(clock);
        self
    }

    /// Seed the reveal jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.buffer = self.buffer.with_seed(seed);
        self
    }

    /// Accumulated, unnormalized content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The reveal buffer.
    pub fn buffer(&self) -> &SmoothBuffer {
        &self.buffer
    }

    /// Function executions so far.
    pub fn functions(&self) -> &FunctionLog {
        &self.functions
    }

    /// Whether the reveal loop wants frame ticks.
    pub fn is_animating(&self) -> bool {
        self.buffer.is_animating()
    }

    /// Advance the reveal by one frame.
    pub fn tick(&mut self) -> bool {
        self.buffer.tick()
    }

    /// Apply one event.
    ///
    /// Returns the agent's message for an `Error` event, which ends the
    /// turn. The buffer is stopped before returning it.
    pub fn handle(&mut self, event: StreamEvent) -> Result<(), String> {
        match event {
            StreamEvent::Error { message } => {
                self.buffer.stop();
                return Err(message);
            }
            StreamEvent::TextChunk { content } => {
                let mut next = std::mem::take(&mut self.content);
                next.push_str(&content);
                self.apply_text(next, EventKind::TextChunk);
            }
            StreamEvent::TextFull { content } => {
                self.apply_text(content, EventKind::TextFull);
            }
            StreamEvent::FunctionCall {
                name,
                call_id,
                arguments,
            } => {
                debug!(%name, %call_id, "Function call started");
                self.content.push_str(&started_banner(&name, &call_id));
                self.push(EventKind::FunctionCall);
                self.functions.start(&name, &arguments, &call_id);
                self.observer.on_function_call(&name, &arguments, &call_id);
            }
            StreamEvent::FunctionCallOutput { call_id, content } => {
                match self.functions.complete(&call_id, &content) {
                    Some(record) => {
                        let name = record.name.clone();
                        if !complete_banner(&mut self.content, &name, &call_id) {
                            debug!(%name, %call_id, "Running banner already gone");
                        }
                    }
                    None => warn!(%call_id, "Function output without a matching call"),
                }
                self.content.push_str(&format_result(&content));
                self.push(EventKind::FunctionCallOutput);
                self.observer.on_function_output(&content, &call_id);
            }
            StreamEvent::NewCompletionRound { completion_id } => {
                debug!(%completion_id, "New completion round");
                self.push(EventKind::NewCompletionRound);
                self.observer.on_new_completion(&completion_id);
            }
        }
        Ok(())
    }

    /// Finish the turn.
    ///
    /// Usage is estimated before the function summary is appended. The
    /// returned content is the normalized transcript including the summary,
    /// already snapped into the buffer.
    pub fn finish(&mut self, messages: &[ChatMessage]) -> (String, TurnUsage) {
        let usage = TurnUsage::estimate(messages, &normalize(&self.content));
        if let Some(summary) = self.functions.summary() {
            self.content.push_str(&summary);
        }

        let content = normalize(&self.content);
        self.buffer.add_content(content.clone());
        self.buffer.complete();
        (content, usage)
    }

    /// Halt and clear the reveal buffer.
    pub fn stop(&mut self) {
        self.buffer.stop();
    }

    fn apply_text(&mut self, next: String, kind: EventKind) {
        match find_return_to_user(&next) {
            Some(at) if at > 0 => {
                debug!(dropped_bytes = at, "Retargeting at return-to-user tag");
                self.content = next[at..].to_string();
                self.buffer.replace_content(normalize(&self.content));
            }
            _ => {
                self.content = next;
                self.push(kind);
            }
        }
    }

    fn push(&mut self, kind: EventKind) {
        let normalized = normalize(&self.content);
        if self.config.read().is_instant(kind) {
            self.buffer.add_immediate_content(normalized);
        } else {
            self.buffer.add_content(normalized);
        }
    }
}
