//! Turn observers.
//!
//! The interpreter reports everything the chat UI needs through
//! [`ChatObserver`]. Every method has a no-op default, so an observer only
//! implements the callbacks it cares about and the interpreter calls all of
//! them unconditionally.

use parking_lot::Mutex;
use smoothchat_core::{ChatError, TurnUsage};
use smoothchat_streaming::RevealSink;
use std::sync::Arc;

/// Receives the visible effects of a chat turn.
pub trait ChatObserver: Send + Sync {
    /// Displayed content changed. `delta` is the part added since the last update.
    fn on_update(&self, _displayed: &str, _delta: &str) {}

    /// The turn finished. Called at most once per turn.
    fn on_finish(&self, _content: &str, _stop_reason: &str, _usage: &TurnUsage) {}

    /// The turn failed. Called at most once per turn, never for cancellation.
    fn on_error(&self, _error: &ChatError) {}

    /// A function call started.
    fn on_function_call(&self, _name: &str, _arguments: &str, _call_id: &str) {}

    /// A function call produced output.
    fn on_function_output(&self, _content: &str, _call_id: &str) {}

    /// A new completion round began.
    fn on_new_completion(&self, _completion_id: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ChatObserver for NoopObserver {}

/// A recorded observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    /// `on_update`.
    Update {
        /// Displayed content.
        displayed: String,
        /// Newly displayed part.
        delta: String,
    },
    /// `on_finish`.
    Finish {
        /// Final content.
        content: String,
        /// Stop reason label.
        stop_reason: String,
        /// Usage estimate.
        usage: TurnUsage,
    },
    /// `on_error`, with the displayable message.
    Error(String),
    /// `on_function_call`.
    FunctionCall {
        /// Function name.
        name: String,
        /// Raw arguments.
        arguments: String,
        /// Call identifier.
        call_id: String,
    },
    /// `on_function_output`.
    FunctionOutput {
        /// Raw output.
        content: String,
        /// Call identifier.
        call_id: String,
    },
    /// `on_new_completion`.
    NewCompletion(String),
}

/// Observer that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded callbacks.
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().clone()
    }

    /// Recorded `on_finish` calls as `(content, stop_reason, usage)`.
    pub fn finishes(&self) -> Vec<(String, String, TurnUsage)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObservedEvent::Finish {
                    content,
                    stop_reason,
                    usage,
                } => Some((content.clone(), stop_reason.clone(), usage.clone())),
                _ => None,
            })
            .collect()
    }

    /// Recorded `on_error` messages.
    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObservedEvent::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Displayed content of every `on_update`, in order.
    pub fn updates(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObservedEvent::Update { displayed, .. } => Some(displayed.clone()),
                _ => None,
            })
            .collect()
    }

    /// Displayed content of the latest `on_update`.
    pub fn last_displayed(&self) -> Option<String> {
        self.updates().pop()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn push(&self, event: ObservedEvent) {
        self.events.lock().push(event);
    }
}

impl ChatObserver for RecordingObserver {
    fn on_update(&self, displayed: &str, delta: &str) {
        self.push(ObservedEvent::Update {
            displayed: displayed.to_string(),
            delta: delta.to_string(),
        });
    }

    fn on_finish(&self, content: &str, stop_reason: &str, usage: &TurnUsage) {
        self.push(ObservedEvent::Finish {
            content: content.to_string(),
            stop_reason: stop_reason.to_string(),
            usage: usage.clone(),
        });
    }

    fn on_error(&self, error: &ChatError) {
        self.push(ObservedEvent::Error(error.user_message()));
    }

    fn on_function_call(&self, name: &str, arguments: &str, call_id: &str) {
        self.push(ObservedEvent::FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
            call_id: call_id.to_string(),
        });
    }

    fn on_function_output(&self, content: &str, call_id: &str) {
        self.push(ObservedEvent::FunctionOutput {
            content: content.to_string(),
            call_id: call_id.to_string(),
        });
    }

    fn on_new_completion(&self, completion_id: &str) {
        self.push(ObservedEvent::NewCompletion(completion_id.to_string()));
    }
}

/// Feeds reveal-buffer output into an observer's `on_update`.
pub struct ObserverSink {
    observer: Arc<dyn ChatObserver>,
}

impl ObserverSink {
    /// Wrap an observer.
    pub fn new(observer: Arc<dyn ChatObserver>) -> Self {
        Self { observer }
    }
}

impl RevealSink for ObserverSink {
    fn on_reveal(&self, displayed: &str, delta: &str) {
        self.observer.on_update(displayed, delta);
    }
}
