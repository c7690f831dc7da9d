//! One chat turn, from opening the stream to the terminal callback.
//!
//! A turn moves through `AwaitingStream` (the bounded retry loop), then
//! `Consuming`, and ends `Finished`, `Failed` or `Aborted`. Events, frame
//! ticks and cancellation are multiplexed on a single task, so the turn
//! state needs no locking.

use crate::connection::{AgentConnection, EventStream};
use crate::credentials::CredentialStore;
use crate::interpreter::Interpreter;
use crate::observer::ChatObserver;
use futures::StreamExt;
use smoothchat_core::{ChatError, ChatMessage, TurnUsage};
use smoothchat_retries::{with_retry, ErrorClassifier, ErrorKind, RetryConfig, RetryError};
use smoothchat_streaming::{Clock, FrameTicker, SharedStreamConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The stream ended and `on_finish` was called.
    Finished {
        /// Final normalized content.
        content: String,
        /// Usage estimate.
        usage: TurnUsage,
    },
    /// The stream ended without content; no callback fired.
    Empty,
    /// The turn failed and `on_error` was called.
    Failed(ChatError),
    /// The turn was aborted; no terminal callback fired.
    Aborted,
}

impl TurnOutcome {
    /// Whether the turn finished with content.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    /// Whether the turn was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// The failure, if the turn failed.
    pub fn error(&self) -> Option<&ChatError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Everything one turn needs, handed over by the client.
pub(crate) struct Turn {
    pub(crate) turn_id: String,
    pub(crate) agent_id: String,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) connection: Arc<dyn AgentConnection>,
    pub(crate) retry: RetryConfig,
    pub(crate) classifier: Arc<dyn ErrorClassifier>,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) stream_config: SharedStreamConfig,
    pub(crate) observer: Arc<dyn ChatObserver>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) frame_interval: Duration,
    pub(crate) stop_reason: String,
}

impl Turn {
    /// Run the turn to its end.
    pub(crate) async fn run(self, cancel: CancellationToken) -> TurnOutcome {
        info!(turn_id = %self.turn_id, agent_id = %self.agent_id, "Turn started");

        let mut interpreter =
            Interpreter::new(Arc::clone(&self.stream_config), Arc::clone(&self.observer))
                .with_clock(Arc::clone(&self.clock));

        let stream = match self.open_stream(&cancel).await {
            Ok(stream) => stream,
            Err(RetryError::Cancelled { .. }) => return self.abort(&mut interpreter),
            Err(RetryError::NotRetryable { error, attempts })
            | Err(RetryError::Exhausted { error, attempts }) => {
                let err = self.classify(error.message, |message| {
                    ChatError::connection(message, attempts)
                });
                return self.fail(&mut interpreter, &cancel, err);
            }
        };

        self.consume(stream, &mut interpreter, &cancel).await
    }

    async fn open_stream(&self, cancel: &CancellationToken) -> Result<EventStream, RetryError> {
        let connection = &self.connection;
        let agent_id = self.agent_id.as_str();
        let messages = self.messages.as_slice();
        with_retry(&self.retry, cancel, move || {
            connection.stream_chat(agent_id, messages)
        })
        .await
    }

    async fn consume(
        &self,
        mut stream: EventStream,
        interpreter: &mut Interpreter,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let mut ticker = FrameTicker::new(self.frame_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.abort(interpreter),
                next = stream.next() => match next {
                    Some(Ok(event)) => {
                        if cancel.is_cancelled() {
                            return self.abort(interpreter);
                        }
                        debug!(turn_id = %self.turn_id, kind = %event.kind(), "Stream event");
                        if let Err(message) = interpreter.handle(event) {
                            let err = self.classify(message, ChatError::Agent);
                            return self.fail(interpreter, cancel, err);
                        }
                    }
                    Some(Err(error)) => {
                        let err = self.classify(error.message, ChatError::Agent);
                        return self.fail(interpreter, cancel, err);
                    }
                    None => break,
                },
                _ = ticker.tick(), if interpreter.is_animating() => {
                    interpreter.tick();
                }
            }
        }

        if cancel.is_cancelled() {
            return self.abort(interpreter);
        }

        let (content, usage) = interpreter.finish(&self.messages);
        if content.is_empty() {
            info!(turn_id = %self.turn_id, "Turn finished without content");
            return TurnOutcome::Empty;
        }

        info!(
            turn_id = %self.turn_id,
            completion_tokens = usage.completion_tokens,
            functions = interpreter.functions().len(),
            "Turn finished"
        );
        self.observer.on_finish(&content, &self.stop_reason, &usage);
        TurnOutcome::Finished { content, usage }
    }

    /// Map a failure message to the error surfaced to the UI.
    ///
    /// Authentication failures clear stored credentials first; everything
    /// else goes through `fallback` unchanged.
    fn classify(&self, message: String, fallback: impl FnOnce(String) -> ChatError) -> ChatError {
        match self.classifier.classify(&message, &self.agent_id) {
            ErrorKind::Authentication => {
                warn!(turn_id = %self.turn_id, "Agent rejected credentials, clearing them");
                self.credentials.clear();
                ChatError::authentication(message)
            }
            ErrorKind::Transient | ErrorKind::Fatal => fallback(message),
        }
    }

    fn fail(
        &self,
        interpreter: &mut Interpreter,
        cancel: &CancellationToken,
        err: ChatError,
    ) -> TurnOutcome {
        interpreter.stop();
        if cancel.is_cancelled() {
            debug!(turn_id = %self.turn_id, "Dropping error of an aborted turn");
            return TurnOutcome::Aborted;
        }
        warn!(turn_id = %self.turn_id, error = %err, "Turn failed");
        self.observer.on_error(&err);
        TurnOutcome::Failed(err)
    }

    fn abort(&self, interpreter: &mut Interpreter) -> TurnOutcome {
        interpreter.stop();
        info!(turn_id = %self.turn_id, "Turn aborted");
        TurnOutcome::Aborted
    }
}
