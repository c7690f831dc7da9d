//! Agent chat client.
//!
//! [`AgentClient`] runs one turn at a time per chat session. Starting a new
//! turn aborts the one in flight, and every turn gets a fresh cancellation
//! token so an abort never leaks into the next turn.

use crate::connection::AgentConnection;
use crate::credentials::{CredentialStore, InMemoryCredentials};
use crate::observer::ChatObserver;
use crate::turn::{Turn, TurnOutcome};
use parking_lot::Mutex;
use smoothchat_core::{generate_turn_id, ChatMessage};
use smoothchat_retries::{ErrorClassifier, RetryCondition, RetryConfig, SubstringClassifier};
use smoothchat_streaming::{
    Clock, SharedStreamConfig, SmoothStreamConfig, SmoothStreamConfigPatch, StreamResult,
    TokioClock, DEFAULT_FRAME_PERIOD, MIN_FRAME_PERIOD,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Stop reason reported with a finished turn.
pub const DEFAULT_STOP_REASON: &str = "stop";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct AgentClientConfig {
    /// Remote agent identifier.
    pub agent_id: String,
    /// Retry behavior for opening the stream. The retry condition is
    /// derived from the client's classifier.
    pub retry: RetryConfig,
    /// Frame tick cadence.
    pub frame_interval: Duration,
    /// Stop reason passed to `on_finish`.
    pub stop_reason: String,
}

impl AgentClientConfig {
    /// Create a config for `agent_id` with defaults.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            retry: RetryConfig::default(),
            frame_interval: DEFAULT_FRAME_PERIOD,
            stop_reason: DEFAULT_STOP_REASON.to_string(),
        }
    }

    /// Set the retry config.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the frame tick cadence, at least [`MIN_FRAME_PERIOD`].
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval.max(MIN_FRAME_PERIOD);
        self
    }

    /// Set the stop reason label.
    pub fn stop_reason(mut self, reason: impl Into<String>) -> Self {
        self.stop_reason = reason.into();
        self
    }
}

struct ActiveTurn {
    turn_id: String,
    cancel: CancellationToken,
}

/// Chat client for a remote agent.
pub struct AgentClient {
    config: AgentClientConfig,
    connection: Arc<dyn AgentConnection>,
    credentials: Arc<dyn CredentialStore>,
    classifier: Arc<dyn ErrorClassifier>,
    stream_config: SharedStreamConfig,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<ActiveTurn>>,
}

impl AgentClient {
    /// Create a client over `connection`.
    pub fn new(config: AgentClientConfig, connection: Arc<dyn AgentConnection>) -> Self {
        Self {
            config,
            connection,
            credentials: Arc::new(InMemoryCredentials::empty()),
            classifier: Arc::new(SubstringClassifier::default()),
            stream_config: SmoothStreamConfig::default().into_shared(),
            clock: Arc::new(TokioClock),
            active: Mutex::new(None),
        }
    }

    /// Use `credentials`; cleared when the agent rejects them.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Use a different error classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Start from `config` instead of the default reveal settings.
    pub fn with_stream_config(self, config: SmoothStreamConfig) -> Self {
        *self.stream_config.write() = config;
        self
    }

    /// Drive reveal timing from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The remote agent identifier.
    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    /// Merge `patch` into the live reveal settings.
    ///
    /// Takes effect on the next reveal tick, including for a turn in flight.
    /// An invalid result is rejected and the settings stay unchanged.
    pub fn configure_streaming(&self, patch: SmoothStreamConfigPatch) -> StreamResult<()> {
        let mut config = self.stream_config.write();
        let mut updated = config.clone();
        updated.apply(patch);
        updated.validate()?;
        *config = updated;
        debug!(config = ?*config, "Streaming config updated");
        Ok(())
    }

    /// Current reveal settings.
    pub fn streaming_config(&self) -> SmoothStreamConfig {
        self.stream_config.read().clone()
    }

    /// Whether a turn is in flight.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Abort the turn in flight, if any. Idempotent.
    pub fn abort(&self) {
        if let Some(turn) = self.active.lock().take() {
            debug!(turn_id = %turn.turn_id, "Aborting turn");
            turn.cancel.cancel();
        }
    }

    /// Run one turn for `messages`, reporting to `observer`.
    ///
    /// Aborts any turn already in flight first.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        observer: Arc<dyn ChatObserver>,
    ) -> TurnOutcome {
        let turn_id = generate_turn_id();
        let cancel = CancellationToken::new();

        if let Some(previous) = self.active.lock().replace(ActiveTurn {
            turn_id: turn_id.clone(),
            cancel: cancel.clone(),
        }) {
            debug!(turn_id = %previous.turn_id, "Aborting previous turn");
            previous.cancel.cancel();
        }

        let retry = self.config.retry.clone().retry_on(RetryCondition::from_classifier(
            Arc::clone(&self.classifier),
            self.config.agent_id.clone(),
        ));

        let turn = Turn {
            turn_id: turn_id.clone(),
            agent_id: self.config.agent_id.clone(),
            messages,
            connection: Arc::clone(&self.connection),
            retry,
            classifier: Arc::clone(&self.classifier),
            credentials: Arc::clone(&self.credentials),
            stream_config: Arc::clone(&self.stream_config),
            observer,
            clock: Arc::clone(&self.clock),
            frame_interval: self.config.frame_interval,
            stop_reason: self.config.stop_reason.clone(),
        };
        let outcome = turn.run(cancel).await;

        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|a| a.turn_id == turn_id) {
            *active = None;
        }
        outcome
    }

    /// Run [`chat`](Self::chat) on a new task.
    pub fn spawn_chat(
        self: &Arc<Self>,
        messages: Vec<ChatMessage>,
        observer: Arc<dyn ChatObserver>,
    ) -> JoinHandle<TurnOutcome> {
        let client = Arc::clone(self);
        tokio::spawn(async move { client.chat(messages, observer).await })
    }
}

impl fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentClient")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ScriptedConnection;
    use crate::observer::RecordingObserver;
    use pretty_assertions::assert_eq;
    use smoothchat_core::errors::LOGIN_AGAIN_MESSAGE;
    use smoothchat_core::markup::normalize;
    use smoothchat_core::StreamEvent;
    use smoothchat_retries::ErrorKind;
    use smoothchat_streaming::Smoothness;

    fn client(connection: Arc<ScriptedConnection>) -> AgentClient {
        AgentClient::new(AgentClientConfig::new("weather-bot"), connection)
    }

    fn hi() -> Vec<ChatMessage> {
        vec![ChatMessage::user("hi")]
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_frame_interval_still_streams() {
        let config = AgentClientConfig::new("weather-bot").frame_interval(Duration::ZERO);
        assert_eq!(config.frame_interval, MIN_FRAME_PERIOD);

        let mut config = config;
        config.frame_interval = Duration::ZERO;
        let conn = Arc::new(ScriptedConnection::new(vec![StreamEvent::text_chunk(
            "Hello!",
        )]));
        let observer = Arc::new(RecordingObserver::new());

        let outcome = AgentClient::new(config, conn)
            .chat(hi(), observer.clone())
            .await;

        assert!(outcome.is_finished());
        assert_eq!(observer.finishes().len(), 1);
        assert_eq!(observer.last_displayed().as_deref(), Some("Hello!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_hello() {
        let conn = Arc::new(ScriptedConnection::new(vec![
            StreamEvent::text_chunk("He"),
            StreamEvent::text_chunk("llo!"),
        ]));
        let observer = Arc::new(RecordingObserver::new());

        let outcome = client(conn).chat(hi(), observer.clone()).await;

        assert!(outcome.is_finished());
        let finishes = observer.finishes();
        assert_eq!(finishes.len(), 1);
        let (content, stop_reason, usage) = &finishes[0];
        assert_eq!(content, "Hello!");
        assert_eq!(stop_reason, "stop");
        assert_eq!(usage.completion_tokens, 6);
        assert_eq!(usage.prompt_tokens, 2);
        assert_eq!(usage.total_tokens, 8);
        assert!(observer.errors().is_empty());
        assert_eq!(observer.last_displayed().as_deref(), Some("Hello!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_passthrough() {
        let conn = Arc::new(ScriptedConnection::new(vec![
            StreamEvent::error("Unknown error from agent"),
            StreamEvent::text_chunk("never shown"),
        ]));
        let observer = Arc::new(RecordingObserver::new());

        let outcome = client(conn).chat(hi(), observer.clone()).await;

        assert_eq!(observer.errors(), vec!["Unknown error from agent".to_string()]);
        assert!(observer.finishes().is_empty());
        assert_eq!(
            outcome.error().map(|e| e.to_string()).as_deref(),
            Some("Unknown error from agent")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_is_three_attempts() {
        let conn = Arc::new(ScriptedConnection::new(vec![]).fail_times(10, "timeout"));
        let observer = Arc::new(RecordingObserver::new());

        let outcome = client(conn.clone()).chat(hi(), observer.clone()).await;

        assert_eq!(conn.call_count(), 3);
        assert!(matches!(
            outcome.error(),
            Some(smoothchat_core::ChatError::Connection { attempts: 3, .. })
        ));
        assert_eq!(observer.errors().len(), 1);
        assert!(observer.finishes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_stream() {
        let conn = Arc::new(
            ScriptedConnection::new(vec![StreamEvent::text_chunk("ok")])
                .fail_with("agent weather-bot not found"),
        );
        let observer = Arc::new(RecordingObserver::new());

        let outcome = client(conn.clone()).chat(hi(), observer.clone()).await;

        assert!(outcome.is_finished());
        assert_eq!(conn.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fatal_setup_error_is_not_retried() {
        let conn = Arc::new(ScriptedConnection::new(vec![]).fail_times(3, "bad request"));
        let observer = Arc::new(RecordingObserver::new());

        client(conn.clone()).chat(hi(), observer.clone()).await;

        assert_eq!(conn.call_count(), 1);
        assert_eq!(observer.errors().len(), 1);
        assert!(observer.errors()[0].contains("bad request"));
    }

    #[tokio::test]
    async fn test_authentication_error_clears_credentials() {
        let conn = Arc::new(ScriptedConnection::new(vec![]).fail_with("HTTP 401 Unauthorized"));
        let credentials = Arc::new(InMemoryCredentials::new("token"));
        let observer = Arc::new(RecordingObserver::new());

        let outcome = client(conn.clone())
            .with_credentials(credentials.clone())
            .chat(hi(), observer.clone())
            .await;

        assert!(credentials.load().is_none());
        assert_eq!(observer.errors(), vec![LOGIN_AGAIN_MESSAGE.to_string()]);
        assert!(outcome.error().is_some_and(|e| e.is_authentication()));
        assert_eq!(conn.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mid_stream_authentication_error() {
        let conn = Arc::new(ScriptedConnection::new(vec![StreamEvent::error(
            "Authentication expired",
        )]));
        let credentials = Arc::new(InMemoryCredentials::new("token"));
        let observer = Arc::new(RecordingObserver::new());

        client(conn)
            .with_credentials(credentials.clone())
            .chat(hi(), observer.clone())
            .await;

        assert!(credentials.load().is_none());
        assert_eq!(observer.errors(), vec![LOGIN_AGAIN_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_injected_classifier() {
        let conn = Arc::new(ScriptedConnection::new(vec![]).fail_times(5, "flaky"));
        let observer = Arc::new(RecordingObserver::new());
        let classifier = |_: &str, _: &str| ErrorKind::Fatal;

        client(conn.clone())
            .with_classifier(Arc::new(classifier))
            .chat(hi(), observer)
            .await;

        assert_eq!(conn.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retarget_end_to_end() {
        let conn = Arc::new(ScriptedConnection::new(vec![
            StreamEvent::text_chunk("hello <return"),
            StreamEvent::text_chunk("ToUser>world"),
        ]));
        let observer = Arc::new(RecordingObserver::new());

        client(conn).chat(hi(), observer.clone()).await;

        let expected = normalize("<returnToUser>world");
        assert_eq!(observer.finishes()[0].0, expected);
        assert_eq!(observer.last_displayed(), Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_function_summary_appended_on_finish() {
        let conn = Arc::new(ScriptedConnection::new(vec![
            StreamEvent::function_call("runCode", "c1", r#"{"code":"1+1"}"#),
            StreamEvent::function_call_output("c1", "{\"x\":1}"),
            StreamEvent::text_chunk("Done."),
        ]));
        let observer = Arc::new(RecordingObserver::new());

        client(conn).chat(hi(), observer.clone()).await;

        let (content, _, usage) = &observer.finishes()[0];
        assert!(content.contains("✅ **Completed `runCode`**"));
        assert!(!content.contains("Running `runCode`"));
        assert!(content.contains("\"x\": 1"));
        assert!(content.contains("<details>"));
        assert!(content.contains("```javascript\n1+1\n```"));
        assert!((usage.completion_tokens as usize) < content.chars().count());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stream_does_not_finish() {
        let conn = Arc::new(ScriptedConnection::new(vec![]));
        let observer = Arc::new(RecordingObserver::new());

        let outcome = client(conn).chat(hi(), observer.clone()).await;

        assert!(matches!(outcome, TurnOutcome::Empty));
        assert!(observer.finishes().is_empty());
        assert!(observer.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_is_silent() {
        let conn = Arc::new(
            ScriptedConnection::new(vec![
                StreamEvent::text_chunk("one "),
                StreamEvent::text_chunk("two "),
                StreamEvent::text_chunk("three"),
            ])
            .with_delay(Duration::from_millis(100)),
        );
        let observer = Arc::new(RecordingObserver::new());
        let client = Arc::new(client(conn));

        let handle = client.spawn_chat(hi(), observer.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(client.is_active());
        client.abort();
        client.abort();

        let outcome = handle.await.unwrap();
        assert!(outcome.is_aborted());
        assert!(observer.finishes().is_empty());
        assert!(observer.errors().is_empty());
        assert!(!client.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_backoff() {
        let conn = Arc::new(ScriptedConnection::new(vec![]).fail_times(10, "timeout"));
        let observer = Arc::new(RecordingObserver::new());
        let client = Arc::new(client(conn.clone()));

        let handle = client.spawn_chat(hi(), observer.clone());
        tokio::time::sleep(Duration::from_millis(500)).await;
        client.abort();

        assert!(handle.await.unwrap().is_aborted());
        assert_eq!(conn.call_count(), 1);
        assert!(observer.errors().is_empty());
    }

    #[tokio::test]
    async fn test_abort_without_turn_is_noop() {
        let client = client(Arc::new(ScriptedConnection::new(vec![])));
        client.abort();
        assert!(!client.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_turn_aborts_previous() {
        let conn = Arc::new(
            ScriptedConnection::new(vec![StreamEvent::text_chunk("slow")])
                .with_delay(Duration::from_millis(200)),
        );
        let first_observer = Arc::new(RecordingObserver::new());
        let second_observer = Arc::new(RecordingObserver::new());
        let client = Arc::new(client(conn));

        let first = client.spawn_chat(hi(), first_observer.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = client.chat(hi(), second_observer.clone()).await;

        assert!(first.await.unwrap().is_aborted());
        assert!(first_observer.finishes().is_empty());
        assert!(second.is_finished());
        assert_eq!(second_observer.finishes().len(), 1);
        assert!(!client.is_active());
    }

    #[tokio::test]
    async fn test_configure_streaming() {
        let client = client(Arc::new(ScriptedConnection::new(vec![])));

        client
            .configure_streaming(
                SmoothStreamConfigPatch::new()
                    .base_speed(120.0)
                    .smoothness(Smoothness::High),
            )
            .unwrap();

        let config = client.streaming_config();
        assert_eq!(config.base_speed, 120.0);
        assert_eq!(config.smoothness, Smoothness::High);
        assert!(config.enabled);

        assert!(client
            .configure_streaming(SmoothStreamConfigPatch::new().base_speed(0.0))
            .is_err());
        assert_eq!(client.streaming_config().base_speed, 120.0);
    }
}
