//! Streaming call providers.
//!
//! [`AgentConnection`] is the seam to the RPC transport: given an agent id
//! and the conversation, it opens a stream of [`StreamEvent`]s.
//! [`ConnectionManager`] caches one underlying connection and shares a
//! single in-flight creation between concurrent callers.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex as SyncMutex;
use smoothchat_core::{ChatMessage, StreamEvent, TransportError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Ordered events of one streaming call. An `Err` item ends the turn like
/// an [`StreamEvent::Error`].
pub type EventStream = BoxStream<'static, Result<StreamEvent, TransportError>>;

/// Opens streaming chat calls against a remote agent.
#[async_trait]
pub trait AgentConnection: Send + Sync {
    /// Open a streaming call for `messages` on `agent_id`.
    async fn stream_chat(
        &self,
        agent_id: &str,
        messages: &[ChatMessage],
    ) -> Result<EventStream, TransportError>;
}

#[async_trait]
impl<T: AgentConnection + ?Sized> AgentConnection for Arc<T> {
    async fn stream_chat(
        &self,
        agent_id: &str,
        messages: &[ChatMessage],
    ) -> Result<EventStream, TransportError> {
        (**self).stream_chat(agent_id, messages).await
    }
}

/// Establishes underlying connections for a [`ConnectionManager`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// The connection type produced.
    type Connection: AgentConnection + 'static;

    /// Establish a new connection.
    async fn connect(&self) -> Result<Self::Connection, TransportError>;
}

/// Caches one connection with get-or-create semantics.
///
/// The cache lock is held while connecting, so concurrent callers wait for
/// the same creation instead of racing their own.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    cached: Mutex<Option<Arc<C::Connection>>>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager with nothing cached.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            cached: Mutex::new(None),
        }
    }

    /// Get the cached connection or create one.
    pub async fn get(&self) -> Result<Arc<C::Connection>, TransportError> {
        let mut cached = self.cached.lock().await;
        if let Some(connection) = cached.as_ref() {
            return Ok(Arc::clone(connection));
        }

        debug!("Establishing agent connection");
        let connection = Arc::new(self.connector.connect().await?);
        *cached = Some(Arc::clone(&connection));
        info!("Agent connection established");
        Ok(connection)
    }

    /// Drop the cached connection.
    pub async fn reset(&self) {
        if self.cached.lock().await.take().is_some() {
            debug!("Agent connection reset");
        }
    }

    /// Whether a connection is cached.
    pub async fn is_connected(&self) -> bool {
        self.cached.lock().await.is_some()
    }
}

#[async_trait]
impl<C: Connector> AgentConnection for ConnectionManager<C> {
    async fn stream_chat(
        &self,
        agent_id: &str,
        messages: &[ChatMessage],
    ) -> Result<EventStream, TransportError> {
        let connection = self.get().await?;
        match connection.stream_chat(agent_id, messages).await {
            Ok(stream) => Ok(stream),
            Err(err) => {
                // The next attempt reconnects from scratch.
                self.reset().await;
                Err(err)
            }
        }
    }
}

/// Plays back a fixed script of events.
///
/// Every call first consumes one queued failure, if any, then yields the
/// script. Used by demos and tests.
#[derive(Default)]
pub struct ScriptedConnection {
    events: Vec<StreamEvent>,
    failures: SyncMutex<VecDeque<TransportError>>,
    delay: Option<Duration>,
    calls: SyncMutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedConnection {
    /// Yield `events` on every call.
    pub fn new(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Fail the next call with `message`. Failures queue up in order.
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        self.failures.lock().push_back(TransportError::new(message));
        self
    }

    /// Fail the next `times` calls with `message`.
    pub fn fail_times(self, times: usize, message: &str) -> Self {
        (0..times).fold(self, |conn, _| conn.fail_with(message))
    }

    /// Sleep for `delay` before each event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `stream_chat` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Messages passed to each call.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AgentConnection for ScriptedConnection {
    async fn stream_chat(
        &self,
        _agent_id: &str,
        messages: &[ChatMessage],
    ) -> Result<EventStream, TransportError> {
        self.calls.lock().push(messages.to_vec());
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }

        let events = self.events.clone();
        match self.delay {
            Some(delay) => Ok(stream::iter(events)
                .then(move |event| async move {
                    tokio::time::sleep(delay).await;
                    Ok(event)
                })
                .boxed()),
            None => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConnector {
        connects: Arc<AtomicUsize>,
        fail_streams: bool,
    }

    struct FlakyConnection {
        fail: bool,
    }

    #[async_trait]
    impl AgentConnection for FlakyConnection {
        async fn stream_chat(
            &self,
            _agent_id: &str,
            _messages: &[ChatMessage],
        ) -> Result<EventStream, TransportError> {
            if self.fail {
                Err(TransportError::new("socket closed"))
            } else {
                Ok(stream::iter(vec![Ok(StreamEvent::text_chunk("ok"))]).boxed())
            }
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Connection = FlakyConnection;

        async fn connect(&self) -> Result<FlakyConnection, TransportError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(FlakyConnection {
                fail: self.fail_streams,
            })
        }
    }

    fn manager(fail_streams: bool) -> (Arc<ConnectionManager<CountingConnector>>, Arc<AtomicUsize>) {
        let connects = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(CountingConnector {
            connects: connects.clone(),
            fail_streams,
        });
        (Arc::new(manager), connects)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_connection() {
        let (manager, connects) = manager(false);

        let (a, b) = tokio::join!(manager.get(), manager.get());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_stream_resets_cache() {
        let (manager, connects) = manager(true);

        assert!(manager.stream_chat("agent", &[]).await.is_err());
        assert!(!manager.is_connected().await);
        assert!(manager.stream_chat("agent", &[]).await.is_err());
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_successful_stream_keeps_cache() {
        let (manager, connects) = manager(false);

        let events: Vec<_> = manager
            .stream_chat("agent", &[])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(events, vec![Ok(StreamEvent::text_chunk("ok"))]);
        assert!(manager.is_connected().await);

        manager.stream_chat("agent", &[]).await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        manager.reset().await;
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn test_scripted_connection_fails_then_plays() {
        let conn = ScriptedConnection::new(vec![StreamEvent::text_chunk("hi")])
            .fail_times(2, "timeout");

        assert!(conn.stream_chat("a", &[]).await.is_err());
        assert!(conn.stream_chat("a", &[]).await.is_err());
        let events: Vec<_> = conn
            .stream_chat("a", &[ChatMessage::user("x")])
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events, vec![Ok(StreamEvent::text_chunk("hi"))]);
        assert_eq!(conn.call_count(), 3);
        assert_eq!(conn.calls()[2], vec![ChatMessage::user("x")]);
    }
}
