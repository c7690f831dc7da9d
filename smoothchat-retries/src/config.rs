//! Retry configuration.

use crate::classify::{ErrorClassifier, ErrorKind, SubstringClassifier};
use smoothchat_core::TransportError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Wait strategy.
    pub wait: WaitStrategy,
    /// Retry condition.
    pub retry_on: RetryCondition,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait: WaitStrategy::Linear {
                initial: Duration::from_millis(1000),
                increment: Duration::from_millis(1000),
                max: Duration::from_secs(30),
            },
            retry_on: RetryCondition::default(),
        }
    }
}

impl RetryConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max attempts. Zero is treated as one.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the wait strategy.
    pub fn wait(mut self, strategy: WaitStrategy) -> Self {
        self.wait = strategy;
        self
    }

    /// Use fixed delay.
    pub fn fixed(mut self, delay: Duration) -> Self {
        self.wait = WaitStrategy::Fixed(delay);
        self
    }

    /// Use linear backoff.
    pub fn linear(mut self, initial: Duration, increment: Duration, max: Duration) -> Self {
        self.wait = WaitStrategy::Linear {
            initial,
            increment,
            max,
        };
        self
    }

    /// Set retry condition.
    pub fn retry_on(mut self, condition: RetryCondition) -> Self {
        self.retry_on = condition;
        self
    }

    /// Create config that never retries.
    pub fn no_retry() -> Self {
        Self::new().max_attempts(1)
    }

    /// Effective attempt bound.
    pub(crate) fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Strategy for waiting between attempts.
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// Fixed delay.
    Fixed(Duration),
    /// Linear backoff.
    Linear {
        /// Initial delay.
        initial: Duration,
        /// Increment per attempt.
        increment: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl WaitStrategy {
    /// Wait duration after failed attempt number `attempt` (1-indexed).
    pub fn calculate(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            WaitStrategy::Fixed(d) => *d,
            WaitStrategy::Linear {
                initial,
                increment,
                max,
            } => {
                let delay = *initial + *increment * (attempt - 1);
                delay.min(*max)
            }
        }
    }
}

type Predicate = Arc<dyn Fn(&TransportError) -> bool + Send + Sync>;

/// Decides whether a failed attempt is worth repeating.
#[derive(Clone)]
pub struct RetryCondition {
    predicate: Predicate,
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryCondition").finish_non_exhaustive()
    }
}

impl Default for RetryCondition {
    fn default() -> Self {
        Self::from_classifier(Arc::new(SubstringClassifier::default()), "")
    }
}

impl RetryCondition {
    /// Retry whenever `predicate` returns true.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&TransportError) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Retry every failure.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Never retry.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Retry failures that `classifier` considers transient for `agent_id`.
    pub fn from_classifier(classifier: Arc<dyn ErrorClassifier>, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        Self::new(move |error| {
            classifier.classify(error.message(), &agent_id) == ErrorKind::Transient
        })
    }

    /// Check if an error should be retried.
    pub fn should_retry(&self, error: &TransportError) -> bool {
        (self.predicate)(error)
    }
}
