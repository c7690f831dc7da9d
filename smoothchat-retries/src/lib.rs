//! # smoothchat-retries
//!
//! Bounded retries, failure classification and cooperative cancellation.
//!
//! Opening a chat stream can fail transiently. This crate wraps the call in
//! a bounded retry loop that stops early when the turn is aborted.
//!
//! ## Core Concepts
//!
//! - **[`RetryConfig`]**: attempt bound, wait strategy and retry condition
//! - **[`WaitStrategy`]**: how long to wait between attempts
//! - **[`ErrorClassifier`]**: maps failure messages to an [`ErrorKind`]
//! - **[`with_retry`]**: run an operation with retries under a [`CancellationToken`]
//!
//! ## Example
//!
//! ```ignore
//! use smoothchat_retries::{with_retry, CancellationToken, RetryConfig};
//!
//! let token = CancellationToken::new();
//! let result = with_retry(&RetryConfig::default(), &token, || async {
//!     Ok::<_, smoothchat_core::TransportError>("connected")
//! }).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod classify;
pub mod config;
pub mod error;
pub mod executor;

// Re-exports
pub use classify::{ErrorClassifier, ErrorKind, SubstringClassifier};
pub use config::{RetryCondition, RetryConfig, WaitStrategy};
pub use error::{RetryError, RetryResult};
pub use executor::{with_retry, with_retry_state, AttemptInfo, RetryState};
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        with_retry, CancellationToken, ErrorClassifier, ErrorKind, RetryConfig,
        RetryError, RetryResult, WaitStrategy,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let config = RetryConfig::new().max_attempts(5);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(
            SubstringClassifier::new().classify("timeout", "a"),
            ErrorKind::Transient
        );
    }
}
