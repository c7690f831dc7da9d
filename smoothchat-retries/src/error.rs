//! Retry error types.

use smoothchat_core::TransportError;
use thiserror::Error;

/// Why a retried operation gave up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// The failure was not worth retrying.
    #[error("{error}")]
    NotRetryable {
        /// The failure.
        error: TransportError,
        /// Attempts made, including the failing one.
        attempts: u32,
    },

    /// Every attempt failed.
    #[error("Retries exhausted after {attempts} attempts: {error}")]
    Exhausted {
        /// The last failure.
        error: TransportError,
        /// Attempts made.
        attempts: u32,
    },

    /// The cancellation token fired.
    #[error("Cancelled after {attempts} attempts")]
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl RetryError {
    /// Number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::NotRetryable { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The last transport failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&TransportError> {
        match self {
            Self::NotRetryable { error, .. } | Self::Exhausted { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for retry operations.
pub type RetryResult<T> = Result<T, RetryError>;
