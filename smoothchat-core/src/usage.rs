//! Usage statistics for a chat turn.
//!
//! The counts are character-based estimates, not tokenizer output. The
//! remote agent does not report real token usage, so the turn reports the
//! character length of the prompt and of the final content instead.

use serde::{Deserialize, Serialize};

use crate::messages::ChatMessage;

/// Usage reported with a finished turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnUsage {
    /// Estimated prompt tokens (characters of all input messages).
    pub prompt_tokens: u64,
    /// Estimated completion tokens (characters of the final content).
    pub completion_tokens: u64,
    /// Prompt plus completion.
    pub total_tokens: u64,
    /// Latency and throughput placeholders.
    #[serde(default)]
    pub extra: UsageExtra,
}

/// Latency/throughput fields kept for UI compatibility.
///
/// Always zero: the agent path does not measure them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageExtra {
    /// Time to first token, in milliseconds.
    pub first_token_latency_ms: u64,
    /// Prefill throughput, tokens per second.
    pub prefill_tokens_per_s: f64,
    /// Decode throughput, tokens per second.
    pub decode_tokens_per_s: f64,
}

impl TurnUsage {
    /// Create usage from prompt and completion counts.
    #[must_use]
    pub fn with_tokens(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            extra: UsageExtra::default(),
        }
    }

    /// Estimate usage from the input messages and the final content.
    #[must_use]
    pub fn estimate(messages: &[ChatMessage], completion: &str) -> Self {
        let prompt = messages.iter().map(|m| m.char_len() as u64).sum();
        Self::with_tokens(prompt, completion.chars().count() as u64)
    }
}
