//! Adaptive reveal speed.
//!
//! The speed depends only on the text right after the cursor and on whether
//! the cursor sits inside a fenced code block. Code is revealed slowly so it
//! can be read as it appears; whitespace, punctuation and markdown syntax are
//! skipped over quickly.

use crate::config::SmoothStreamConfig;
use rand::Rng;

/// Emoji that start status banners.
pub const STATUS_EMOJI: &[&str] = &["✅", "❌", "⚡", "🔧", "⏳", "📊", "💭", "🧠", "📋", "🔍"];

const CODE_FACTOR: f64 = 0.4;
const EMOJI_FACTOR: f64 = 1.8;
const WHITESPACE_FACTOR: f64 = 3.0;
const PUNCTUATION_FACTOR: f64 = 1.5;
const MARKDOWN_FACTOR: f64 = 2.0;

const FENCE: &str = "```";

fn is_terminal_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':')
}

fn is_markdown_syntax(c: char) -> bool {
    matches!(c, '*' | '_' | '`' | '#' | '-' | '[' | ']' | '(' | ')')
}

/// Byte offset of the `cursor`-th character, clamped to the end.
pub(crate) fn byte_offset(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Check whether `cursor` (in characters) lies inside an open code fence.
#[must_use]
pub fn inside_code_fence(text: &str, cursor: usize) -> bool {
    let before = &text[..byte_offset(text, cursor)];
    before.matches(FENCE).count() % 2 == 1
}

/// Characters per second to reveal at `cursor` (in characters).
pub fn speed(text: &str, cursor: usize, config: &SmoothStreamConfig) -> f64 {
    speed_with_rng(text, cursor, config, &mut rand::thread_rng())
}

/// [`speed`] with an explicit random source for the plain-prose jitter.
pub fn speed_with_rng<R: Rng + ?Sized>(
    text: &str,
    cursor: usize,
    config: &SmoothStreamConfig,
    rng: &mut R,
) -> f64 {
    let base = config.base_speed;
    if !config.adaptive_speed {
        return base;
    }

    if inside_code_fence(text, cursor) {
        return base * CODE_FACTOR;
    }

    let upcoming = &text[byte_offset(text, cursor)..];
    if STATUS_EMOJI.iter().any(|emoji| upcoming.starts_with(emoji)) {
        return base * EMOJI_FACTOR;
    }

    match upcoming.chars().next() {
        Some(c) if c.is_whitespace() => base * WHITESPACE_FACTOR,
        Some(c) if is_terminal_punctuation(c) => base * PUNCTUATION_FACTOR,
        Some(c) if is_markdown_syntax(c) => base * MARKDOWN_FACTOR,
        _ => base * rng.gen_range(0.8..1.2),
    }
}
