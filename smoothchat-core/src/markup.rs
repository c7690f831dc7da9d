//! Streaming-safe normalization of pseudo-HTML tags.
//!
//! Agents embed a few pseudo-HTML tags in their text: code tags such as
//! `<python>`, thought tags such as `<think>`, and the `<returnToUser>`
//! marker that introduces the final answer. This module rewrites them into
//! markdown the renderer understands.
//!
//! Text arrives incrementally, so a tag may be open without its closing tag
//! yet. An unterminated span is rendered *open*: a code fence without its
//! closing fence, a quote that runs to the end of the text. When the closing
//! tag arrives, the next normalization closes the block.
//!
//! # Example
//!
//! ```rust
//! use smoothchat_core::markup::normalize;
//!
//! assert_eq!(normalize("<python>print(1)"), "\n```python\nprint(1)");
//! assert_eq!(
//!     normalize("<python>print(1)</python>"),
//!     "\n```python\nprint(1)\n```\n"
//! );
//! ```

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Code tags and the fence language they map to.
pub const SCRIPT_TAGS: &[(&str, &str)] = &[
    ("python", "python"),
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("bash", "bash"),
    ("shell", "bash"),
    ("sql", "sql"),
];

/// Thought tags with their emoji and title.
pub const THOUGHT_TAGS: &[(&str, &str, &str)] = &[
    ("think", "💭", "Thinking"),
    ("thinking", "💭", "Thinking"),
    ("reasoning", "🧠", "Reasoning"),
    ("plan", "📋", "Plan"),
    ("reflection", "🔍", "Reflection"),
];

/// The tag that introduces the user-facing answer.
pub const RETURN_TO_USER_TAG: &str = "returnToUser";

/// Title rendered for the return-to-user section.
pub const RETURN_TO_USER_TITLE: &str = "### ✅ Final Answer";

/// How a matched span is rendered.
#[derive(Debug, Clone)]
enum Rendering {
    Fence { language: String },
    Quote { emoji: String, title: String },
    Section { title: String },
}

impl Rendering {
    fn render(&self, body: &str, closed: bool) -> String {
        match self {
            Rendering::Fence { language } => {
                let body = body.trim_start_matches(['\r', '\n']);
                if closed {
                    let body = body.trim_end_matches(['\r', '\n']);
                    format!("\n```{}\n{}\n```\n", language, body)
                } else {
                    format!("\n```{}\n{}", language, body)
                }
            }
            Rendering::Quote { emoji, title } => {
                let body = if closed { body.trim() } else { body.trim_start() };
                let mut out = format!("> {} **{}**\n>", emoji, title);
                for line in body.split('\n') {
                    out.push_str("\n> ");
                    out.push_str(line);
                }
                if closed {
                    out.push_str("\n\n");
                }
                out
            }
            Rendering::Section { title } => {
                let body = body.trim_start();
                if closed {
                    format!("{}\n\n{}\n", title, body.trim_end())
                } else {
                    format!("{}\n\n{}", title, body)
                }
            }
        }
    }
}

/// One tag name and how to render it.
#[derive(Debug, Clone)]
struct TagRule {
    pattern: Regex,
    rendering: Rendering,
}

impl TagRule {
    fn new(tag: &str, rendering: Rendering) -> Result<Self, regex::Error> {
        // Anchored to the nearest same-name close, or the end of the text.
        let name = regex::escape(tag);
        let pattern = Regex::new(&format!(
            r"(?is)<{name}(?:\s[^>]*)?>(.*?)(?:</{name}\s*>|\z)"
        ))?;
        Ok(Self { pattern, rendering })
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let whole = caps.get(0).map(|m| m.end()).unwrap_or_default();
                let (body, body_end) = caps
                    .get(1)
                    .map(|m| (m.as_str(), m.end()))
                    .unwrap_or(("", whole));
                self.rendering.render(body, whole > body_end)
            })
            .into_owned()
    }
}

/// Rewrites pseudo-HTML tags into markdown.
///
/// Passes run in a fixed order: code tags, thought tags, then the
/// return-to-user tag. Each pass sees the output of the previous one.
#[derive(Debug, Clone)]
pub struct MarkupNormalizer {
    script: Vec<TagRule>,
    thought: Vec<TagRule>,
    return_to_user: TagRule,
}

impl MarkupNormalizer {
    /// Build a normalizer from custom tag tables.
    pub fn new(
        script_tags: &[(&str, &str)],
        thought_tags: &[(&str, &str, &str)],
        return_tag: &str,
    ) -> Result<Self, regex::Error> {
        let script = script_tags
            .iter()
            .map(|(tag, language)| {
                TagRule::new(
                    tag,
                    Rendering::Fence {
                        language: (*language).to_string(),
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let thought = thought_tags
            .iter()
            .map(|(tag, emoji, title)| {
                TagRule::new(
                    tag,
                    Rendering::Quote {
                        emoji: (*emoji).to_string(),
                        title: (*title).to_string(),
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let return_to_user = TagRule::new(
            return_tag,
            Rendering::Section {
                title: RETURN_TO_USER_TITLE.to_string(),
            },
        )?;
        Ok(Self {
            script,
            thought,
            return_to_user,
        })
    }

    /// Run every pass once.
    fn round(&self, text: &str) -> String {
        let text = self
            .script
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc));
        let text = self.thought.iter().fold(text, |acc, rule| rule.apply(&acc));
        self.return_to_user.apply(&text)
    }

    /// Normalize `text`.
    ///
    /// Rounds repeat until the text stops changing, so the result is a fixed
    /// point and normalizing it again is a no-op. Every match consumes one
    /// opening tag and renders no new ones, so this terminates.
    pub fn normalize(&self, text: &str) -> String {
        let mut current = self.round(text);
        loop {
            let next = self.round(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

impl Default for MarkupNormalizer {
    fn default() -> Self {
        default_normalizer().clone()
    }
}

fn default_normalizer() -> &'static MarkupNormalizer {
    static DEFAULT: OnceLock<MarkupNormalizer> = OnceLock::new();
    DEFAULT.get_or_init(|| {
        MarkupNormalizer::new(SCRIPT_TAGS, THOUGHT_TAGS, RETURN_TO_USER_TAG)
            .unwrap_or_else(|e| unreachable!("built-in tag patterns are valid: {e}"))
    })
}

/// Normalize `text` with the built-in tag tables.
pub fn normalize(text: &str) -> String {
    default_normalizer().normalize(text)
}

/// Byte offset of the first case-insensitive `<returnToUser>` in `text`.
pub fn find_return_to_user(text: &str) -> Option<usize> {
    let needle = format!("<{}>", RETURN_TO_USER_TAG.to_ascii_lowercase());
    // ASCII lowering keeps byte offsets stable.
    text.to_ascii_lowercase().find(&needle)
}
