//! Function execution tracking.
//!
//! Function calls show up in the transcript as synthesized text: a
//! "running" banner when the call starts, rewritten in place to a
//! "completed" banner when its output arrives, followed by the formatted
//! result. When the turn ends, every execution is folded into a collapsible
//! summary.

use chrono::{DateTime, Utc};
use serde_json::Value;
use smoothchat_core::now_utc;
use std::fmt;

/// Outputs longer than this are fenced instead of shown inline.
const INLINE_RESULT_MAX_CHARS: usize = 80;

/// Bookkeeping for one function invocation within a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExecutionRecord {
    /// Function name.
    pub name: String,
    /// Raw arguments.
    pub arguments: String,
    /// Call identifier.
    pub call_id: String,
    /// Raw output, once received.
    pub output: Option<String>,
    /// When the call started.
    pub started_at: DateTime<Utc>,
}

impl FunctionExecutionRecord {
    /// Record a call that just started.
    pub fn new(
        name: impl Into<String>,
        arguments: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            call_id: call_id.into(),
            output: None,
            started_at: now_utc(),
        }
    }

    /// Whether output has been received.
    pub fn is_complete(&self) -> bool {
        self.output.is_some()
    }
}

/// Banner appended when a call starts.
///
/// The banner opens with a comment line carrying the call id, so the
/// rewrite on completion finds this call even when several calls share a
/// function name. Markdown renderers hide the comment.
pub fn started_banner(name: &str, call_id: &str) -> String {
    format!("\n\n{}\n⏳ **Running `{name}`**...\n\n", call_marker(call_id))
}

/// Banner that replaces [`started_banner`] when the call completes.
pub fn completed_banner(name: &str, call_id: &str) -> String {
    format!("\n\n{}\n✅ **Completed `{name}`**\n\n", call_marker(call_id))
}

fn call_marker(call_id: &str) -> String {
    // A `--` inside the id would end the comment early.
    format!("<!-- call:{} -->", call_id.replace("--", "-"))
}

/// Replace the running banner of `call_id` with its completed form.
///
/// Returns `false` when the banner is gone, e.g. after a retarget dropped
/// it.
pub fn complete_banner(content: &mut String, name: &str, call_id: &str) -> bool {
    let started = started_banner(name, call_id);
    match content.find(&started) {
        Some(at) => {
            content.replace_range(at..at + started.len(), &completed_banner(name, call_id));
            true
        }
        None => false,
    }
}

/// Render a function result for the transcript.
///
/// JSON objects and arrays are pretty-printed in a `json` fence. Other text
/// is fenced when long or multiline and shown as an inline code span
/// otherwise. Unparseable JSON is never an error.
pub fn format_result(output: &str) -> String {
    let trimmed = output.trim();
    if let Some(pretty) = pretty_json(trimmed) {
        return format!("```json\n{pretty}\n```\n");
    }
    if trimmed.is_empty() {
        return "_No output_\n".to_string();
    }
    if trimmed.contains('\n') || trimmed.contains('`') || trimmed.chars().count() > INLINE_RESULT_MAX_CHARS
    {
        let fence = fence_for(trimmed);
        return format!("{fence}\n{trimmed}\n{fence}\n");
    }
    format!("`{trimmed}`\n")
}

fn pretty_json(text: &str) -> Option<String> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => serde_json::to_string_pretty(&value).ok(),
        _ => None,
    }
}

fn fence_for(text: &str) -> &'static str {
    if text.contains("```") {
        "````"
    } else {
        "```"
    }
}

/// All function executions of one turn, in call order.
#[derive(Debug, Clone, Default)]
pub struct FunctionLog {
    records: Vec<FunctionExecutionRecord>,
}

impl FunctionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a started call.
    pub fn start(&mut self, name: &str, arguments: &str, call_id: &str) {
        self.records
            .push(FunctionExecutionRecord::new(name, arguments, call_id));
    }

    /// Attach `output` to the first unmatched call with `call_id`.
    ///
    /// Returns the completed record, or `None` when no call matches.
    pub fn complete(&mut self, call_id: &str, output: &str) -> Option<&FunctionExecutionRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.call_id == call_id && !r.is_complete())?;
        record.output = Some(output.to_string());
        Some(record)
    }

    /// Recorded executions.
    pub fn records(&self) -> &[FunctionExecutionRecord] {
        &self.records
    }

    /// Whether nothing was called.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of recorded executions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The collapsible summary, if anything was called.
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(FunctionSummary::new(&self.records).to_string())
        }
    }
}

/// Collapsible `<details>` block listing every execution.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSummary<'a> {
    records: &'a [FunctionExecutionRecord],
}

impl<'a> FunctionSummary<'a> {
    /// Summarize `records`.
    pub fn new(records: &'a [FunctionExecutionRecord]) -> Self {
        Self { records }
    }
}

impl fmt::Display for FunctionSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\n\n<details>\n<summary>🔧 Function executions ({})</summary>\n\n",
            self.records.len()
        )?;
        for (i, record) in self.records.iter().enumerate() {
            writeln!(f, "### {}. `{}`\n", i + 1, record.name)?;
            match run_code(record) {
                Some((language, code)) => {
                    let fence = fence_for(&code);
                    writeln!(f, "**Code:**\n\n{fence}{language}\n{code}\n{fence}\n")?;
                }
                None => writeln!(f, "**Arguments:**\n\n{}", block(&record.arguments))?,
            }
            match &record.output {
                Some(output) => writeln!(f, "**Output:**\n\n{}", block(output))?,
                None => writeln!(f, "**Output:** _still running_\n")?,
            }
        }
        f.write_str("</details>\n")
    }
}

/// `(language, code)` for a code-running call whose arguments carry `code`.
fn run_code(record: &FunctionExecutionRecord) -> Option<(String, String)> {
    let name = record.name.as_str();
    if !(name.eq_ignore_ascii_case("runCode") || name.eq_ignore_ascii_case("run_code")) {
        return None;
    }
    let args: Value = serde_json::from_str(&record.arguments).ok()?;
    let code = args.get("code")?.as_str()?.to_string();
    let language = args
        .get("language")
        .and_then(Value::as_str)
        .unwrap_or("javascript")
        .to_string();
    Some((language, code))
}

/// Fenced block, `json` labelled when the text parses as JSON.
fn block(text: &str) -> String {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return format!("```json\n{pretty}\n```\n");
        }
    }
    let fence = fence_for(trimmed);
    format!("{fence}\n{trimmed}\n{fence}\n")
}
