//! Scripted chat turn.
//!
//! Plays a canned agent stream through the client and prints every reveal
//! update, so the pacing, the function banners and the final-answer retarget
//! can be watched without a real agent.
//!
//! Run with:
//! ```bash
//! RUST_LOG=smoothchat_agent=debug cargo run --example scripted_turn
//! ```

use smoothchat::prelude::*;
use smoothchat::InMemoryCredentials;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prints only the newly revealed text.
struct ConsoleObserver;

impl ChatObserver for ConsoleObserver {
    fn on_update(&self, _displayed: &str, delta: &str) {
        print!("{delta}");
        let _ = io::stdout().flush();
    }

    fn on_finish(&self, content: &str, stop_reason: &str, usage: &TurnUsage) {
        println!("\n\n---");
        println!(
            "✅ finished ({stop_reason}): {} chars, prompt {} / completion {}",
            content.chars().count(),
            usage.prompt_tokens,
            usage.completion_tokens
        );
    }

    fn on_error(&self, error: &ChatError) {
        println!("\n❌ {}", error.user_message());
    }

    fn on_function_call(&self, name: &str, _arguments: &str, call_id: &str) {
        tracing::info!(%name, %call_id, "function call");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let script = vec![
        StreamEvent::new_completion_round("round-1"),
        StreamEvent::text_chunk("<think>The user wants the weather. "),
        StreamEvent::text_chunk("I should call the tool.</think>"),
        StreamEvent::function_call("getWeather", "call-1", r#"{"city":"Lisbon"}"#),
        StreamEvent::function_call_output("call-1", r#"{"temp_c":22,"sky":"sunny"}"#),
        StreamEvent::text_chunk("Let me summarise. <return"),
        StreamEvent::text_chunk("ToUser>It is **22°C** and sunny in Lisbon."),
    ];

    let connection = Arc::new(
        ScriptedConnection::new(script)
            .fail_with("agent weather-bot not found")
            .with_delay(Duration::from_millis(120)),
    );

    let client = AgentClient::new(
        AgentClientConfig::new("weather-bot").stop_reason("stop"),
        connection,
    )
    .with_credentials(Arc::new(InMemoryCredentials::new("demo-token")))
    .with_stream_config(SmoothStreamConfig::new().base_speed(80.0));

    client.configure_streaming(SmoothStreamConfigPatch::new().smoothness(Smoothness::High))?;

    println!("🌊 Scripted turn\n");
    let outcome = client
        .chat(
            vec![ChatMessage::user("What's the weather in Lisbon?")],
            Arc::new(ConsoleObserver),
        )
        .await;

    if let TurnOutcome::Finished { content, .. } = outcome {
        println!("\nFinal transcript:\n\n{content}");
    }
    Ok(())
}
