//! Chat command handler.

use super::bridge::ready_bridge;
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::sync::Arc;
use toolbridge::{
    AnthropicAdapter, BridgeConfiguration, OpenAiCompatAdapter, ProviderAdapter, SessionController,
    SessionEvent, SessionState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument};

fn api_key(variable: &str) -> Result<String> {
    std::env::var(variable).with_context(|| format!("{} is not set", variable))
}

fn build_adapter(
    provider: &str,
    model: &str,
    base_url: Option<&str>,
) -> Result<Arc<dyn ProviderAdapter>> {
    let adapter: Arc<dyn ProviderAdapter> = match (provider, base_url) {
        ("openai", None) => Arc::new(OpenAiCompatAdapter::openai(api_key("OPENAI_API_KEY")?, model)),
        ("openai", Some(url)) => Arc::new(
            OpenAiCompatAdapter::new("openai", url, model, Some(api_key("OPENAI_API_KEY")?))
                .with_usage(true),
        ),
        ("groq", None) => Arc::new(OpenAiCompatAdapter::groq(api_key("GROQ_API_KEY")?, model)),
        ("groq", Some(url)) => Arc::new(OpenAiCompatAdapter::new(
            "groq",
            url,
            model,
            Some(api_key("GROQ_API_KEY")?),
        )),
        ("ollama", None) => Arc::new(OpenAiCompatAdapter::ollama(model)),
        ("ollama", Some(url)) => Arc::new(OpenAiCompatAdapter::new("ollama", url, model, None)),
        ("anthropic", None) => Arc::new(AnthropicAdapter::new(api_key("ANTHROPIC_API_KEY")?, model)),
        ("anthropic", Some(url)) => Arc::new(AnthropicAdapter::with_base_url(
            api_key("ANTHROPIC_API_KEY")?,
            model,
            url,
        )),
        (other, _) => bail!("no streaming adapter for provider '{}'", other),
    };
    Ok(adapter)
}

/// Runs a conversation turn, printing model text to stdout and tool activity to stderr.
///
/// When the tool limit pauses the session, the user is asked on stdin whether to resume.
#[instrument(skip(config, prompt))]
pub async fn handle_chat(
    config: BridgeConfiguration,
    prompt: &str,
    provider: &str,
    model: &str,
    base_url: Option<&str>,
) -> Result<()> {
    let adapter = build_adapter(provider, model, base_url)?;
    let session_config = config.session.clone();
    let bridge = ready_bridge(config).await?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::TextDelta(text) => {
                    print!("{}", text);
                    stdout.flush().ok();
                }
                SessionEvent::ToolCallsDetected(calls) => {
                    let names: Vec<_> = calls.iter().map(|call| call.name.as_str()).collect();
                    eprintln!("\n[calling {}]", names.join(", "));
                }
                SessionEvent::ToolResult(result) => {
                    let status = if result.success { "ok" } else { "failed" };
                    eprintln!("[{} {} in {}ms]", result.id, status, result.execution_time_ms);
                }
                SessionEvent::DeadSwitchTriggered { iterations } => {
                    eprintln!("[tool limit reached after {} rounds]", iterations);
                }
                _ => {}
            }
        }
    });

    let mut session = SessionController::new(adapter, Arc::new(bridge.clone()), session_config)
        .with_events(tx);
    let result = converse(&mut session, prompt).await;
    drop(session);
    printer.await.ok();
    bridge.dispose().await;
    result
}

/// What the user typed at the confirmation prompt.
#[derive(Debug, PartialEq)]
enum Confirmation {
    /// Resume, optionally with new instructions
    Continue(Option<String>),
    Stop,
}

impl Confirmation {
    fn from_line(line: Option<&str>) -> Self {
        let Some(line) = line else {
            return Self::Stop;
        };
        match line.trim() {
            "q" | "quit" | "exit" => Self::Stop,
            "" => Self::Continue(None),
            text => Self::Continue(Some(text.to_string())),
        }
    }
}

/// Runs the turn, then resumes after each dead-switch pause the user confirms.
async fn converse(session: &mut SessionController, prompt: &str) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut outcome = session.run_turn(prompt).await?;
    loop {
        println!();
        info!(
            state = %outcome.final_state(),
            iterations = outcome.iterations(),
            input_tokens = outcome.usage().input_tokens,
            output_tokens = outcome.usage().output_tokens,
            "Turn finished"
        );
        if *outcome.final_state() != SessionState::AwaitingUserConfirmation {
            return Ok(());
        }

        eprint!("Continue? [Enter to resume, text to redirect, q to stop] ");
        std::io::stderr().flush().ok();
        let line = stdin.next_line().await.context("failed to read confirmation")?;
        match Confirmation::from_line(line.as_deref()) {
            Confirmation::Stop => {
                eprintln!("Stopped at the tool limit.");
                return Ok(());
            }
            Confirmation::Continue(input) => outcome = session.resume(input).await?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_from_line() {
        assert_eq!(Confirmation::from_line(Some("\n")), Confirmation::Continue(None));
        assert_eq!(
            Confirmation::from_line(Some("  only read files\n")),
            Confirmation::Continue(Some("only read files".to_string()))
        );
        assert_eq!(Confirmation::from_line(Some("q")), Confirmation::Stop);
        assert_eq!(Confirmation::from_line(Some("exit\n")), Confirmation::Stop);
        assert_eq!(Confirmation::from_line(None), Confirmation::Stop);
    }
}
