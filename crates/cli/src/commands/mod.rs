//! Subcommands and the wiring they share.

pub mod chat;
pub mod config_cmd;
pub mod run;
pub mod tools;

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use thinkact_agent::ReasoningLoop;
use thinkact_config::{AppConfig, ConfigError};
use thinkact_core::agent::LoopHandle;
use thinkact_core::observer::{FnObserver, Observer};
use thinkact_core::tool::ToolRegistry;
use thinkact_providers::OpenAiCompatBackend;
use thinkact_tools::{AskUserTool, InputCallback, default_registry};
use tracing::info;

/// Load the config from `path` or the default location, env overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => Ok(AppConfig::load_from(path)?.with_env_overrides()),
        None => AppConfig::load(),
    }
}

/// The full tool set, with `ask_user` wired to the terminal.
pub fn build_registry(config: &AppConfig) -> ToolRegistry {
    let mut registry = default_registry(&config.tools);
    registry.register(Box::new(AskUserTool::with_callback(terminal_prompt())));
    registry
}

/// A loop talking to the configured backend.
pub fn build_agent(config: &AppConfig, observer: Arc<dyn Observer>) -> ReasoningLoop {
    let backend = OpenAiCompatBackend::from_config(&config.backend);
    info!(base_url = %backend.base_url(), model = %config.backend.model, "Using backend");
    ReasoningLoop::builder()
        .config(config.agent.clone())
        .generation(config.generation.clone())
        .backend(Arc::new(backend))
        .registry(build_registry(config))
        .observer(observer)
        .build()
}

/// Streams tokens to stdout and tool activity to stderr.
pub fn terminal_observer() -> Arc<dyn Observer> {
    Arc::new(
        FnObserver::new()
            .on_token(|token| {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(token.as_bytes());
                let _ = stdout.flush();
            })
            .on_tool(|call, outcome| {
                if outcome.succeeded {
                    eprintln!("\n  [{}] ok", call.name);
                } else {
                    eprintln!("\n  [{}] failed: {}", call.name, outcome.error());
                }
            }),
    )
}

/// Ask on stderr, read the answer from stdin. An empty line declines.
fn terminal_prompt() -> InputCallback {
    Arc::new(|question: &str, options: &[String]| {
        eprintln!("\n  ? {question}");
        for (i, option) in options.iter().enumerate() {
            eprintln!("    {}. {option}", i + 1);
        }
        eprint!("  > ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        let answer = line.trim();
        if answer.is_empty() {
            return None;
        }
        // a bare number picks the matching option
        let picked = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| options.get(i));
        Some(picked.map_or_else(|| answer.to_string(), Clone::clone))
    })
}

/// Route Ctrl+C to the loop: a busy loop is asked to stop, an idle one exits.
pub fn install_interrupt(handle: LoopHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_busy() {
                eprintln!("\n  (stopping...)");
                handle.stop();
            } else {
                eprintln!();
                std::process::exit(130);
            }
        }
    });
}
