//! `thinkact run`: answer a single message.

use std::path::Path;
use std::sync::Arc;
use thinkact_agent::{AgentStreamEvent, ChannelObserver, Termination};
use thinkact_config::AppConfig;
use tracing::warn;

pub async fn run(
    config_path: Option<&Path>,
    message: &str,
    images: Vec<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    if json {
        return run_json(&config, message, images).await;
    }

    let mut agent = super::build_agent(&config, super::terminal_observer());
    super::install_interrupt(agent.handle());

    let report = agent.run(message, images).await?;
    if config.agent.stream_output && report.termination == Termination::Answered {
        // already streamed
        println!();
    } else {
        if config.agent.stream_output {
            println!();
        }
        println!("{}", report.answer);
    }
    Ok(())
}

/// Emit every loop event as one JSON object per line.
async fn run_json(
    config: &AppConfig,
    message: &str,
    images: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (observer, mut rx) = ChannelObserver::new();
    let observer = Arc::new(observer);
    let mut agent = super::build_agent(config, observer.clone());
    super::install_interrupt(agent.handle());

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to encode event"),
            }
        }
    });

    let result = agent.run(message, images).await;
    match &result {
        Ok(report) => observer.send(AgentStreamEvent::Done {
            answer: report.answer.clone(),
            iterations: report.iterations,
            tool_calls_made: report.tool_calls,
        }),
        Err(e) => observer.send(AgentStreamEvent::Error {
            message: e.to_string(),
        }),
    }

    // the printer finishes once every sender is gone
    drop(agent);
    drop(observer);
    printer.await?;

    result?;
    Ok(())
}
