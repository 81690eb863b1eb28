//! `thinkact chat`: interactive multi-turn session.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thinkact_agent::{ReasoningLoop, Termination};
use thinkact_config::AppConfig;
use thinkact_core::history::ConversationHistory;

const HELP: &str = "\
  /help            Show this help
  /clear           Forget the conversation
  /image <path>    Attach an image to the next message
  /history         Print the conversation so far
  /save <path>     Save the conversation
  /load <path>     Restore a saved conversation
  /exit            Quit";

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Help,
    Clear,
    Image(String),
    History,
    Save(PathBuf),
    Load(PathBuf),
    Exit,
}

/// Parse the text after the leading `/`.
fn parse_command(input: &str) -> Result<SlashCommand, String> {
    let (name, arg) = match input.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (input, ""),
    };
    let needs_arg = |usage: &str| {
        if arg.is_empty() {
            Err(format!("usage: /{name} {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };
    match name {
        "help" | "?" => Ok(SlashCommand::Help),
        "clear" | "reset" => Ok(SlashCommand::Clear),
        "image" => needs_arg("<path>").map(SlashCommand::Image),
        "history" => Ok(SlashCommand::History),
        "save" => needs_arg("<path>").map(|p| SlashCommand::Save(p.into())),
        "load" => needs_arg("<path>").map(|p| SlashCommand::Load(p.into())),
        "exit" | "quit" => Ok(SlashCommand::Exit),
        other => Err(format!("unknown command /{other} (try /help)")),
    }
}

/// Read one line from stdin without blocking the runtime. `None` on EOF.
async fn read_line() -> std::io::Result<Option<String>> {
    tokio::task::spawn_blocking(|| -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let n = std::io::stdin().lock().read_line(&mut line)?;
        Ok((n > 0).then_some(line))
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Apply a slash command. Returns `false` when the session should end.
fn apply(command: SlashCommand, agent: &mut ReasoningLoop, pending_images: &mut Vec<String>, budget: usize) -> bool {
    match command {
        SlashCommand::Help => println!("{HELP}"),
        SlashCommand::Clear => {
            agent.reset();
            pending_images.clear();
            println!("  (conversation cleared)");
        }
        SlashCommand::Image(path) => {
            if Path::new(&path).is_file() {
                pending_images.push(path);
                println!("  ({} image(s) attached to the next message)", pending_images.len());
            } else {
                eprintln!("  image not found: {path}");
            }
        }
        SlashCommand::History => print!("{}", agent.history().format()),
        SlashCommand::Save(path) => match agent.history().save(&path) {
            Ok(()) => println!("  (saved {} turns to {})", agent.history().len(), path.display()),
            Err(e) => eprintln!("  [error] {e}"),
        },
        SlashCommand::Load(path) => match ConversationHistory::load(&path, budget) {
            Ok(history) => {
                agent.replace_history(history);
                println!("  (loaded {} turns)", agent.history().len());
            }
            Err(e) => eprintln!("  [error] {e}"),
        },
        SlashCommand::Exit => return false,
    }
    true
}

fn banner(config: &AppConfig, agent: &ReasoningLoop) {
    println!();
    println!("  thinkact: interactive mode");
    println!();
    println!("  Backend:   {}", config.backend.base_url);
    println!("  Model:     {}", config.backend.model);
    println!("  Tools:     {}", agent.tools().available().len());
    println!();
    println!("  Type a message and press Enter. /help lists commands.");
    println!();
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let mut agent = super::build_agent(&config, super::terminal_observer());
    super::install_interrupt(agent.handle());
    banner(&config, &agent);

    let streaming = config.agent.stream_output;
    let mut pending_images = Vec::new();

    loop {
        print!("  you > ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match parse_command(command) {
                Ok(command) => {
                    if !apply(command, &mut agent, &mut pending_images, config.agent.context_budget) {
                        break;
                    }
                }
                Err(usage) => eprintln!("  {usage}"),
            }
            continue;
        }

        let images = std::mem::take(&mut pending_images);
        println!();
        match agent.run(input, images).await {
            Ok(report) => {
                if !(streaming && report.termination == Termination::Answered) {
                    if streaming {
                        println!();
                    }
                    print!("{}", report.answer);
                }
                println!();
                println!();
            }
            Err(e) => eprintln!("\n  [error] {e}\n"),
        }
    }

    println!();
    Ok(())
}
