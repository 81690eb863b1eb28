//! thinkact CLI: the main entry point.
//!
//! Commands:
//! - `chat`   : Interactive multi-turn session
//! - `run`    : Answer one message and exit
//! - `tools`  : Print the tool catalog the model sees
//! - `config` : Print a starter config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "thinkact",
    about = "thinkact: a tool-using reasoning agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.thinkact/config.toml)
    #[arg(short, long, global = true, env = "THINKACT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent interactively
    Chat,

    /// Send a single message and print the answer
    Run {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Attach an image (repeatable)
        #[arg(short, long = "image")]
        images: Vec<String>,

        /// Print stream events as JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the available tools
    Tools,

    /// Print the default configuration
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so streamed tokens on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Run {
            message,
            images,
            json,
        } => commands::run::run(config_path, &message, images, json).await?,
        Commands::Tools => commands::tools::run(config_path)?,
        Commands::Config { path } => commands::config_cmd::run(path),
    }

    Ok(())
}
