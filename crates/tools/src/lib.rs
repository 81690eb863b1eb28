//! Built-in tool implementations for thinkact.
//!
//! Tools give the agent the ability to interact with the world:
//! read, write and edit files, walk and search directory trees, run shell
//! commands, fetch web pages, capture the screen and ask the user.

pub mod ask_user;
pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod grep;
pub mod list_dir;
pub mod screen_capture;
pub mod search_files;
pub mod shell;
pub mod web_fetch;

mod walk;

use std::str::FromStr;
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ToolArguments, ToolRegistry};

pub use ask_user::{AskUserTool, InputCallback};

/// Create a registry holding every built-in tool.
///
/// `ask_user` is registered without a callback and stays unavailable until
/// the host replaces it with [`AskUserTool::with_callback`].
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(file_read::ReadFileTool::new(config)));
    registry.register(Box::new(file_write::WriteFileTool));
    registry.register(Box::new(file_edit::EditFileTool));
    registry.register(Box::new(list_dir::ListDirectoryTool::new(config)));
    registry.register(Box::new(search_files::SearchFilesTool::new(config)));
    registry.register(Box::new(grep::GrepTool::new(config)));
    registry.register(Box::new(shell::ShellTool::new(config)));
    registry.register(Box::new(web_fetch::WebFetchTool::new(config)));
    registry.register(Box::new(screen_capture::ScreenCaptureTool::new(config)));
    registry.register(Box::new(AskUserTool::new()));
    registry
}

/// A required argument, or `InvalidArguments` naming it.
pub(crate) fn required_arg<'a>(arguments: &'a ToolArguments, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

/// Parse an optional argument, falling back to `default` when absent or blank.
pub(crate) fn parsed_arg<T: FromStr>(arguments: &ToolArguments, key: &str, default: T) -> Result<T, ToolError> {
    match arguments.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ToolError::InvalidArguments(format!("{key} must be a number, got '{raw}'"))),
    }
}

/// Boolean flags arrive as text; anything but an explicit yes is false.
pub(crate) fn flag_arg(arguments: &ToolArguments, key: &str) -> bool {
    arguments
        .get(key)
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"))
}
