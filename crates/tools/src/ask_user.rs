//! ask_user: put a question to the human through a host callback.

use async_trait::async_trait;
use std::sync::Arc;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};

use crate::required_arg;

/// Host hook: receives the question and its options, returns the answer or
/// `None` when the user declined. Runs on a blocking thread, so it may read
/// stdin directly.
pub type InputCallback = Arc<dyn Fn(&str, &[String]) -> Option<String> + Send + Sync>;

pub struct AskUserTool {
    callback: Option<InputCallback>,
}

impl AskUserTool {
    /// A tool with no callback; unavailable until one is installed.
    pub fn new() -> Self {
        Self { callback: None }
    }

    pub fn with_callback(callback: InputCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }
}

impl Default for AskUserTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Comma-separated options, trimmed, blanks dropped.
fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl Tool for AskUserTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "ask_user".into(),
            description: "Ask the user a question and wait for the answer. Use when a decision or missing detail needs a human.".into(),
            parameters: vec![
                ToolParameter::required("question", ParamKind::String, "The question to ask"),
                ToolParameter::optional(
                    "options",
                    ParamKind::Array,
                    "Comma-separated choices to offer",
                    None,
                ),
            ],
        }
    }

    fn is_available(&self) -> bool {
        self.callback.is_some()
    }

    fn needs_user_input(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let question = required_arg(arguments, "question")?.to_string();
        let Some(callback) = self.callback.clone() else {
            return Ok(ToolOutcome::failure("No input callback configured"));
        };
        let options = parse_options(arguments.get("options").map_or("", String::as_str));

        let answer = tokio::task::spawn_blocking(move || callback(&question, &options))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "ask_user".into(),
                reason: e.to_string(),
            })?;

        Ok(match answer {
            Some(text) => ToolOutcome::success(text),
            None => ToolOutcome::failure("User did not answer"),
        })
    }
}
