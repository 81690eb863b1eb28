//! edit_file: exact-text replacement inside a file.

use async_trait::async_trait;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};

use crate::{flag_arg, required_arg};

pub struct EditFileTool;

/// Replace the first (or every) occurrence. Returns the new text and the count.
fn replace(content: &str, old: &str, new: &str, replace_all: bool) -> (String, usize) {
    if replace_all {
        let count = content.matches(old).count();
        (content.replace(old, new), count)
    } else if content.contains(old) {
        (content.replacen(old, new, 1), 1)
    } else {
        (content.to_string(), 0)
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "edit_file".into(),
            description: "Edit a file by replacing text. The old_string must match exactly.".into(),
            parameters: vec![
                ToolParameter::required("file_path", ParamKind::String, "Path to the file to edit"),
                ToolParameter::required("old_string", ParamKind::String, "The exact text to find and replace"),
                ToolParameter::required("new_string", ParamKind::String, "The text to replace with"),
                ToolParameter::optional(
                    "replace_all",
                    ParamKind::Boolean,
                    "Replace all occurrences",
                    Some("false"),
                ),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let path = required_arg(arguments, "file_path")?;
        let old = required_arg(arguments, "old_string")?;
        let new = required_arg(arguments, "new_string")?;
        if old.is_empty() {
            return Err(ToolError::InvalidArguments("old_string must not be empty".into()));
        }

        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolOutcome::failure(format!("File not found: {path}")));
            }
            Err(e) => return Ok(ToolOutcome::failure(format!("Failed to open file: {path}: {e}"))),
        };

        let (updated, count) = replace(&content, old, new, flag_arg(arguments, "replace_all"));
        if count == 0 {
            return Ok(ToolOutcome::failure("old_string not found in file"));
        }

        match tokio::fs::write(path, updated).await {
            Ok(()) => Ok(ToolOutcome::success(format!("Replaced {count} occurrence(s)"))),
            Err(e) => Ok(ToolOutcome::failure(format!("Failed to write file: {path}: {e}"))),
        }
    }
}
