//! write_file: create or overwrite a file.

use async_trait::async_trait;
use std::path::Path;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};
use tracing::debug;

use crate::required_arg;

/// Writes text to a path, creating missing parent directories.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "write_file".into(),
            description: "Write content to a file. Creates the file and any missing parent directories; overwrites existing content.".into(),
            parameters: vec![
                ToolParameter::required("file_path", ParamKind::String, "Path to the file to write"),
                ToolParameter::required("content", ParamKind::String, "Content to write to the file"),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let path = required_arg(arguments, "file_path")?;
        let content = required_arg(arguments, "content")?;

        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolOutcome::failure(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                )));
            }
        }

        match tokio::fs::write(path, content).await {
            Ok(()) => {
                debug!(path = %path, bytes = content.len(), "File written");
                Ok(ToolOutcome::success(format!("File written successfully: {path}")))
            }
            Err(e) => Ok(ToolOutcome::failure(format!("Failed to create file: {path}: {e}"))),
        }
    }
}
