//! read_file: file contents with line numbers.

use async_trait::async_trait;
use std::fmt::Write as _;
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};

use crate::{parsed_arg, required_arg};

const DEFAULT_LIMIT: usize = 2000;

pub struct ReadFileTool {
    /// Files larger than this are refused.
    pub max_file_bytes: u64,
}

impl ReadFileTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
        }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new(&ToolsConfig::default())
    }
}

/// Render lines `offset..offset+limit` (1-based) as `{n:>6}\t{line}`.
fn number_lines(content: &str, offset: usize, limit: usize) -> String {
    let mut out = String::new();
    for (idx, line) in content.lines().enumerate().skip(offset.max(1) - 1).take(limit) {
        let _ = writeln!(out, "{:>6}\t{}", idx + 1, line);
    }
    out
}

#[async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read_file".into(),
            description: "Read the contents of a file. Returns the file content as text with line numbers.".into(),
            parameters: vec![
                ToolParameter::required("file_path", ParamKind::String, "Path to the file to read"),
                ToolParameter::optional(
                    "offset",
                    ParamKind::Integer,
                    "Line number to start reading from (1-based)",
                    Some("1"),
                ),
                ToolParameter::optional(
                    "limit",
                    ParamKind::Integer,
                    "Maximum number of lines to read",
                    Some("2000"),
                ),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let path = required_arg(arguments, "file_path")?;
        let offset = parsed_arg(arguments, "offset", 1usize)?;
        let limit = parsed_arg(arguments, "limit", DEFAULT_LIMIT)?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(_) => return Ok(ToolOutcome::failure(format!("File not found: {path}"))),
        };
        if metadata.is_dir() {
            return Ok(ToolOutcome::failure(format!("Is a directory: {path}")));
        }
        if metadata.len() > self.max_file_bytes {
            return Ok(ToolOutcome::failure(format!(
                "File too large: {} bytes",
                metadata.len()
            )));
        }

        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                Ok(ToolOutcome::success(number_lines(&content, offset, limit)))
            }
            Err(e) => Ok(ToolOutcome::failure(format!("Failed to open file: {path}: {e}"))),
        }
    }
}
