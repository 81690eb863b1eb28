//! list_directory: `[DIR]`/`[FILE]` listing, optionally recursive.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};

use crate::walk::{WalkOptions, display_path, walk};
use crate::{flag_arg, required_arg};

pub struct ListDirectoryTool {
    pub show_hidden: bool,
    /// Depth limit when `recursive` is set
    pub max_depth: usize,
}

impl ListDirectoryTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            show_hidden: config.show_hidden,
            max_depth: config.max_depth,
        }
    }
}

fn list(root: PathBuf, options: WalkOptions) -> Result<ToolOutcome, std::io::Error> {
    let mut out = String::new();
    let mut count = 0usize;
    walk(&root, options, &mut |entry| {
        let kind = if entry.is_dir { "[DIR]" } else { "[FILE]" };
        let _ = writeln!(out, "{kind} {}", display_path(&entry.path));
        count += 1;
        true
    })?;
    let _ = write!(out, "\nTotal: {count} items");
    Ok(ToolOutcome::success(out))
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_directory".into(),
            description: "List the contents of a directory.".into(),
            parameters: vec![
                ToolParameter::required("path", ParamKind::String, "Directory path to list"),
                ToolParameter::optional("recursive", ParamKind::Boolean, "List recursively", Some("false")),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let path = PathBuf::from(required_arg(arguments, "path")?);
        let shown = path.display().to_string();
        if !path.exists() {
            return Ok(ToolOutcome::failure(format!("Directory not found: {shown}")));
        }
        if !path.is_dir() {
            return Ok(ToolOutcome::failure(format!("Not a directory: {shown}")));
        }

        let options = WalkOptions {
            max_depth: Some(if flag_arg(arguments, "recursive") {
                self.max_depth.max(1)
            } else {
                1
            }),
            show_hidden: self.show_hidden,
        };

        let listed = tokio::task::spawn_blocking(move || list(path, options))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_directory".into(),
                reason: e.to_string(),
            })?;
        Ok(listed.unwrap_or_else(|e| ToolOutcome::failure(format!("Filesystem error: {e}"))))
    }
}
