//! grep: regex search over file contents.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};

use crate::required_arg;
use crate::search_files::{GlobFilter, relative_to};
use crate::walk::{WalkOptions, display_path, walk};

pub struct GrepTool {
    pub max_matches: usize,
    pub show_hidden: bool,
    /// Larger files are skipped
    pub max_file_bytes: u64,
}

impl GrepTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            max_matches: config.max_grep_matches,
            show_hidden: config.show_hidden,
            max_file_bytes: config.max_file_bytes,
        }
    }
}

struct Search {
    re: Regex,
    filter: Option<GlobFilter>,
    root: PathBuf,
    max_matches: usize,
    max_file_bytes: u64,
    out: String,
    matches: usize,
    truncated: bool,
}

impl Search {
    fn done(&self) -> bool {
        self.truncated
    }

    fn file(&mut self, path: &Path) {
        if self
            .filter
            .as_ref()
            .is_some_and(|f| !f.matches(relative_to(&self.root, path)))
        {
            return;
        }
        let shown = display_path(path);
        if std::fs::metadata(path).is_ok_and(|m| m.len() > self.max_file_bytes) {
            return;
        }
        // unreadable or binary files are skipped
        let Ok(Ok(content)) = std::fs::read(path).map(String::from_utf8) else {
            return;
        };
        for (idx, line) in content.lines().enumerate() {
            if self.re.is_match(line) {
                if self.matches == self.max_matches {
                    self.truncated = true;
                    return;
                }
                let _ = writeln!(self.out, "{shown}:{}: {line}", idx + 1);
                self.matches += 1;
            }
        }
    }

    fn finish(mut self) -> String {
        let _ = write!(self.out, "\nMatches: {}", self.matches);
        if self.truncated {
            let _ = write!(self.out, " (limited to {})", self.max_matches);
        }
        self.out
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "grep".into(),
            description: "Search for a pattern in file contents.".into(),
            parameters: vec![
                ToolParameter::required("pattern", ParamKind::String, "Regex pattern to search for"),
                ToolParameter::optional("path", ParamKind::String, "File or directory to search in", Some(".")),
                ToolParameter::optional(
                    "glob",
                    ParamKind::String,
                    "Glob pattern to filter files (e.g., '*.rs')",
                    None,
                ),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let pattern = required_arg(arguments, "pattern")?;
        let re = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => return Ok(ToolOutcome::failure(format!("Invalid regex: {e}"))),
        };
        let filter = match arguments.get("glob").filter(|g| !g.trim().is_empty()) {
            Some(glob) => Some(
                GlobFilter::new(glob)
                    .map_err(|e| ToolError::InvalidArguments(format!("Invalid glob: {e}")))?,
            ),
            None => None,
        };
        let root = PathBuf::from(arguments.get("path").map_or(".", String::as_str));
        if !root.exists() {
            return Ok(ToolOutcome::failure(format!("Path not found: {}", root.display())));
        }

        let mut search = Search {
            re,
            filter,
            root: root.clone(),
            max_matches: self.max_matches,
            max_file_bytes: self.max_file_bytes,
            out: String::new(),
            matches: 0,
            truncated: false,
        };
        let options = WalkOptions {
            max_depth: None,
            show_hidden: self.show_hidden,
        };

        let output = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            if root.is_file() {
                search.file(&root);
                return Ok(search.finish());
            }
            walk(&root, options, &mut |entry| {
                if !entry.is_dir {
                    search.file(&entry.path);
                }
                !search.done()
            })?;
            Ok(search.finish())
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "grep".into(),
            reason: e.to_string(),
        })?;

        Ok(match output {
            Ok(out) => ToolOutcome::success(out),
            Err(e) => ToolOutcome::failure(format!("Filesystem error: {e}")),
        })
    }
}
