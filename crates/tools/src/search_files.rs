//! search_files: glob matching over a recursive walk.
//!
//! Patterns use `glob` syntax: `**` (any run of path segments), `*` (anything
//! but `/`), `?` (one character) and `[...]` classes. Matching is
//! case-insensitive and may start at any directory level, so `*.rs` matches
//! any Rust file and `src/**/*.rs` matches Rust files anywhere under a `src`
//! directory.

use async_trait::async_trait;
use glob::{MatchOptions, Pattern, PatternError};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thinkact_config::ToolsConfig;
use thinkact_core::error::ToolError;
use thinkact_core::tool::{ParamKind, Tool, ToolArguments, ToolOutcome, ToolParameter, ToolSchema};

use crate::required_arg;
use crate::walk::{WalkOptions, display_path, walk};

pub struct SearchFilesTool {
    pub max_results: usize,
    pub show_hidden: bool,
}

impl SearchFilesTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            max_results: config.max_search_results,
            show_hidden: config.show_hidden,
        }
    }
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// A glob matched against paths relative to the search root.
///
/// The pattern may start at any directory level: `*.rs` matches `a/b/lib.rs`.
pub(crate) struct GlobFilter {
    anchored: Pattern,
    anywhere: Pattern,
}

impl GlobFilter {
    pub(crate) fn new(glob: &str) -> Result<Self, PatternError> {
        let glob = glob.replace('\\', "/");
        let glob = glob.trim_start_matches("./");
        Ok(Self {
            anchored: Pattern::new(glob)?,
            anywhere: Pattern::new(&format!("**/{glob}"))?,
        })
    }

    pub(crate) fn matches(&self, relative: &Path) -> bool {
        let relative = relative.to_string_lossy().replace('\\', "/");
        let options = match_options();
        self.anchored.matches_with(&relative, options) || self.anywhere.matches_with(&relative, options)
    }
}

/// `path` relative to `root`, or its file name when `path` is the root itself.
pub(crate) fn relative_to<'a>(root: &Path, path: &'a Path) -> &'a Path {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path.file_name().map_or(path, Path::new),
    }
}

fn search(root: PathBuf, filter: GlobFilter, options: WalkOptions, max_results: usize) -> std::io::Result<String> {
    let mut out = String::new();
    let mut count = 0usize;
    let mut truncated = false;
    walk(&root, options, &mut |entry| {
        if !filter.matches(relative_to(&root, &entry.path)) {
            return true;
        }
        if count == max_results {
            truncated = true;
            return false;
        }
        let _ = writeln!(out, "{}", display_path(&entry.path));
        count += 1;
        true
    })?;
    let _ = write!(out, "\nFound: {count} files");
    if truncated {
        let _ = write!(out, " (limited to {max_results})");
    }
    Ok(out)
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_files".into(),
            description: "Search for files matching a glob pattern.".into(),
            parameters: vec![
                ToolParameter::required(
                    "pattern",
                    ParamKind::String,
                    "Glob pattern (e.g., '*.rs', 'src/**/*.ts')",
                ),
                ToolParameter::optional("path", ParamKind::String, "Directory to search in", Some(".")),
            ],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutcome, ToolError> {
        let pattern = required_arg(arguments, "pattern")?;
        let root = PathBuf::from(arguments.get("path").map_or(".", String::as_str));
        if !root.is_dir() {
            return Ok(ToolOutcome::failure(format!(
                "Directory not found: {}",
                root.display()
            )));
        }
        let filter = GlobFilter::new(pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid pattern: {e}")))?;

        let options = WalkOptions {
            max_depth: None,
            show_hidden: self.show_hidden,
        };
        let max_results = self.max_results;
        let result = tokio::task::spawn_blocking(move || search(root, filter, options, max_results))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "search_files".into(),
                reason: e.to_string(),
            })?;
        Ok(match result {
            Ok(out) => ToolOutcome::success(out),
            Err(e) => ToolOutcome::failure(format!("Filesystem error: {e}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> ToolArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn glob_filter_matching() {
        let rs = GlobFilter::new("*.rs").unwrap();
        assert!(rs.matches(Path::new("src/lib.rs")));
        assert!(rs.matches(Path::new("MAIN.RS")));
        assert!(!rs.matches(Path::new("src/lib.rs.bak")));
        assert!(!rs.matches(Path::new("src/librs")));

        let nested = GlobFilter::new("src/**/*.ts").unwrap();
        assert!(nested.matches(Path::new("src/app.ts")));
        assert!(nested.matches(Path::new("src/a/b/app.ts")));
        assert!(nested.matches(Path::new("web/src/app.ts")));
        assert!(!nested.matches(Path::new("lib/app.ts")));

        let single = GlobFilter::new("file?.txt").unwrap();
        assert!(single.matches(Path::new("dir/file1.txt")));
        assert!(!single.matches(Path::new("dir/file12.txt")));

        let class = GlobFilter::new("[ab].txt").unwrap();
        assert!(class.matches(Path::new("a.txt")));
        assert!(class.matches(Path::new("dir/B.txt")));
        assert!(!class.matches(Path::new("c.txt")));

        assert!(GlobFilter::new("a**b").is_err());
    }

    #[tokio::test]
    async fn character_class_pattern() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let outcome = SearchFilesTool::new(&ToolsConfig::default())
            .execute(&args(&[("pattern", "[ab].txt"), ("path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        assert!(outcome.output.contains("a.txt"));
        assert!(outcome.output.contains("b.txt"));
        assert!(!outcome.output.contains("c.txt"));
        assert!(outcome.output.ends_with("\nFound: 2 files"));
    }

    #[tokio::test]
    async fn search_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/nested/mod.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let tool = SearchFilesTool::new(&ToolsConfig::default());
        let outcome = tool
            .execute(&args(&[("pattern", "*.rs"), ("path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        assert!(outcome.succeeded);
        assert!(outcome.output.contains("src/lib.rs"));
        assert!(outcome.output.contains("src/nested/mod.rs"));
        assert!(!outcome.output.contains("README.md"));
        assert!(outcome.output.ends_with("\nFound: 2 files"));
    }

    #[tokio::test]
    async fn results_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("f{i}.txt")), "").unwrap();
        }
        let tool = SearchFilesTool {
            max_results: 3,
            show_hidden: false,
        };
        let outcome = tool
            .execute(&args(&[("pattern", "*.txt"), ("path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        assert!(outcome.output.ends_with("Found: 3 files (limited to 3)"));
        assert_eq!(outcome.output.lines().filter(|l| l.ends_with(".txt")).count(), 3);
    }

    #[tokio::test]
    async fn exact_cap_is_not_reported_as_limited() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            std::fs::write(dir.path().join(format!("f{i}.txt")), "").unwrap();
        }
        let tool = SearchFilesTool {
            max_results: 3,
            show_hidden: false,
        };
        let outcome = tool
            .execute(&args(&[("pattern", "*.txt"), ("path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        assert!(outcome.output.ends_with("\nFound: 3 files"));
    }

    #[tokio::test]
    async fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = SearchFilesTool::new(&ToolsConfig::default())
            .execute(&args(&[
                ("pattern", "*"),
                ("path", dir.path().join("nope").to_str().unwrap()),
            ]))
            .await
            .unwrap();
        assert!(outcome.error().starts_with("Directory not found: "));
    }
}
