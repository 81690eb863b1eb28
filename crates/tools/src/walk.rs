//! Directory traversal shared by the listing and search tools.

use std::path::{Path, PathBuf};
use tracing::debug;

/// One visited entry.
#[derive(Debug)]
pub(crate) struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WalkOptions {
    /// Levels below the root to visit; `Some(1)` lists only the root's children
    pub max_depth: Option<usize>,
    pub show_hidden: bool,
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Visit everything below `root` depth-first, siblings in name order.
///
/// `visit` returns `false` to stop the walk. Only a failure to read `root`
/// itself is an error; unreadable subdirectories are skipped. Symlinks are
/// reported but never followed.
pub(crate) fn walk(
    root: &Path,
    options: WalkOptions,
    visit: &mut dyn FnMut(&Entry) -> bool,
) -> std::io::Result<()> {
    let entries = sorted_entries(root)?;
    walk_entries(entries, 1, options, visit);
    Ok(())
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        entries.push(Entry {
            path: entry.path(),
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Returns `false` once the visitor asked to stop.
fn walk_entries(
    entries: Vec<Entry>,
    depth: usize,
    options: WalkOptions,
    visit: &mut dyn FnMut(&Entry) -> bool,
) -> bool {
    for entry in entries {
        if !options.show_hidden && is_hidden(&entry.path) {
            continue;
        }
        if !visit(&entry) {
            return false;
        }
        if entry.is_dir && options.max_depth.is_none_or(|max| depth < max) {
            match sorted_entries(&entry.path) {
                Ok(children) => {
                    if !walk_entries(children, depth + 1, options, visit) {
                        return false;
                    }
                }
                Err(e) => debug!(path = %entry.path.display(), error = %e, "Skipping unreadable directory"),
            }
        }
    }
    true
}

/// Render a path with forward slashes so patterns match on every platform.
pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
