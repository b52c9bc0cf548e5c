//! Watch target validation and directory enumeration.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Keep the targets that are existing directories, warning about the rest.
///
/// Rejected targets are not an error: watching continues with whatever remains.
pub fn validate_targets(targets: &[PathBuf]) -> Vec<PathBuf> {
    let mut accepted: Vec<PathBuf> = Vec::with_capacity(targets.len());

    for target in targets {
        if !target.exists() {
            tracing::warn!(
                "[watcher] not watching {}: path does not exist",
                target.display()
            );
            continue;
        }
        if !target.is_dir() {
            tracing::warn!(
                "[watcher] not watching {}: not a directory",
                target.display()
            );
            continue;
        }

        let target = absolute(target);
        if !accepted.contains(&target) {
            accepted.push(target);
        }
    }

    accepted
}

/// Every directory under `root`, including `root` itself.
///
/// Uses walkdir's explicit stack rather than recursion, so depth is unbounded.
/// Unreadable entries are skipped with a debug log.
pub fn directories_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                crate::debug_event!("watcher", "skipping unreadable entry", "{e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
