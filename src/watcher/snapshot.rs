//! Point-in-time view of watched files, used by the polling backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use super::event::ChangeEvent;

/// Mapping from absolute file path to its last-modified time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    entries: BTreeMap<PathBuf, SystemTime>,
}

impl FileSnapshot {
    /// Walk every root and record the modification time of each regular file.
    ///
    /// Files that vanish or cannot be stat'ed mid-walk are left out of the snapshot.
    pub fn capture(roots: &[PathBuf]) -> Self {
        let mut entries = BTreeMap::new();

        for root in roots {
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        crate::debug_event!("polling", "skipping", "{e}");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                match entry.metadata().map(|meta| meta.modified()) {
                    Ok(Ok(modified)) => {
                        entries.insert(entry.into_path(), modified);
                    }
                    _ => {
                        crate::debug_event!("polling", "no mtime", "{}", entry.path().display());
                    }
                }
            }
        }

        Self { entries }
    }

    /// Compare against a newer snapshot.
    ///
    /// Paths only in `newer` are created, paths whose timestamp changed are modified,
    /// and paths only in `self` are deleted. Events come out grouped in that order,
    /// each group sorted by path.
    pub fn diff(&self, newer: &FileSnapshot) -> Vec<ChangeEvent> {
        let mut created = Vec::new();
        let mut modified = Vec::new();
        let mut deleted = Vec::new();

        for (path, mtime) in &newer.entries {
            match self.entries.get(path) {
                None => created.push(ChangeEvent::created(path.clone())),
                Some(previous) if previous != mtime => {
                    modified.push(ChangeEvent::modified(path.clone()))
                }
                Some(_) => {}
            }
        }

        for path in self.entries.keys() {
            if !newer.entries.contains_key(path) {
                deleted.push(ChangeEvent::deleted(path.clone()));
            }
        }

        created.extend(modified);
        created.extend(deleted);
        created
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).copied()
    }

    #[cfg(test)]
    fn from_entries(entries: impl IntoIterator<Item = (PathBuf, SystemTime)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::ChangeKind;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_diff_classifies_changes() {
        let old = FileSnapshot::from_entries([
            (PathBuf::from("/p/a.html"), at(1)),
            (PathBuf::from("/p/b.html"), at(1)),
            (PathBuf::from("/p/c.html"), at(1)),
        ]);
        let new = FileSnapshot::from_entries([
            (PathBuf::from("/p/a.html"), at(1)),
            (PathBuf::from("/p/b.html"), at(2)),
            (PathBuf::from("/p/d.html"), at(2)),
        ]);

        let changes = old.diff(&new);

        assert_eq!(
            changes,
            vec![
                ChangeEvent::new("/p/d.html", ChangeKind::Created),
                ChangeEvent::new("/p/b.html", ChangeKind::Modified),
                ChangeEvent::new("/p/c.html", ChangeKind::Deleted),
            ]
        );
    }

    #[test]
    fn test_identical_snapshots_produce_nothing() {
        let snap = FileSnapshot::from_entries([(PathBuf::from("/p/a"), at(7))]);
        assert!(snap.diff(&snap.clone()).is_empty());
    }

    #[test]
    fn test_capture_records_files_only() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("views/partials")).unwrap();
        std::fs::write(temp.path().join("views/index.scala.html"), "@()").unwrap();
        std::fs::write(temp.path().join("views/partials/nav.scala.html"), "@()").unwrap();

        let snap = FileSnapshot::capture(&[temp.path().to_path_buf()]);

        assert_eq!(snap.len(), 2);
        assert!(snap.contains(&temp.path().join("views/index.scala.html")));
        assert!(!snap.contains(&temp.path().join("views")));
    }
}
