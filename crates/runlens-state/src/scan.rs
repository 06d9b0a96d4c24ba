//! Bounded directory traversal shared by path resolution and log discovery.

use std::path::Path;
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

/// Upper bounds on one recursive scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Deepest directory level visited below the root.
    pub max_depth: usize,
    /// Entries (files and directories) visited before the scan stops.
    pub max_entries: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: 12,
            max_entries: 50_000,
        }
    }
}

/// Regular files under `root`, at most `limits.max_entries` entries deep
/// into the walk. Unreadable entries are skipped.
pub fn files_under(root: &Path, limits: ScanLimits) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .max_depth(limits.max_depth)
        .into_iter()
        .take(limits.max_entries)
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
}

/// Modification time of `path`, `None` when it cannot be read.
#[must_use]
pub fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
