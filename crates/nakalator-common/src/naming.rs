//! File ordering and identifier helpers
//!
//! Digitised volumes are delivered as page images where the pages before and
//! after the main sequence are tagged `prev` and `next`. Uploads follow that
//! reading order: every `prev` page first, every `next` page last, the rest
//! lexicographically in between.

use crate::error::{CommonError, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Position of a file name inside the archival sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SequenceGroup {
    Previous,
    Main,
    Next,
}

impl SequenceGroup {
    /// Classify a file name (case-insensitive; `prev` wins over `next`).
    pub fn of(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("prev") {
            SequenceGroup::Previous
        } else if lower.contains("next") {
            SequenceGroup::Next
        } else {
            SequenceGroup::Main
        }
    }
}

/// Compare two file names in archival order.
pub fn archival_cmp(a: &str, b: &str) -> Ordering {
    SequenceGroup::of(a)
        .cmp(&SequenceGroup::of(b))
        .then_with(|| a.cmp(b))
}

/// File name of a path as an owned string (lossy for non UTF-8 names).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sort paths in archival order of their file names.
pub fn sort_archival(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| archival_cmp(&file_name(a), &file_name(b)));
}

/// List regular files of a directory in archival order.
pub fn list_sorted_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CommonError::NotADirectory(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    sort_archival(&mut files);
    Ok(files)
}

/// Make a repository identifier usable inside a file name.
///
/// DOIs look like `10.34847/nkl.abcd1234`; the slash becomes an underscore.
pub fn file_safe_id(id: &str) -> String {
    id.replace('/', "_")
}
