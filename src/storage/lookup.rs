//! File candidate lookup

use std::path::{Path, PathBuf};

/// Returns the existing files matching `patterns` in each directory
///
/// Results are ordered by directory first, then by pattern. Directories that
/// do not exist are skipped. Every match is returned, so callers that only
/// consume the first one get the highest-priority directory.
pub fn lookup_candidates<P: AsRef<Path>>(dirs: &[P], patterns: &[String]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in dirs {
        let dir: &Path = dir.as_ref();
        if !dir.is_dir() {
            continue;
        }

        found.extend(
            patterns
                .iter()
                .map(|pattern| dir.join(pattern))
                .filter(|candidate| candidate.is_file()),
        );
    }

    found
}
