//! Best-effort removal of per-request artifacts.
//!
//! Deletion is advisory: a target that no longer exists is a no-op, and
//! IO failures are logged rather than propagated, since cleanup runs after
//! the caller already has its response.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

pub fn remove_dir(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "Removed directory"),
        Err(e) => warn!(error = ?e, path = %path.display(), "Failed to remove directory"),
    }
}

pub fn remove_file(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) => warn!(error = ?e, path = %path.display(), "Failed to remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_is_a_noop_for_missing_targets() {
        let dir = tempfile::tempdir().unwrap();
        remove_dir(&dir.path().join("never-created"));
        remove_file(&dir.path().join("never-created.zip"));
    }

    #[test]
    fn removes_existing_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("artifacts");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("t.py"), "pass\n").unwrap();
        let archive = dir.path().join("artifacts.zip");
        std::fs::write(&archive, b"PK").unwrap();

        remove_dir(&sub);
        remove_file(&archive);
        assert!(!sub.exists());
        assert!(!archive.exists());
    }
}
