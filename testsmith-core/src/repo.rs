//! Repository identity and fetching.
//!
//! The identifier is a pure function of the URL (last path segment,
//! extension stripped) and doubles as the clone directory name and the
//! base name of the final archive. Cloning shells out to `git`, and is
//! idempotent: an existing directory at the target path is trusted as-is.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info};

use crate::error::{Error, Result};

/// Derives the repository identifier from its URL: the final path segment
/// with any trailing extension removed. No network access.
///
/// A URL without a path segment (e.g. `https://host` or `https://host/`)
/// is rejected, since the identifier names directories on disk.
pub fn repo_name_from_url(repo_url: &str) -> Result<String> {
    let invalid = || Error::InvalidRepoUrl {
        url: repo_url.to_string(),
    };

    let path = repo_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    // Skip past the scheme so a bare `scheme://host` is not mistaken for
    // a host/segment pair.
    let path = match path.find("://") {
        Some(idx) => &path[idx + 3..],
        None => path,
    };
    let path = path.trim_end_matches('/');

    // The first component is the host (or `user@host:...` for scp-style
    // URLs); everything after the last slash is the repository segment.
    let (_, segment) = path.rsplit_once('/').ok_or_else(invalid)?;

    let name = match segment.rfind('.') {
        Some(idx) if idx > 0 => &segment[..idx],
        _ => segment,
    };
    if name.is_empty() {
        return Err(invalid());
    }
    Ok(name.to_string())
}

/// Clones `repo_url` into `<workspace>/<identifier>` and returns that path.
///
/// If the directory already exists the clone is skipped entirely and the
/// existing contents are used, so re-running against a cached checkout is
/// cheap and offline.
pub fn clone_repo(repo_url: &str, workspace: &Path) -> Result<PathBuf> {
    let repo_name = repo_name_from_url(repo_url)?;
    let repo_path = workspace.join(&repo_name);

    if repo_path.exists() {
        info!(
            path = %repo_path.display(),
            "Repository already present, skipping clone"
        );
        return Ok(repo_path);
    }

    let output = Command::new("git")
        .arg("clone")
        .arg(repo_url)
        .arg(&repo_path)
        .output()
        .map_err(|e| {
            error!(error = ?e, repo_url, "Failed to launch git process");
            Error::Fetch {
                url: repo_url.to_string(),
                message: format!("failed to launch git: {e}"),
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(
            repo_url,
            status = ?output.status,
            stderr = %stderr,
            "Git clone failed"
        );
        let message = if stderr.is_empty() {
            format!("git clone exited with {}", output.status)
        } else {
            stderr
        };
        return Err(Error::Fetch {
            url: repo_url.to_string(),
            message,
        });
    }

    info!(repo_url, path = %repo_path.display(), "Cloned repository");
    Ok(repo_path)
}
