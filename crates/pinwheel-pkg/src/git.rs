//! Commit lookup on git remotes through `git ls-remote`.

use crate::pin::URL_SCHEME_PREFIX;
use std::process::Command;
use thiserror::Error;

/// Length of a full SHA-1 commit hash.
pub const FULL_HASH_LEN: usize = 40;

/// Errors from querying a git remote.
#[derive(Error, Debug)]
pub enum GitError {
    /// `git` could not be started.
    #[error("failed to run git ls-remote: {0}")]
    Spawn(#[from] std::io::Error),

    /// `git ls-remote` exited with an error.
    #[error("git ls-remote {url} failed: {stderr}")]
    Failed { url: String, stderr: String },

    /// The remote has no HEAD.
    #[error("unexpected git ls-remote output for {url}: {output}")]
    UnexpectedOutput { url: String, output: String },

    /// No ref on the remote matches an abbreviated hash.
    #[error("commit {commit} not found in remote {url}")]
    CommitNotFound { url: String, commit: String },
}

/// URL as passed to git: no `git+` prefix, and GitLab URLs end in `.git`
/// to avoid a redirect warning.
fn remote_url(url: &str) -> String {
    let url = url.strip_prefix(URL_SCHEME_PREFIX).unwrap_or(url);
    if url.starts_with("https://gitlab") && !url.ends_with(".git") {
        format!("{url}.git")
    } else {
        url.to_string()
    }
}

fn ls_remote(url: &str, extra: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("ls-remote")
        .arg(url)
        .args(extra)
        .output()?;

    if !output.status.success() {
        return Err(GitError::Failed {
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// First hash in `ls-remote` output (`<hash>\t<ref>` lines).
fn first_hash(output: &str) -> Option<&str> {
    output.split_whitespace().next()
}

/// Hash of the first ref whose hash starts with `prefix`.
fn matching_hash<'a>(output: &'a str, prefix: &str) -> Option<&'a str> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find(|hash| hash.starts_with(prefix))
}

/// Full hash of the default branch head of `url`.
pub fn latest_commit(url: &str) -> Result<String, GitError> {
    let url = remote_url(url);
    let output = ls_remote(&url, &["HEAD"])?;
    first_hash(&output)
        .map(String::from)
        .ok_or(GitError::UnexpectedOutput { url, output })
}

/// Expand an abbreviated commit to the full hash of a ref on the remote.
///
/// Full hashes are returned unchanged without contacting the remote.
pub fn resolve_commit(url: &str, commit: &str) -> Result<String, GitError> {
    if commit.len() == FULL_HASH_LEN {
        return Ok(commit.to_string());
    }
    let url = remote_url(url);
    let output = ls_remote(&url, &[])?;
    matching_hash(&output, commit)
        .map(String::from)
        .ok_or_else(|| GitError::CommitNotFound {
            url,
            commit: commit.to_string(),
        })
}
