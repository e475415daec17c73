//! Access to files in remote repositories at a given commit.

use crate::manifest::MANIFEST_EXT;
use thiserror::Error;

/// Errors that can occur while fetching remote files.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The repository is not on a supported hosting service.
    #[error("unsupported git hosting service: {0}")]
    UnsupportedHost(String),

    /// The requested file or repository does not exist.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Network error during fetch.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed API response.
    #[error("JSON error: {0}")]
    Json(String),

    /// API rate limit exceeded.
    #[error("API rate limit exceeded. Try again later or provide a GITHUB_TOKEN")]
    RateLimitExceeded,

    /// No opam file at the repository root.
    #[error("no opam files found in {repo}")]
    NoPackage { repo: String },

    /// More than one opam file at the repository root.
    #[error("multiple opam files found in {repo}: {}", .names.join(", "))]
    MultiplePackages { repo: String, names: Vec<String> },
}

/// Read access to repositories pinned at a commit.
///
/// Implementations must be shareable across threads: the resolver fetches
/// manifests of different dependencies concurrently.
pub trait Fetcher: Send + Sync {
    /// Contents of `path` in `repo` at `commit`.
    fn get_file(&self, repo: &str, commit: &str, path: &str) -> Result<Vec<u8>, FetchError>;

    /// Names of the files at the root of `repo` at `commit` (no recursion).
    fn list_root_files(&self, repo: &str, commit: &str) -> Result<Vec<String>, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get_file(&self, repo: &str, commit: &str, path: &str) -> Result<Vec<u8>, FetchError> {
        (**self).get_file(repo, commit, path)
    }

    fn list_root_files(&self, repo: &str, commit: &str) -> Result<Vec<String>, FetchError> {
        (**self).list_root_files(repo, commit)
    }
}

/// Name of the unique opam package at the root of `repo`.
///
/// The package name is the opam file name without its extension.
pub fn find_package_name<F: Fetcher + ?Sized>(
    fetcher: &F,
    repo: &str,
    commit: &str,
) -> Result<String, FetchError> {
    let suffix = format!(".{MANIFEST_EXT}");
    let mut names: Vec<String> = Vec::new();
    for file in fetcher.list_root_files(repo, commit)? {
        if let Some(name) = file.strip_suffix(&suffix) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    match names.len() {
        0 => Err(FetchError::NoPackage {
            repo: repo.to_string(),
        }),
        1 => Ok(names.remove(0)),
        _ => Err(FetchError::MultiplePackages {
            repo: repo.to_string(),
            names,
        }),
    }
}
