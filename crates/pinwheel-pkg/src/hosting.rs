//! GitHub/GitLab access over HTTP.
//!
//! This module provides:
//! - Mapping a repository URL to its hosting service
//! - Raw file download at a commit
//! - Root directory listing through the hosting API

use crate::fetch::{FetchError, Fetcher};
use crate::pin::URL_SCHEME_PREFIX;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::time::Duration;

/// Characters escaped in a GitLab project path (`group/repo` -> `group%2Frepo`).
const PROJECT_PATH: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// A repository on a supported hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repository {
    /// `https://github.com/<owner>/<repo>`
    GitHub { owner: String, repo: String },
    /// `https://<host>/<project path>` on a GitLab instance.
    GitLab { base: String, project: String },
}

impl Repository {
    /// Identify the hosting service of a repository URL.
    ///
    /// Accepts URLs with or without the `git+` prefix and `.git` suffix.
    pub fn parse(url: &str) -> Result<Self, FetchError> {
        let url = url.strip_prefix(URL_SCHEME_PREFIX).unwrap_or(url);
        let url = url.trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);
        let unsupported = || FetchError::UnsupportedHost(url.to_string());

        let (scheme, rest) = url.split_once("://").ok_or_else(unsupported)?;
        let (host, path) = rest.split_once('/').ok_or_else(unsupported)?;
        if path.is_empty() {
            return Err(unsupported());
        }

        if host == "github.com" {
            let (owner, repo) = path.split_once('/').ok_or_else(unsupported)?;
            if owner.is_empty() || repo.is_empty() || repo.contains('/') {
                return Err(unsupported());
            }
            Ok(Self::GitHub {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
        } else if host.contains("gitlab") {
            Ok(Self::GitLab {
                base: format!("{scheme}://{host}"),
                project: path.to_string(),
            })
        } else {
            Err(unsupported())
        }
    }

    /// URL of the raw contents of `path` at `commit`.
    #[must_use]
    pub fn raw_file_url(&self, commit: &str, path: &str) -> String {
        match self {
            Self::GitHub { owner, repo } => {
                format!("https://raw.githubusercontent.com/{owner}/{repo}/{commit}/{path}")
            }
            Self::GitLab { base, project } => format!("{base}/{project}/-/raw/{commit}/{path}"),
        }
    }

    /// API URL listing the repository root at `commit`.
    #[must_use]
    pub fn root_listing_url(&self, commit: &str) -> String {
        match self {
            Self::GitHub { owner, repo } => {
                format!("https://api.github.com/repos/{owner}/{repo}/contents?ref={commit}")
            }
            Self::GitLab { base, project } => format!(
                "{base}/api/v4/projects/{}/repository/tree?ref={commit}",
                utf8_percent_encode(project, PROJECT_PATH)
            ),
        }
    }

    /// Entry type used for plain files in root listings.
    fn file_type(&self) -> &'static str {
        match self {
            Self::GitHub { .. } => "file",
            Self::GitLab { .. } => "blob",
        }
    }
}

/// One entry of a GitHub contents or GitLab tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

/// Configuration for the hosting client.
#[derive(Debug, Clone)]
pub struct HostingConfig {
    /// Optional GitHub token for API authentication.
    pub github_token: Option<String>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            github_token: std::env::var("GITHUB_TOKEN").ok(),
            user_agent: format!("pinwheel/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(60),
        }
    }
}

/// [`Fetcher`] backed by the GitHub and GitLab HTTP endpoints.
pub struct HostingClient {
    config: HostingConfig,
    http_client: reqwest::blocking::Client,
}

impl HostingClient {
    /// Create a client with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(HostingConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: HostingConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build a GET request, authenticated for GitHub API calls.
    fn build_request(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut req = self.http_client.get(url);
        if url.starts_with("https://api.github.com/") {
            req = req.header("Accept", "application/vnd.github.v3+json");
            if let Some(ref token) = self.config.github_token {
                req = req.header("Authorization", format!("Bearer {token}"));
            }
        }
        req
    }

    /// Send a GET request and map error statuses.
    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let response = self
            .build_request(url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        // GitHub answers 403 with a zero remaining count when rate limited
        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN
            && response
                .headers()
                .get("X-RateLimit-Remaining")
                .is_some_and(|v| v == "0")
        {
            return Err(FetchError::RateLimitExceeded);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "{url} returned status {status}"
            )));
        }
        Ok(response)
    }
}

impl Fetcher for HostingClient {
    fn get_file(&self, repo: &str, commit: &str, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = Repository::parse(repo)?.raw_file_url(commit, path);
        let bytes = self
            .get(&url)?
            .bytes()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn list_root_files(&self, repo: &str, commit: &str) -> Result<Vec<String>, FetchError> {
        let repository = Repository::parse(repo)?;
        let body = self
            .get(&repository.root_listing_url(commit))?
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let entries: Vec<ListingEntry> =
            serde_json::from_str(&body).map_err(|e| FetchError::Json(e.to_string()))?;
        Ok(root_files(&repository, entries))
    }
}

/// Names of plain files directly at the root.
fn root_files(repository: &Repository, entries: Vec<ListingEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| e.kind == repository.file_type() && !e.path.contains('/'))
        .map(|e| e.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github() {
        let repo = Repository::parse("git+https://github.com/mit-pdos/perennial.git").unwrap();
        assert_eq!(
            repo,
            Repository::GitHub {
                owner: "mit-pdos".to_string(),
                repo: "perennial".to_string(),
            }
        );
        assert_eq!(
            repo.raw_file_url("abc", "perennial.opam"),
            "https://raw.githubusercontent.com/mit-pdos/perennial/abc/perennial.opam"
        );
        assert_eq!(
            repo.root_listing_url("abc"),
            "https://api.github.com/repos/mit-pdos/perennial/contents?ref=abc"
        );
    }

    #[test]
    fn test_parse_gitlab() {
        let repo = Repository::parse("https://gitlab.mpi-sws.org/iris/stdpp").unwrap();
        assert_eq!(
            repo.raw_file_url("abc", "rocq-stdpp.opam"),
            "https://gitlab.mpi-sws.org/iris/stdpp/-/raw/abc/rocq-stdpp.opam"
        );
        assert_eq!(
            repo.root_listing_url("abc"),
            "https://gitlab.mpi-sws.org/api/v4/projects/iris%2Fstdpp/repository/tree?ref=abc"
        );
    }

    #[test]
    fn test_parse_unsupported() {
        assert!(matches!(
            Repository::parse("https://example.com/a/b"),
            Err(FetchError::UnsupportedHost(_))
        ));
        assert!(Repository::parse("github.com/a/b").is_err());
        assert!(Repository::parse("https://github.com/only-owner").is_err());
    }

    #[test]
    fn test_root_files_filters_directories() {
        let json = r#"[
            {"name": "perennial.opam", "type": "file", "path": "perennial.opam"},
            {"name": "src", "type": "dir", "path": "src"},
            {"name": "Makefile", "type": "file", "path": "Makefile"}
        ]"#;
        let entries: Vec<ListingEntry> = serde_json::from_str(json).unwrap();
        let repo = Repository::parse("https://github.com/a/b").unwrap();
        assert_eq!(root_files(&repo, entries), ["perennial.opam", "Makefile"]);

        let json = r#"[
            {"id": "1", "name": "stdpp", "type": "tree", "path": "stdpp", "mode": "040000"},
            {"id": "2", "name": "rocq-stdpp.opam", "type": "blob", "path": "rocq-stdpp.opam", "mode": "100644"}
        ]"#;
        let entries: Vec<ListingEntry> = serde_json::from_str(json).unwrap();
        let repo = Repository::parse("https://gitlab.com/a/b").unwrap();
        assert_eq!(root_files(&repo, entries), ["rocq-stdpp.opam"]);
    }
}
