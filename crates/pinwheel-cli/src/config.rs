//! Project configuration (`pinwheel.toml`).

use anyhow::{Context, Result};
use pinwheel_pkg::{Fetcher, HostingClient, HostingConfig, Resolver, DEFAULT_RULES_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The configuration file name.
pub const CONFIG_FILE: &str = "pinwheel.toml";

/// Optional settings read from `pinwheel.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Packages skipped during resolution, in addition to the built-in ones.
    #[serde(default)]
    pub leaf_packages: Vec<String>,

    /// Number of manifests fetched concurrently.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// GitHub API token, overriding `GITHUB_TOKEN`.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Dependency rules used by `deps` and `targets`.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

impl Config {
    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Load `pinwheel.toml` from `dir`, or the defaults if there is none.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// The rules file for `deps` and `targets`.
    pub fn rules_file(&self) -> PathBuf {
        self.rules_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_FILE))
    }

    /// An HTTP client for GitHub and GitLab.
    pub fn hosting_client(&self) -> Result<HostingClient> {
        let mut config = HostingConfig::default();
        if let Some(ref token) = self.github_token {
            config.github_token = Some(token.clone());
        }
        HostingClient::with_config(config).context("Failed to create HTTP client")
    }

    /// A resolver over `fetcher` with the configured leaf packages and jobs.
    pub fn resolver<F: Fetcher + ?Sized + 'static>(&self, fetcher: Arc<F>) -> Resolver<F> {
        let resolver = Resolver::new(fetcher).extend_leaf_packages(self.leaf_packages.iter().cloned());
        match self.jobs {
            Some(jobs) => resolver.with_jobs(jobs),
            None => resolver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
leaf-packages = ["my-leaf"]
jobs = 4
github-token = "secret"
rules-file = "build/.rocqdeps.d"
"#,
        )
        .unwrap();
        assert_eq!(config.leaf_packages, ["my-leaf"]);
        assert_eq!(config.jobs, Some(4));
        assert_eq!(config.github_token.as_deref(), Some("secret"));
        assert_eq!(config.rules_file(), PathBuf::from("build/.rocqdeps.d"));
    }

    #[test]
    fn test_empty_config() {
        let config = Config::parse("").unwrap();
        assert!(config.leaf_packages.is_empty());
        assert_eq!(config.jobs, None);
        assert_eq!(config.rules_file(), PathBuf::from(".rocqdeps.d"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(Config::parse("leaf_packages = []").is_err());
        assert!(Config::parse("colour = true").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.github_token.is_none());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "jobs = 2\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.jobs, Some(2));
    }

    #[test]
    fn test_resolver_extends_leaf_packages() {
        struct NoFetch;
        impl Fetcher for NoFetch {
            fn get_file(&self, _: &str, _: &str, _: &str) -> Result<Vec<u8>, pinwheel_pkg::FetchError> {
                unreachable!()
            }
            fn list_root_files(&self, _: &str, _: &str) -> Result<Vec<String>, pinwheel_pkg::FetchError> {
                unreachable!()
            }
        }

        let config = Config::parse("leaf-packages = [\"my-leaf\"]").unwrap();
        let resolver = config.resolver(Arc::new(NoFetch));
        assert!(resolver.is_leaf("my-leaf"));
        assert!(resolver.is_leaf("rocq-stdpp"));
    }
}
