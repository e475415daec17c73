//! Implementation of the `pinwheel opam add` command.

use crate::config::Config;
use crate::opam::{OpamFile, Progress};
use anyhow::{Context, Result};
use pinwheel_pkg::{abbreviate_hash, find_package_name, Fetcher, PinDependency, URL_SCHEME_PREFIX};
use std::path::PathBuf;
use std::sync::Arc;

/// Options for adding a pinned dependency.
#[derive(Debug)]
pub struct AddOptions {
    /// Repository URL, optionally followed by `#<commit>`.
    pub url: String,
    /// Package name; found from the repository's opam file if not given.
    pub package: Option<String>,
    /// The opam file to edit.
    pub file: PathBuf,
}

/// Split `url#commit` into its parts. The `git+` prefix is dropped.
fn parse_url(spec: &str) -> (String, Option<String>) {
    let spec = spec.strip_prefix(URL_SCHEME_PREFIX).unwrap_or(spec);
    match spec.split_once('#') {
        Some((url, commit)) if !commit.is_empty() => (url.to_string(), Some(commit.to_string())),
        Some((url, _)) => (url.to_string(), None),
        None => (spec.to_string(), None),
    }
}

/// Add or update a pinned dependency and refresh the indirect set.
pub fn add_dependency(options: AddOptions, config: &Config, progress: Progress) -> Result<()> {
    let (url, commit) = parse_url(&options.url);
    let commit = match commit {
        Some(commit) => commit,
        None => {
            progress.step("fetching latest commit...");
            pinwheel_pkg::latest_commit(&url).context("Failed to get latest commit")?
        }
    };

    let client = Arc::new(config.hosting_client()?);
    let package = match options.package {
        Some(package) => package,
        None => {
            progress.step("finding opam package in repository...");
            // Listing APIs want a full hash; ls-remote only knows ref tips.
            let full = pinwheel_pkg::resolve_commit(&url, &commit).unwrap_or_else(|e| {
                eprintln!("Warning: {e}; listing files at {commit}");
                commit.clone()
            });
            find_package_name(&*client, &url, &full).context("Failed to find opam package")?
        }
    };

    let mut file = OpamFile::open(options.file)?;
    let dep = PinDependency::new(package, url, Some(commit));
    pin(&mut file, &dep, config, client)?;
    file.save()?;

    progress.step(format!(
        "added {} (pinned to {})",
        dep.package,
        dep.commit.as_deref().map_or("", abbreviate_hash)
    ));
    Ok(())
}

/// Record `dep` in both blocks of the manifest and re-resolve.
fn pin<F: Fetcher + ?Sized + 'static>(
    file: &mut OpamFile,
    dep: &PinDependency,
    config: &Config,
    fetcher: Arc<F>,
) -> Result<()> {
    file.manifest.add_dependency(&dep.package)?;
    file.manifest.upsert_direct(dep)?;
    config
        .resolver(fetcher)
        .resolve(&mut file.manifest)
        .context("Failed to update indirect dependencies")
}
