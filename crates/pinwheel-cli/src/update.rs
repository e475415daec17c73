//! Implementation of the `pinwheel opam update` and `pinwheel opam indirect`
//! commands.

use crate::config::Config;
use crate::opam::{OpamFile, Progress};
use anyhow::{bail, Context, Result};
use pinwheel_pkg::{abbreviate_hash, Fetcher, Manifest};
use std::path::PathBuf;
use std::sync::Arc;

/// Options for the update command.
#[derive(Debug)]
pub struct UpdateOptions {
    /// Only update this package.
    pub package: Option<String>,
    /// The opam file to edit.
    pub file: PathBuf,
}

/// A pin moved to a new commit.
#[derive(Debug, PartialEq, Eq)]
pub struct PinChange {
    pub package: String,
    pub from: String,
    pub to: String,
}

/// Result of an update.
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Direct pins that moved.
    pub upgraded: Vec<PinChange>,
    /// Whether the opam file was rewritten.
    pub written: bool,
}

impl UpdateResult {
    /// Print a summary of the changes.
    pub fn print_summary(&self, progress: Progress) {
        if !self.written {
            progress.step("already up to date");
            return;
        }
        if self.upgraded.is_empty() {
            progress.step("updated indirect dependencies");
            return;
        }
        progress.step(format!("upgraded {} packages:", self.upgraded.len()));
        for change in &self.upgraded {
            progress.step(format!("  {}: {} -> {}", change.package, change.from, change.to));
        }
    }
}

/// Move direct pins to the latest commit of their default branch, then
/// refresh the indirect set.
pub fn update_dependencies(options: UpdateOptions, config: &Config) -> Result<UpdateResult> {
    let mut file = OpamFile::open(options.file)?;
    let client = Arc::new(config.hosting_client()?);

    let upgraded = upgrade_pins(&mut file.manifest, options.package.as_deref(), |url| {
        pinwheel_pkg::latest_commit(url).map_err(Into::into)
    })?;
    refresh_indirect(&mut file.manifest, config, client)?;

    let written = file.save()?;
    Ok(UpdateResult { upgraded, written })
}

/// Re-resolve only the indirect set.
pub fn update_indirect(file: PathBuf, config: &Config) -> Result<UpdateResult> {
    let mut file = OpamFile::open(file)?;
    let client = Arc::new(config.hosting_client()?);
    refresh_indirect(&mut file.manifest, config, client)?;
    let written = file.save()?;
    Ok(UpdateResult {
        upgraded: Vec::new(),
        written,
    })
}

fn refresh_indirect<F: Fetcher + ?Sized + 'static>(
    manifest: &mut Manifest,
    config: &Config,
    fetcher: Arc<F>,
) -> Result<()> {
    config
        .resolver(fetcher)
        .resolve(manifest)
        .context("Failed to update indirect dependencies")
}

/// Point each selected direct pin at the commit returned by `latest`.
fn upgrade_pins<L>(manifest: &mut Manifest, only: Option<&str>, latest: L) -> Result<Vec<PinChange>>
where
    L: Fn(&str) -> Result<String>,
{
    let direct = manifest.list_direct();
    if let Some(package) = only {
        if !direct.iter().any(|dep| dep.package == package) {
            bail!("`{package}` is not a pinned dependency");
        }
    }

    let mut changes = Vec::new();
    for mut dep in direct {
        if only.is_some_and(|package| package != dep.package) {
            continue;
        }
        let hash = latest(&dep.url)
            .with_context(|| format!("Failed to get latest commit of {}", dep.package))?;
        let hash = abbreviate_hash(&hash).to_string();
        if dep.commit.as_deref() == Some(hash.as_str()) {
            continue;
        }

        let from = dep.commit.replace(hash.clone()).unwrap_or_default();
        manifest.upsert_direct(&dep)?;
        changes.push(PinChange {
            package: dep.package,
            from,
            to: hash,
        });
    }
    Ok(changes)
}
