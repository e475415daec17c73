//! Shared helpers for the `pinwheel opam` commands.

use anyhow::{bail, Context, Result};
use pinwheel_pkg::{Manifest, PinDependency, MANIFEST_EXT};
use std::path::{Path, PathBuf};

/// Progress output on stdout, silenced by `--quiet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub quiet: bool,
}

impl Progress {
    pub fn step(self, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("{message}");
        }
    }
}

/// The opam file to operate on: `file` if given, else the only `*.opam` in
/// `dir`.
pub fn manifest_path(file: Option<PathBuf>, dir: &Path) -> Result<PathBuf> {
    if let Some(file) = file {
        return Ok(file);
    }

    let mut found = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == MANIFEST_EXT) {
            found.push(path);
        }
    }

    match found.len() {
        1 => Ok(found.remove(0)),
        0 => bail!("No opam file provided and none found in {}", dir.display()),
        n => bail!(
            "No opam file provided and {n} found in {}; pass one with --file",
            dir.display()
        ),
    }
}

/// An opam file as read from disk, kept to detect changes.
pub struct OpamFile {
    pub path: PathBuf,
    pub original: String,
    pub manifest: Manifest,
}

impl OpamFile {
    pub fn open(path: PathBuf) -> Result<Self> {
        let original = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest = Manifest::parse(&original)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self {
            path,
            original,
            manifest,
        })
    }

    /// Write the manifest back if it changed. Returns whether it was written.
    pub fn save(&self) -> Result<bool> {
        let content = self.manifest.serialize();
        if content == self.original {
            return Ok(false);
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(true)
    }
}

/// Print the direct and indirect pins of a manifest.
pub fn list(file: &OpamFile) {
    let direct = file.manifest.list_direct();
    let indirect = file.manifest.list_indirect();

    if direct.is_empty() && indirect.is_empty() {
        println!("No pinned dependencies.");
        return;
    }
    for dep in &direct {
        println!("{}", describe(dep));
    }
    if !indirect.is_empty() {
        println!("indirect:");
        for dep in &indirect {
            println!("  {}", describe(dep));
        }
    }
}

fn describe(dep: &PinDependency) -> String {
    match dep.commit {
        Some(ref commit) => format!("{} {} ({commit})", dep.package, dep.url),
        None => format!("{} {}", dep.package, dep.url),
    }
}
