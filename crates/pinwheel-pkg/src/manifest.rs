//! Opam manifest editing.
//!
//! [`Manifest`] is a typed view over a [`Document`]: it reads and writes the
//! `depends` and `pin-depends` blocks and leaves every other line exactly as
//! it was.

use crate::document::Document;
use crate::pin::PinDependency;
use crate::region::{Region, StructuralError};
use std::fmt;
use std::ops::Range;
use std::path::Path;

/// Marker line opening the indirect section of `pin-depends`.
pub const BEGIN_INDIRECT: &str = "  ## begin indirect";

/// Marker line closing the indirect section of `pin-depends`.
pub const END_INDIRECT: &str = "  ## end";

/// Extension of opam manifest files.
pub const MANIFEST_EXT: &str = "opam";

/// Path of a package's manifest relative to its repository root.
#[must_use]
pub fn manifest_file_name(package: &str) -> String {
    format!("{package}.{MANIFEST_EXT}")
}

/// An opam manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    doc: Document,
}

impl Manifest {
    /// Parse manifest text.
    ///
    /// # Errors
    ///
    /// Returns an error if a block or indirect marker is unbalanced.
    pub fn parse(text: &str) -> Result<Self, StructuralError> {
        Ok(Self {
            doc: Document::parse(text)?,
        })
    }

    /// Parse a manifest from raw bytes (lossy UTF-8).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StructuralError> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Render the manifest back to text.
    #[must_use]
    pub fn serialize(&self) -> String {
        self.doc.serialize()
    }

    /// Direct pin dependencies, in file order.
    ///
    /// Entries in the indirect section are excluded.
    #[must_use]
    pub fn list_direct(&self) -> Vec<PinDependency> {
        let Some(pins) = self.doc.regions().pin_depends else {
            return Vec::new();
        };
        self.entries(pins.inner())
            .filter(|(i, _)| !self.doc.regions().in_indirect(*i))
            .map(|(_, dep)| dep)
            .collect()
    }

    /// Indirect pin dependencies, in file order.
    #[must_use]
    pub fn list_indirect(&self) -> Vec<PinDependency> {
        match self.doc.regions().indirect {
            Some(indirect) => self.entries(indirect.inner()).map(|(_, dep)| dep).collect(),
            None => Vec::new(),
        }
    }

    /// Add or update a direct pin dependency.
    ///
    /// An entry for the same package in the indirect section is moved out of
    /// it. New entries go directly below the `pin-depends: [` line, so a
    /// series of new packages ends up in reverse order of insertion.
    pub fn upsert_direct(&mut self, dep: &PinDependency) -> Result<(), StructuralError> {
        let dep = dep.clone().normalized();
        let pins = self.ensure_pin_depends()?;

        // Look in the whole block, indirect section included
        let existing = self
            .entries(pins.inner())
            .find(|(_, e)| e.package == dep.package)
            .map(|(i, _)| i);

        match existing {
            Some(i) if self.doc.regions().in_indirect(i) => {
                // The entry sits below the opening line, so `pins.start` holds.
                self.doc.remove_line(i)?;
                self.doc.insert_lines(pins.start + 1, vec![dep.to_string()])
            }
            Some(i) => self.doc.replace_line(i, dep.to_string()),
            None => self.doc.insert_lines(pins.start + 1, vec![dep.to_string()]),
        }
    }

    /// Remove a direct pin dependency. Returns false if there was none.
    pub fn remove_direct(&mut self, package: &str) -> Result<bool, StructuralError> {
        let Some(line) = self.find_direct(package) else {
            return Ok(false);
        };
        self.doc.remove_line(line)?;
        Ok(true)
    }

    /// Replace the indirect section with `deps`.
    ///
    /// Packages that already have a direct entry are updated in place and
    /// left out of the indirect section. Without an existing section, one is
    /// added before the closing `]` of `pin-depends` unless there is nothing
    /// to put in it.
    pub fn set_indirect_set(&mut self, deps: &[PinDependency]) -> Result<(), StructuralError> {
        // Direct pins are updated where they are
        let mut indirect = Vec::with_capacity(deps.len());
        for dep in deps {
            let dep = dep.clone().normalized();
            match self.find_direct(&dep.package) {
                Some(line) => self.doc.replace_line(line, dep.to_string())?,
                None => indirect.push(dep),
            }
        }

        if indirect.is_empty() && self.doc.regions().indirect.is_none() {
            return Ok(());
        }

        let mut block = Vec::with_capacity(indirect.len() + 3);
        block.push(BEGIN_INDIRECT.to_string());
        block.extend(indirect.iter().map(ToString::to_string));
        block.push(END_INDIRECT.to_string());

        if let Some(region) = self.doc.regions().indirect {
            return self.doc.splice(region.start..region.end, block);
        }

        // New section: blank separator line, then the block before `]`
        let pins = self.ensure_pin_depends()?;
        block.insert(0, String::new());
        self.doc.insert_lines(pins.close_line(), block)
    }

    /// Package names in the `depends` block, without version constraints.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let Some(depends) = self.doc.regions().depends else {
            return Vec::new();
        };
        depends
            .inner()
            .filter_map(|i| self.doc.line(i))
            .filter_map(depends_entry)
            .map(String::from)
            .collect()
    }

    /// Add `package` to the `depends` block unless already listed.
    ///
    /// Like pin entries, new names go directly below `depends: [`.
    pub fn add_dependency(&mut self, package: &str) -> Result<bool, StructuralError> {
        if self.dependencies().iter().any(|d| d == package) {
            return Ok(false);
        }
        let depends = self.ensure_depends()?;
        self.doc
            .insert_lines(depends.start + 1, vec![format!("  \"{package}\"")])?;
        Ok(true)
    }

    /// Index of the direct (non-indirect) entry for `package`.
    fn find_direct(&self, package: &str) -> Option<usize> {
        let pins = self.doc.regions().pin_depends?;
        self.entries(pins.inner())
            .find(|(i, dep)| !self.doc.regions().in_indirect(*i) && dep.package == package)
            .map(|(i, _)| i)
    }

    /// Parsed pin entries within `range`, with their line indices.
    fn entries(&self, range: Range<usize>) -> impl Iterator<Item = (usize, PinDependency)> + '_ {
        range.filter_map(move |i| {
            self.doc
                .line(i)
                .and_then(PinDependency::parse_line)
                .map(|dep| (i, dep))
        })
    }

    /// The `depends` region, appending an empty block at the end if missing.
    fn ensure_depends(&mut self) -> Result<Region, StructuralError> {
        if let Some(region) = self.doc.regions().depends {
            return Ok(region);
        }
        let at = self.doc.len();
        self.doc
            .insert_lines(at, vec!["depends: [".to_string(), "]".to_string()])?;
        Ok(Region { start: at, end: at + 2 })
    }

    /// The `pin-depends` region, adding an empty block after `depends` (or
    /// at the end) if missing.
    fn ensure_pin_depends(&mut self) -> Result<Region, StructuralError> {
        if let Some(region) = self.doc.regions().pin_depends {
            return Ok(region);
        }
        let at = self
            .doc
            .regions()
            .depends
            .map_or(self.doc.len(), |r| r.end);
        self.doc
            .insert_lines(at, vec!["pin-depends: [".to_string(), "]".to_string()])?;
        Ok(Region { start: at, end: at + 2 })
    }
}

/// Name of a `depends` entry such as `"coq-record-update" { (>= "0.3.6") }`.
fn depends_entry(line: &str) -> Option<&str> {
    let inner = line.trim_start().strip_prefix('"')?;
    let end = inner.find('"')?;
    Some(&inner[..end])
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.doc, f)
    }
}

/// Errors from reading a manifest file.
#[derive(thiserror::Error, Debug)]
pub enum ManifestFileError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestFileError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content)?)
    }
}
