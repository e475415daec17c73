//! Pinned dependency management for Rocq/opam projects.
//!
//! This crate provides:
//! - In-place editing of the `depends` and `pin-depends` blocks of opam files,
//!   preserving all other text byte for byte
//! - Resolution of indirect pin dependencies from the manifests of direct ones
//! - Remote file access on GitHub and GitLab, and commit lookup with git
//! - Transitive queries over `rocq dep` build-dependency rules

mod depgraph;
mod document;
mod fetch;
mod git;
mod hosting;
mod manifest;
mod pin;
mod region;
mod resolve;
mod rocq;

pub use depgraph::{Dep, DependencyGraph, GraphError};
pub use document::{Document, LineEnding};
pub use fetch::{find_package_name, FetchError, Fetcher};
pub use git::{latest_commit, resolve_commit, GitError, FULL_HASH_LEN};
pub use hosting::{HostingClient, HostingConfig, ListingEntry, Repository};
pub use manifest::{
    manifest_file_name, Manifest, ManifestFileError, BEGIN_INDIRECT, END_INDIRECT, MANIFEST_EXT,
};
pub use pin::{abbreviate_hash, PinDependency, HASH_ABBREV_LEN, PACKAGE_SUFFIX, URL_SCHEME_PREFIX};
pub use region::{
    begins_indirect, closes_block, closes_on_same_line, ends_indirect, opens_block, scan, Region,
    Regions, StructuralError, DEPENDS_KEY, PIN_DEPENDS_KEY,
};
pub use resolve::{ResolveError, Resolver, DEFAULT_LEAF_PACKAGES};
pub use rocq::{
    filter_artifacts, is_artifact, load_rules, reverse_targets, set_extension, source_deps,
    DEFAULT_RULES_FILE,
};
