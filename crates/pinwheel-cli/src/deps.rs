//! Implementation of the `pinwheel deps` and `pinwheel targets` commands.

use anyhow::{Context, Result};
use pinwheel_pkg::{load_rules, reverse_targets, source_deps};
use std::path::Path;

/// Which direction to query the build graph in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Source files needed to build the arguments.
    Sources,
    /// Source files affected by changes to the arguments.
    Dependents,
}

/// Run `query` for `files` against the rules in `rules`.
pub fn query(rules: &Path, query: Query, files: &[String]) -> Result<Vec<String>> {
    let graph = load_rules(rules)
        .with_context(|| format!("Failed to load dependency rules from {}", rules.display()))?;
    Ok(match query {
        Query::Sources => source_deps(&graph, files),
        Query::Dependents => reverse_targets(&graph, files),
    })
}
