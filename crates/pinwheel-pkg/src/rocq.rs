//! Rocq build artifact queries over a [`DependencyGraph`].
//!
//! `rocq dep` output mentions many auxiliary files (`.glob`, `.vos`, the
//! worker binary, ...). Only sources (`.v`) and compiled objects (`.vo`) are
//! kept.

use crate::depgraph::{DependencyGraph, GraphError};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Default location of the generated dependency rules.
pub const DEFAULT_RULES_FILE: &str = ".rocqdeps.d";

const SOURCE_EXT: &str = ".v";
const OBJECT_EXT: &str = ".vo";

/// Returns true for `.v` and `.vo` files.
pub fn is_artifact(name: &str) -> bool {
    name.ends_with(SOURCE_EXT) || name.ends_with(OBJECT_EXT)
}

/// Drop every edge touching a non-artifact node.
pub fn filter_artifacts(graph: &mut DependencyGraph) {
    graph.filter_nodes(is_artifact);
}

/// Read a rules file and keep only artifact nodes.
pub fn load_rules(path: impl AsRef<Path>) -> Result<DependencyGraph, GraphError> {
    let file = File::open(path)?;
    let mut graph = DependencyGraph::from_reader(file)?;
    filter_artifacts(&mut graph);
    Ok(graph)
}

/// Replace the extension of the last path component, or append `ext`.
///
/// `ext` includes the leading dot.
pub fn set_extension(path: &str, ext: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let stem = match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    };
    format!("{stem}{ext}")
}

/// Keep the first occurrence of each item.
fn dedup_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Source files needed to build `args`.
///
/// Arguments may name either `.v` or `.vo` files; `.v` arguments are looked
/// up through their `.vo` target.
pub fn source_deps<S: AsRef<str>>(graph: &DependencyGraph, args: &[S]) -> Vec<String> {
    let targets: Vec<String> = args
        .iter()
        .map(|arg| {
            let arg = arg.as_ref();
            match arg.strip_suffix(SOURCE_EXT) {
                Some(stem) => format!("{stem}{OBJECT_EXT}"),
                None => arg.to_string(),
            }
        })
        .collect();

    dedup_in_order(
        graph
            .forward_closure(&targets)
            .into_iter()
            .filter(|node| node.ends_with(SOURCE_EXT)),
    )
}

/// Source files that transitively depend on any of `args`.
///
/// Each argument seeds the search with both its `.v` and `.vo` forms.
pub fn reverse_targets<S: AsRef<str>>(graph: &DependencyGraph, args: &[S]) -> Vec<String> {
    let seeds: Vec<String> = args
        .iter()
        .flat_map(|arg| {
            let arg = arg.as_ref();
            [
                set_extension(arg, SOURCE_EXT),
                set_extension(arg, OBJECT_EXT),
            ]
        })
        .collect();

    dedup_in_order(
        graph
            .reverse_closure(&seeds)
            .iter()
            .map(|node| set_extension(node, SOURCE_EXT)),
    )
}
