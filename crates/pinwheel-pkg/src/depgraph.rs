//! Build-dependency graph parsed from make-style dependency rules.
//!
//! Each rule line `t1 t2 ... : s1 s2 ...` adds an edge `s -> t` for every
//! pair, meaning "t depends on s". Blank lines, `#` comments and lines
//! without a `:` are skipped.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use thiserror::Error;

/// Errors from loading a dependency graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The rules could not be read.
    #[error("failed to read dependency rules: {0}")]
    Io(#[from] std::io::Error),
}

/// A single edge: `target` depends on `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dep {
    pub target: String,
    pub source: String,
}

impl Dep {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Directed graph of named artifacts.
///
/// Edges keep their insertion order and are stored once. Closures are
/// deterministic: depth-first, seed by seed, edge by edge.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: Vec<Dep>,
    edge_set: HashSet<(String, String)>,
    /// target -> sources, in insertion order
    sources_of: HashMap<String, Vec<String>>,
    /// source -> targets, in insertion order
    targets_of: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse dependency-rule text. Lines that are not rules are ignored.
    pub fn parse(text: &str) -> Self {
        let mut graph = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((targets, sources)) = line.split_once(':') else {
                continue;
            };
            for target in targets.split_whitespace() {
                for source in sources.split_whitespace() {
                    graph.add_edge(target, source);
                }
            }
        }
        graph
    }

    /// Parse dependency rules from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, GraphError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text))
    }

    /// Add the edge `source -> target`. Returns false if it already exists.
    pub fn add_edge(&mut self, target: &str, source: &str) -> bool {
        if !self
            .edge_set
            .insert((target.to_string(), source.to_string()))
        {
            return false;
        }
        self.edges.push(Dep::new(target, source));
        self.sources_of
            .entry(target.to_string())
            .or_default()
            .push(source.to_string());
        self.targets_of
            .entry(source.to_string())
            .or_default()
            .push(target.to_string());
        true
    }

    /// Keep only the edges whose target and source both satisfy `keep`.
    pub fn filter_nodes<P: Fn(&str) -> bool>(&mut self, keep: P) {
        let edges = std::mem::take(&mut self.edges);
        *self = Self::new();
        for dep in edges {
            if keep(&dep.target) && keep(&dep.source) {
                self.add_edge(&dep.target, &dep.source);
            }
        }
    }

    /// All edges in insertion order.
    pub fn deps(&self) -> &[Dep] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Direct dependencies of `target`.
    pub fn dependencies_of(&self, target: &str) -> &[String] {
        self.sources_of.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    /// Direct dependents of `source`.
    pub fn dependents_of(&self, source: &str) -> &[String] {
        self.targets_of.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    /// Everything the seeds transitively depend on, in discovery order.
    ///
    /// Seeds are listed only when some edge reaches them.
    pub fn forward_closure<S: AsRef<str>>(&self, seeds: &[S]) -> Vec<String> {
        closure(&self.sources_of, seeds)
    }

    /// Everything that transitively depends on the seeds, in discovery order.
    pub fn reverse_closure<S: AsRef<str>>(&self, seeds: &[S]) -> Vec<String> {
        closure(&self.targets_of, seeds)
    }
}

/// Depth-first preorder walk over `adjacency` from each seed in turn.
fn closure<S: AsRef<str>>(adjacency: &HashMap<String, Vec<String>>, seeds: &[S]) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::new();

    for seed in seeds {
        let Some(first) = adjacency.get(seed.as_ref()) else {
            continue;
        };
        // Explicit stack of neighbour iterators keeps edge order without recursion.
        let mut stack = vec![first.iter()];
        while let Some(neighbours) = stack.last_mut() {
            let Some(next) = neighbours.next() else {
                stack.pop();
                continue;
            };
            if !visited.insert(next.as_str()) {
                continue;
            }
            order.push(next.clone());
            if let Some(more) = adjacency.get(next) {
                stack.push(more.iter());
            }
        }
    }
    order
}
