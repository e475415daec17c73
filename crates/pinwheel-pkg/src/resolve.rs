//! Indirect dependency resolution.
//!
//! The indirect set of a manifest is the union of the pin dependencies
//! (direct and indirect) declared by each of its direct dependencies. Only
//! one level is expanded: the dependencies of those dependencies are not
//! fetched again, since their own manifests already list them as indirect.

use crate::fetch::{FetchError, Fetcher};
use crate::manifest::{manifest_file_name, Manifest};
use crate::pin::PinDependency;
use crate::region::StructuralError;
use std::collections::{BTreeSet, HashSet};
use std::sync::{mpsc, Arc};
use thiserror::Error;

/// Packages known to declare no pin dependencies of their own.
pub const DEFAULT_LEAF_PACKAGES: &[&str] = &[
    "coq-record-update",
    "rocq-stdpp",
    "rocq-iris",
    "iris-named-props",
];

/// Errors that can occur during indirect dependency resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A dependency's manifest could not be fetched.
    #[error("failed to fetch manifest of '{package}': {source}")]
    Fetch {
        package: String,
        #[source]
        source: FetchError,
    },

    /// A dependency's manifest is malformed.
    #[error("failed to parse manifest of '{package}': {source}")]
    Parse {
        package: String,
        #[source]
        source: StructuralError,
    },

    /// Writing the indirect set into the root manifest failed.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The worker pool could not be created.
    #[error("failed to build resolver thread pool: {0}")]
    ThreadPool(String),
}

/// Resolver for the indirect pin dependencies of a manifest.
pub struct Resolver<F: Fetcher + ?Sized + 'static> {
    fetcher: Arc<F>,
    leaf_packages: BTreeSet<String>,
    jobs: Option<usize>,
}

impl<F: Fetcher + ?Sized + 'static> Resolver<F> {
    /// Create a resolver with the default leaf packages.
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            leaf_packages: DEFAULT_LEAF_PACKAGES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            jobs: None,
        }
    }

    /// Replace the set of leaf packages.
    #[must_use]
    pub fn with_leaf_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leaf_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Add packages to the set of leaf packages.
    #[must_use]
    pub fn extend_leaf_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leaf_packages
            .extend(packages.into_iter().map(Into::into));
        self
    }

    /// Limit concurrent fetches. Defaults to the global rayon pool.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs.max(1));
        self
    }

    /// Returns true if `package` is skipped without fetching.
    #[must_use]
    pub fn is_leaf(&self, package: &str) -> bool {
        self.leaf_packages.contains(package)
    }

    /// Pin dependencies declared by `dep`'s own manifest at its commit.
    ///
    /// Leaf packages yield nothing without a fetch.
    pub fn fetch_candidates(
        &self,
        dep: &PinDependency,
    ) -> Result<Vec<PinDependency>, ResolveError> {
        if self.is_leaf(&dep.package) {
            return Ok(Vec::new());
        }
        declared_pins(&*self.fetcher, dep)
    }

    /// Compute the indirect set for `direct`, sorted by package name.
    ///
    /// Manifests are fetched concurrently. Results are merged in the order of
    /// `direct`, keeping the first entry seen for each package, so the
    /// outcome does not depend on completion order.
    pub fn collect_indirect(
        &self,
        direct: &[PinDependency],
    ) -> Result<Vec<PinDependency>, ResolveError> {
        let per_dependency = self.fetch_all(direct)?;

        // First occurrence of each package wins
        let mut seen: HashSet<String> = HashSet::new();
        let mut indirect: Vec<PinDependency> = Vec::new();
        for candidate in per_dependency.into_iter().flatten() {
            if seen.insert(candidate.package.clone()) {
                indirect.push(candidate);
            }
        }

        indirect.sort_by(|a, b| a.package.cmp(&b.package));
        Ok(indirect)
    }

    /// Recompute and write the indirect section of `manifest`.
    ///
    /// On error the manifest is left untouched.
    pub fn resolve(&self, manifest: &mut Manifest) -> Result<(), ResolveError> {
        let indirect = self.collect_indirect(&manifest.list_direct())?;
        manifest.set_indirect_set(&indirect)?;
        Ok(())
    }

    /// Fetch the candidates of every dependency, one task each.
    ///
    /// Returns as soon as any fetch fails. Tasks still running finish in the
    /// background and their results are dropped.
    fn fetch_all(
        &self,
        direct: &[PinDependency],
    ) -> Result<Vec<Vec<PinDependency>>, ResolveError> {
        let pool = match self.jobs {
            Some(jobs) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build()
                    .map_err(|e| ResolveError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };

        let mut slots: Vec<Option<Vec<PinDependency>>> = vec![None; direct.len()];
        let (tx, rx) = mpsc::channel();
        let mut pending = 0;

        // Leaves are settled here without a task
        for (index, dep) in direct.iter().enumerate() {
            if self.is_leaf(&dep.package) {
                slots[index] = Some(Vec::new());
                continue;
            }

            let tx = tx.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let dep = dep.clone();
            let task = move || {
                // The receiver is gone once another fetch has failed.
                let _ = tx.send((index, declared_pins(&*fetcher, &dep)));
            };
            match &pool {
                Some(pool) => pool.spawn(task),
                None => rayon::spawn(task),
            }
            pending += 1;
        }
        drop(tx);

        // Slots fill in completion order; the first error ends the wait
        for _ in 0..pending {
            let (index, result) = rx
                .recv()
                .map_err(|_| ResolveError::ThreadPool("fetch task exited without a result".to_string()))?;
            slots[index] = Some(result?);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

/// Direct and indirect pins listed in `dep`'s manifest.
fn declared_pins<F: Fetcher + ?Sized>(
    fetcher: &F,
    dep: &PinDependency,
) -> Result<Vec<PinDependency>, ResolveError> {
    let commit = dep.commit.as_deref().unwrap_or("HEAD");
    let data = fetcher
        .get_file(&dep.url, commit, &manifest_file_name(&dep.package))
        .map_err(|source| ResolveError::Fetch {
            package: dep.package.clone(),
            source,
        })?;

    let manifest = Manifest::from_bytes(&data).map_err(|source| ResolveError::Parse {
        package: dep.package.clone(),
        source,
    })?;

    let mut candidates = manifest.list_direct();
    candidates.extend(manifest.list_indirect());
    Ok(candidates)
}
