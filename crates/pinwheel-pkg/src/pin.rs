//! Pinned source-commit dependencies (`pin-depends` entries).

use std::fmt;

/// Length commit hashes are abbreviated to.
pub const HASH_ABBREV_LEN: usize = 15;

/// Suffix carried by package names on disk (`perennial.dev`).
pub const PACKAGE_SUFFIX: &str = ".dev";

/// Scheme prefix carried by URLs on disk (`git+https://...`).
pub const URL_SCHEME_PREFIX: &str = "git+";

/// Minimum width of the quoted package field in a rendered entry.
const PACKAGE_FIELD_WIDTH: usize = 27;

/// Abbreviate a commit hash to [`HASH_ABBREV_LEN`] characters.
#[must_use]
pub fn abbreviate_hash(commit: &str) -> &str {
    match commit.char_indices().nth(HASH_ABBREV_LEN) {
        Some((i, _)) => &commit[..i],
        None => commit,
    }
}

/// A dependency pinned to a commit of a git repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinDependency {
    /// Package name, without the `.dev` suffix.
    pub package: String,
    /// Repository URL, without the `git+` prefix.
    pub url: String,
    /// Commit hash, abbreviated.
    pub commit: Option<String>,
}

impl PinDependency {
    /// Create a normalized dependency.
    pub fn new(
        package: impl Into<String>,
        url: impl Into<String>,
        commit: Option<impl Into<String>>,
    ) -> Self {
        Self {
            package: package.into(),
            url: url.into(),
            commit: commit.map(Into::into),
        }
        .normalized()
    }

    /// Strip on-disk decorations and abbreviate the commit.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Some(package) = self.package.strip_suffix(PACKAGE_SUFFIX) {
            self.package = package.to_string();
        }
        if let Some(url) = self.url.strip_prefix(URL_SCHEME_PREFIX) {
            self.url = url.to_string();
        }
        self.commit = self
            .commit
            .filter(|c| !c.is_empty())
            .map(|c| abbreviate_hash(&c).to_string());
        self
    }

    /// Parse a `pin-depends` entry such as
    ///
    /// ```text
    ///   ["perennial.dev"           "git+https://github.com/mit-pdos/perennial#577140b0594fbde"]
    /// ```
    ///
    /// Returns `None` for anything that is not an entry (comments, markers,
    /// blank lines).
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.trim_start().strip_prefix('[')?;
        let (package, rest) = quoted(rest.trim_start())?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let (full_url, rest) = quoted(rest.trim_start())?;
        if !rest.trim_start().starts_with(']') {
            return None;
        }

        let (url, commit) = match full_url.split_once('#') {
            Some((url, commit)) => (url, Some(commit)),
            None => (full_url, None),
        };
        Some(Self::new(package, url, commit))
    }

    /// The URL as written on disk, with scheme prefix and commit.
    #[must_use]
    pub fn full_url(&self) -> String {
        let mut url = format!("{URL_SCHEME_PREFIX}{}", self.url);
        if let Some(ref commit) = self.commit {
            url.push('#');
            url.push_str(abbreviate_hash(commit));
        }
        url
    }
}

/// Split a leading `"..."` (non-empty, no escapes) from `text`.
fn quoted(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('"')?;
    let end = inner.find('"')?;
    if end == 0 {
        return None;
    }
    Some((&inner[..end], &inner[end + 1..]))
}

/// Formats the entry as a `pin-depends` line.
impl fmt::Display for PinDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let package = format!("\"{}{PACKAGE_SUFFIX}\"", self.package);
        write!(
            f,
            "  [{package:<width$} \"{}\"]",
            self.full_url(),
            width = PACKAGE_FIELD_WIDTH
        )
    }
}
