//! Line classification and region scanning for opam manifests.
//!
//! A manifest is treated as plain lines. Three regions are tracked:
//! - `depends: [ ... ]`
//! - `pin-depends: [ ... ]`
//! - the indirect sub-range of `pin-depends`, delimited by
//!   `## begin indirect` and `## end` comment lines
//!
//! The predicates here are pure functions of a single line. All scanning
//! state lives in [`scan`].

use std::ops::Range;
use thiserror::Error;

/// Key opening the `depends` block.
pub const DEPENDS_KEY: &str = "depends:";

/// Key opening the `pin-depends` block.
pub const PIN_DEPENDS_KEY: &str = "pin-depends:";

/// Errors for manifests whose block structure is broken.
///
/// Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// A `depends` or `pin-depends` block is never closed.
    #[error("unclosed {block} block starting at line {line}")]
    UnclosedBlock { block: &'static str, line: usize },

    /// An indirect region is still open when `pin-depends` closes.
    #[error("unclosed indirect region starting at line {line}")]
    UnclosedIndirect { line: usize },

    /// An `## end` marker with no open `## begin indirect`.
    #[error("## end marker without ## begin indirect at line {line}")]
    EndWithoutBegin { line: usize },

    /// A block opened and closed on the same line, e.g. `depends: ["a"]`.
    #[error("{block} block at line {line} must span several lines")]
    OneLineBlock { block: &'static str, line: usize },

    /// A second `## begin indirect` before the first one was closed.
    #[error("nested ## begin indirect markers at lines {first} and {second}")]
    NestedBegin { first: usize, second: usize },
}

/// A half-open line range `[start, end)`.
///
/// For blocks, `start` is the opening line and `end - 1` the closing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Returns true if `line` falls inside the region, delimiters included.
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line < self.end
    }

    /// Lines strictly between the opening and closing delimiters.
    #[must_use]
    pub fn inner(&self) -> Range<usize> {
        (self.start + 1)..self.end.saturating_sub(1).max(self.start + 1)
    }

    /// Index of the closing delimiter line.
    #[must_use]
    pub fn close_line(&self) -> usize {
        self.end - 1
    }
}

/// The regions found by a scan. A block that does not occur is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Regions {
    pub depends: Option<Region>,
    pub pin_depends: Option<Region>,
    pub indirect: Option<Region>,
}

impl Regions {
    /// Returns true if `line` is inside the indirect sub-range.
    #[must_use]
    pub fn in_indirect(&self, line: usize) -> bool {
        self.indirect.is_some_and(|r| r.contains(line))
    }
}

/// Matches `<ws>key<ws>[`, e.g. `depends: [`.
#[must_use]
pub fn opens_block(line: &str, key: &str) -> bool {
    line.trim_start()
        .strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('['))
}

/// Returns true if the brackets opened on `line` are all closed on it.
///
/// Brackets inside double-quoted strings are ignored.
#[must_use]
pub fn closes_on_same_line(line: &str) -> bool {
    let mut depth = 0usize;
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Matches a line whose first non-blank character is `]`.
#[must_use]
pub fn closes_block(line: &str) -> bool {
    line.trim_start().starts_with(']')
}

/// Matches `## begin indirect` (trailing text allowed after a word break).
#[must_use]
pub fn begins_indirect(line: &str) -> bool {
    marker_body(line).is_some_and(|body| starts_with_word(body, "begin indirect"))
}

/// Matches `## end` (trailing text allowed after a word break).
#[must_use]
pub fn ends_indirect(line: &str) -> bool {
    marker_body(line).is_some_and(|body| starts_with_word(body, "end"))
}

/// Text after the `##` of a marker comment, leading blanks removed.
fn marker_body(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix("##")
        .map(str::trim_start)
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word).is_some_and(|rest| {
        rest.chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// Scan `lines` once and compute the regions.
///
/// Only the first `depends` and `pin-depends` blocks are tracked.
pub fn scan<S: AsRef<str>>(lines: &[S]) -> Result<Regions, StructuralError> {
    let mut regions = Regions::default();

    let mut depends_start: Option<usize> = None;
    let mut pin_start: Option<usize> = None;
    let mut indirect_start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();

        if depends_start.is_none() && regions.depends.is_none() && opens_block(line, DEPENDS_KEY)
        {
            if closes_on_same_line(line) {
                return Err(StructuralError::OneLineBlock {
                    block: "depends",
                    line: i + 1,
                });
            }
            depends_start = Some(i);
            continue;
        }

        if pin_start.is_none()
            && regions.pin_depends.is_none()
            && opens_block(line, PIN_DEPENDS_KEY)
        {
            if closes_on_same_line(line) {
                return Err(StructuralError::OneLineBlock {
                    block: "pin-depends",
                    line: i + 1,
                });
            }
            pin_start = Some(i);
            continue;
        }

        if let Some(start) = depends_start {
            if closes_block(line) {
                regions.depends = Some(Region { start, end: i + 1 });
                depends_start = None;
                continue;
            }
        }

        if let Some(start) = pin_start {
            if closes_block(line) {
                if let Some(open) = indirect_start {
                    return Err(StructuralError::UnclosedIndirect { line: open + 1 });
                }
                regions.pin_depends = Some(Region { start, end: i + 1 });
                pin_start = None;
                continue;
            }

            if begins_indirect(line) {
                if let Some(first) = indirect_start {
                    return Err(StructuralError::NestedBegin {
                        first: first + 1,
                        second: i + 1,
                    });
                }
                indirect_start = Some(i);
            } else if ends_indirect(line) {
                let Some(start) = indirect_start.take() else {
                    return Err(StructuralError::EndWithoutBegin { line: i + 1 });
                };
                regions.indirect = Some(Region { start, end: i + 1 });
            }
        }
    }

    if let Some(start) = depends_start {
        return Err(StructuralError::UnclosedBlock {
            block: "depends",
            line: start + 1,
        });
    }
    if let Some(start) = pin_start {
        return Err(StructuralError::UnclosedBlock {
            block: "pin-depends",
            line: start + 1,
        });
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_block() {
        assert!(opens_block("depends: [", DEPENDS_KEY));
        assert!(opens_block("  depends:[", DEPENDS_KEY));
        assert!(opens_block("pin-depends: [", PIN_DEPENDS_KEY));
        assert!(!opens_block("pin-depends: [", DEPENDS_KEY));
        assert!(!opens_block("depends: \"foo\"", DEPENDS_KEY));
        assert!(!opens_block("# depends: [", DEPENDS_KEY));
    }

    #[test]
    fn test_markers() {
        assert!(begins_indirect("  ## begin indirect"));
        assert!(begins_indirect("##begin indirect deps"));
        assert!(!begins_indirect("  ## begin indirection"));
        assert!(ends_indirect("  ## end"));
        assert!(ends_indirect("## end indirect"));
        assert!(!ends_indirect("## ending"));
        assert!(!ends_indirect("# end"));
        assert!(closes_block("  ]"));
        assert!(!closes_block("  [\"a\" \"b\"]"));
    }

    #[test]
    fn test_scan_regions() {
        let lines = [
            "opam-version: \"2.0\"",
            "depends: [",
            "  \"perennial\"",
            "]",
            "pin-depends: [",
            "  [\"perennial.dev\" \"git+https://example.com/p#abc\"]",
            "  ## begin indirect",
            "  [\"dep.dev\" \"git+https://example.com/d#def\"]",
            "  ## end",
            "]",
        ];
        let regions = scan(&lines).unwrap();
        assert_eq!(regions.depends, Some(Region { start: 1, end: 4 }));
        assert_eq!(regions.pin_depends, Some(Region { start: 4, end: 10 }));
        assert_eq!(regions.indirect, Some(Region { start: 6, end: 9 }));
        assert!(regions.in_indirect(7));
        assert!(!regions.in_indirect(5));
    }

    #[test]
    fn test_scan_missing_blocks() {
        let regions = scan(&["opam-version: \"2.0\""]).unwrap();
        assert_eq!(regions, Regions::default());
    }

    #[test]
    fn test_region_inner() {
        let region = Region { start: 4, end: 8 };
        assert_eq!(region.inner(), 5..7);
        assert_eq!(region.close_line(), 7);
        let empty = Region { start: 2, end: 4 };
        assert!(empty.inner().is_empty());
    }

    #[test]
    fn test_one_line_blocks_are_rejected() {
        assert!(closes_on_same_line("depends: []"));
        assert!(closes_on_same_line("depends: [\"a\" \"b\"]"));
        assert!(!closes_on_same_line("depends: ["));
        assert!(!closes_on_same_line("pin-depends: [[\"a.dev\" \"git+https://x/a#1\"]"));
        assert!(!closes_on_same_line("depends: [ \"weird]name\""));

        // A later block's `]` must not close the one-line block.
        let err = scan(&["depends: [\"a\"]", "pin-depends: [", "]"]).unwrap_err();
        assert_eq!(
            err,
            StructuralError::OneLineBlock {
                block: "depends",
                line: 1
            }
        );

        let err = scan(&["x", "pin-depends: []"]).unwrap_err();
        assert_eq!(
            err,
            StructuralError::OneLineBlock {
                block: "pin-depends",
                line: 2
            }
        );
    }

    #[test]
    fn test_scan_errors_carry_line_numbers() {
        let err = scan(&["x", "depends: [", "  \"a\""]).unwrap_err();
        assert_eq!(
            err,
            StructuralError::UnclosedBlock {
                block: "depends",
                line: 2
            }
        );

        let err = scan(&["pin-depends: [", "  ## end", "]"]).unwrap_err();
        assert_eq!(err, StructuralError::EndWithoutBegin { line: 2 });

        let err = scan(&[
            "pin-depends: [",
            "  ## begin indirect",
            "  ## begin indirect",
            "  ## end",
            "]",
        ])
        .unwrap_err();
        assert_eq!(err, StructuralError::NestedBegin { first: 2, second: 3 });
    }
}
