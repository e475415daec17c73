//! Line-oriented manifest documents.
//!
//! A [`Document`] keeps the original lines, the line terminator and whether
//! the text ended with one, so that an unmodified document serializes back
//! to exactly the input bytes.

use crate::region::{self, Regions, StructuralError};
use std::fmt;
use std::ops::Range;

/// Line terminator detected in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Detect the terminator from the first line break in `text`.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(i) if i > 0 && text.as_bytes()[i - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    /// Returns the terminator as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// A manifest as an ordered sequence of lines with derived regions.
///
/// Lines are split on `\n` only. A line that ended in `\r\n` keeps its `\r`,
/// so files with mixed terminators parse and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    line_ending: LineEnding,
    trailing_newline: bool,
    regions: Regions,
}

impl Document {
    /// Split `text` into lines and scan its regions.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if a block or marker is unbalanced.
    pub fn parse(text: &str) -> Result<Self, StructuralError> {
        let line_ending = LineEnding::detect(text);

        let (body, trailing_newline) = match text.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (text, false),
        };

        let lines: Vec<String> = if body.is_empty() && !trailing_newline {
            Vec::new()
        } else {
            body.split('\n').map(String::from).collect()
        };

        let regions = scan_lines(&lines)?;
        Ok(Self {
            lines,
            line_ending,
            trailing_newline,
            regions,
        })
    }

    /// The document lines, without terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(|line| strip_cr(line))
    }

    /// A single line by index, without its terminator.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|line| strip_cr(line))
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the document has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Regions as of the last scan.
    #[must_use]
    pub fn regions(&self) -> &Regions {
        &self.regions
    }

    /// The line terminator used for new lines.
    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Render the document back to text.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Replace the lines in `range` with `replacement` and rescan regions.
    ///
    /// Inserting is an empty `range`; deleting is an empty `replacement`.
    /// New lines get the document's terminator. On a structural error the
    /// document is left unchanged.
    pub fn splice(
        &mut self,
        range: Range<usize>,
        replacement: Vec<String>,
    ) -> Result<(), StructuralError> {
        let replacement = replacement.into_iter().map(|mut line| {
            if self.line_ending == LineEnding::CrLf {
                line.push('\r');
            }
            line
        });

        let mut lines = self.lines.clone();
        lines.splice(range, replacement);
        let regions = scan_lines(&lines)?;

        // An edited empty document gets a final newline.
        if self.lines.is_empty() && !lines.is_empty() {
            self.trailing_newline = true;
        }
        self.lines = lines;
        self.regions = regions;
        Ok(())
    }

    /// Insert `new_lines` before line `at`.
    pub fn insert_lines(&mut self, at: usize, new_lines: Vec<String>) -> Result<(), StructuralError> {
        self.splice(at..at, new_lines)
    }

    /// Replace a single line.
    pub fn replace_line(&mut self, index: usize, line: String) -> Result<(), StructuralError> {
        self.splice(index..index + 1, vec![line])
    }

    /// Remove a single line.
    pub fn remove_line(&mut self, index: usize) -> Result<(), StructuralError> {
        self.splice(index..index + 1, Vec::new())
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn scan_lines(lines: &[String]) -> Result<Regions, StructuralError> {
    let stripped: Vec<&str> = lines.iter().map(|line| strip_cr(line)).collect();
    region::scan(&stripped)
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(text: &str) {
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.serialize(), text, "round trip of {text:?}");
    }

    #[test]
    fn test_round_trip_exact() {
        round_trip("");
        round_trip("\n");
        round_trip("\n\n");
        round_trip("no newline at end");
        round_trip("opam-version: \"2.0\"\nname: \"x\"\n");
        round_trip("windows\r\nline endings\r\n");
        round_trip("mixed\r\nendings\nhere\n");
        round_trip("trailing spaces   \n\ttabs\t\n");
        round_trip("depends: [\n  \"a\"\n]\npin-depends: [\n]\n");
    }

    #[test]
    fn test_detect_line_ending() {
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a"), LineEnding::Lf);
    }

    #[test]
    fn test_splice_rescans_regions() {
        let mut doc = Document::parse("x: 1\ndepends: [\n  \"a\"\n]\n").unwrap();
        assert_eq!(doc.regions().depends.unwrap().start, 1);

        doc.insert_lines(0, vec!["y: 2".to_string(), "z: 3".to_string()])
            .unwrap();
        let depends = doc.regions().depends.unwrap();
        assert_eq!(depends.start, 3);
        assert_eq!(depends.end, 6);

        doc.remove_line(0).unwrap();
        assert_eq!(doc.regions().depends.unwrap().start, 2);
    }

    #[test]
    fn test_splice_rejects_broken_structure() {
        let mut doc = Document::parse("depends: [\n]\n").unwrap();
        let err = doc.remove_line(1).unwrap_err();
        assert!(matches!(err, StructuralError::UnclosedBlock { .. }));
        assert_eq!(doc.serialize(), "depends: [\n]\n");
    }

    #[test]
    fn test_crlf_preserved_on_edit() {
        let mut doc = Document::parse("a\r\nb\r\n").unwrap();
        doc.replace_line(1, "c".to_string()).unwrap();
        assert_eq!(doc.serialize(), "a\r\nc\r\n");
    }

    #[test]
    fn test_mixed_line_endings() {
        let text = "opam-version: \"2.0\"\r\npin-depends: [\n  [\"a.dev\" \"git+https://x/a#1\"]\n]\n";
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.line(0), Some("opam-version: \"2.0\""));
        let pins = doc.regions().pin_depends.unwrap();
        assert_eq!((pins.start, pins.end), (1, 4));
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn test_crlf_markers_are_recognized() {
        let text = "pin-depends: [\r\n  ## begin indirect\r\n  ## end\r\n]\r\n";
        let doc = Document::parse(text).unwrap();
        let indirect = doc.regions().indirect.unwrap();
        assert_eq!((indirect.start, indirect.end), (1, 3));
        assert_eq!(doc.lines().collect::<Vec<_>>(), ["pin-depends: [", "  ## begin indirect", "  ## end", "]"]);
    }

    #[test]
    fn test_edit_of_empty_document_ends_with_newline() {
        let mut doc = Document::parse("").unwrap();
        doc.insert_lines(0, vec!["depends: [".to_string(), "]".to_string()])
            .unwrap();
        assert_eq!(doc.to_string(), "depends: [\n]\n");
    }
}
