use crate::error::{Error, Result};
use rustpython_ast::{self as ast, TextSize};
use rustpython_parser::{parse, Mode};
use std::path::Path;

/// Parses Python source into a module, converting parser failures into the
/// crate's `Parse` error with the offending file attached.
pub fn parse_module(source: &str, file: &Path) -> Result<ast::ModModule> {
    let parsed = parse(source, Mode::Module, &file.to_string_lossy())
        .map_err(|e| Error::parse(file, &e))?;
    match parsed {
        ast::Mod::Module(module) => Ok(module),
        _ => Err(Error::parse(file, "source did not parse as a module")),
    }
}

/// A utility struct to convert byte offsets to line numbers.
///
/// The AST parser reports positions as byte offsets, but function
/// extraction works line-by-line, so we need both directions: offset to
/// line, and the starting offset of a line.
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                // Record the start of the next line (current newline index + 1)
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a `TextSize` (byte offset) to a 1-indexed line number.
    pub fn line_index(&self, offset: TextSize) -> usize {
        let offset = offset.to_usize();
        // Binary search to find which line range the offset falls into.
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Returns the byte offset at which the given 1-indexed line starts.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the 0-indexed column of a byte offset within its line.
    pub fn column(&self, offset: TextSize) -> usize {
        let line = self.line_index(offset);
        offset.to_usize().saturating_sub(self.line_start(line))
    }
}

/// Joins the 1-indexed, inclusive line range `[start, end]` of `source`.
///
/// This is how extracted function slices are reconstructed from node
/// positions: the parser gives us the span, the original text gives us the
/// exact bytes, untouched by any re-rendering.
pub fn slice_lines(source: &str, start: usize, end: usize) -> String {
    source
        .lines()
        .skip(start.saturating_sub(1))
        .take(end.saturating_sub(start) + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_maps_offsets() {
        let source = "a = 1\nb = 2\nc = 3\n";
        let index = LineIndex::new(source);

        assert_eq!(index.line_index(TextSize::from(0)), 1);
        assert_eq!(index.line_index(TextSize::from(6)), 2);
        assert_eq!(index.line_index(TextSize::from(7)), 2);
        assert_eq!(index.line_index(TextSize::from(12)), 3);
    }

    #[test]
    fn test_column_within_line() {
        let source = "x = 1\ny = lambda a: a\n";
        let index = LineIndex::new(source);

        // "lambda" starts at byte 10, which is column 4 of line 2.
        assert_eq!(index.column(TextSize::from(10)), 4);
        assert_eq!(index.line_start(2), 6);
    }

    #[test]
    fn test_slice_lines_inclusive() {
        let source = "one\ntwo\nthree\nfour";
        assert_eq!(slice_lines(source, 2, 3), "two\nthree");
        assert_eq!(slice_lines(source, 1, 1), "one");
        assert_eq!(slice_lines(source, 4, 4), "four");
    }
}
