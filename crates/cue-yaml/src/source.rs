/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Line index over the decoded source.
//!
//! All position arithmetic in the decoder reduces to byte offsets over
//! this table, so line and column reporting never depends on what the
//! YAML parser tracks internally.

/// Precomputed line-start offsets for a source buffer.
///
/// The table holds one entry per line plus a trailing sentinel equal to
/// the buffer length, so the span of 1-based line `n` is
/// `line_start(n)..line_start(n + 1)`.
#[derive(Debug)]
pub struct SourceMap<'a> {
    src: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(src: &'a str) -> SourceMap<'a> {
        let mut line_starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.push(src.len());
        SourceMap { src, line_starts }
    }

    pub fn src(&self) -> &'a str {
        self.src
    }

    /// Number of lines, counting a trailing line after a final newline.
    pub fn line_count(&self) -> usize {
        self.line_starts.len() - 1
    }

    /// 1-based line containing the given byte offset.
    pub fn offset_to_line(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// Byte offset where the 1-based line starts.
    pub fn line_start(&self, line: usize) -> usize {
        let idx = line.saturating_sub(1).min(self.line_starts.len() - 1);
        self.line_starts[idx]
    }

    fn line_span(&self, line: usize) -> &'a str {
        let start = self.line_start(line);
        let end = self.line_start(line + 1);
        &self.src[start..end]
    }

    /// True when the 1-based line holds only whitespace.
    pub fn is_blank_line(&self, line: usize) -> bool {
        self.line_span(line)
            .bytes()
            .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
    }

    /// True when the 1-based line holds only optional whitespace followed
    /// by a `#` comment.
    pub fn is_comment_line(&self, line: usize) -> bool {
        for b in self.line_span(line).bytes() {
            match b {
                b' ' | b'\t' => {}
                other => return other == b'#',
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line() {
        let map = SourceMap::new("a: 1\nb: 2\n");
        assert_eq!(map.offset_to_line(0), 1);
        assert_eq!(map.offset_to_line(3), 1);
        assert_eq!(map.offset_to_line(5), 2);
        assert_eq!(map.offset_to_line(9), 2);
    }

    #[test]
    fn test_line_start() {
        let map = SourceMap::new("a: 1\nb: 2\n");
        assert_eq!(map.line_start(1), 0);
        assert_eq!(map.line_start(2), 5);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(SourceMap::new("a\nb").line_count(), 2);
        assert_eq!(SourceMap::new("a\nb\n").line_count(), 3);
        assert_eq!(SourceMap::new("").line_count(), 1);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let map = SourceMap::new("a: 1\n\n  \t\n# note\n  # indented\nb: 2\n");
        assert!(!map.is_blank_line(1));
        assert!(map.is_blank_line(2));
        assert!(map.is_blank_line(3));
        assert!(!map.is_blank_line(4));
        assert!(map.is_comment_line(4));
        assert!(map.is_comment_line(5));
        assert!(!map.is_comment_line(6));
        assert!(!map.is_comment_line(1));
    }

    #[test]
    fn test_trailing_line_is_blank() {
        let map = SourceMap::new("a: 1\n");
        assert!(map.is_blank_line(2));
        assert!(!map.is_comment_line(2));
    }
}
