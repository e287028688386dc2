/*
 * token.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Token positions for CUE syntax trees.
//!
//! A [`Pos`] is a byte offset into the decoded source plus a [`RelPos`]
//! classification describing the whitespace that separates the token from
//! the one before it. The formatter uses the relative classification to
//! reproduce blank lines and line breaks; the offset ties the token back
//! to the source buffer.

/// Relative position of a token with respect to the previous token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelPos {
    /// No relation recorded.
    #[default]
    NoRel,
    /// Adjacent to the previous token on the same line.
    NoSpace,
    /// Separated by inline whitespace on the same line.
    Blank,
    /// First token on the next line.
    Newline,
    /// Separated from the previous token by at least one blank line.
    NewSection,
}

/// A source position: byte offset plus relative-whitespace classification.
///
/// `Pos::NONE` is the invalid position; it compares equal only to itself
/// and reports `is_valid() == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    offset: usize,
    rel: RelPos,
}

impl Pos {
    /// The invalid position.
    pub const NONE: Pos = Pos {
        offset: usize::MAX,
        rel: RelPos::NoRel,
    };

    pub fn new(offset: usize, rel: RelPos) -> Pos {
        Pos { offset, rel }
    }

    pub fn is_valid(&self) -> bool {
        self.offset != usize::MAX
    }

    /// Byte offset into the source. Meaningless for `Pos::NONE`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rel(&self) -> RelPos {
        self.rel
    }

    /// Returns the same position with a different relative classification.
    #[must_use]
    pub fn with_rel(self, rel: RelPos) -> Pos {
        Pos {
            offset: self.offset,
            rel,
        }
    }
}

impl Default for Pos {
    fn default() -> Pos {
        Pos::NONE
    }
}
