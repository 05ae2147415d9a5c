//! Source locations carried by syntax nodes, IR nodes and diagnostics

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A byte offset span in a source file
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Position of a syntax node: file, byte span and the 1-based line/column
/// of its first character.
///
/// `Location::default()` is used for synthesized nodes that have no text.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("{line}:{column}")]
pub struct Location {
    pub file: FileId,
    pub span: Span,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: FileId, span: Span, line: u32, column: u32) -> Self {
        Self {
            file,
            span,
            line,
            column,
        }
    }

    /// Location at a line/column in file 0, without a byte span
    pub fn at(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            ..Self::default()
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }

    /// True for locations of synthesized nodes
    pub fn is_synthesized(&self) -> bool {
        self.line == 0
    }
}
