//! Source ranges.
//!
//! A `Span` is a half-open byte range into one source file. The parsers
//! stamp every node with one. Synthesized nodes (variant-generator output,
//! factory-built test programs) carry [`Span::DUMMY`] instead and render no
//! location.

use crate::position::{LineMap, Position};
use serde::{Deserialize, Serialize};

/// Byte range `[start, end)` into the current source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Marker for synthesized nodes with no source text behind them.
    pub const DUMMY: Span = Span {
        start: u32::MAX,
        end: u32::MAX,
    };

    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Whether this span belongs to a synthesized node.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.start == u32::MAX
    }

    /// The smallest range enclosing both operands. Synthetic operands are
    /// skipped, so a node built from a mix of parsed and synthesized parts
    /// keeps the real range.
    #[must_use]
    pub fn cover(self, other: Span) -> Span {
        if self.is_synthetic() {
            return other;
        }
        if other.is_synthetic() {
            return self;
        }
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Line/column of the range's start, or `None` for synthesized nodes.
    #[must_use]
    pub fn location(self, lines: &LineMap) -> Option<Position> {
        if self.is_synthetic() {
            return None;
        }
        Some(lines.offset_to_position(self.start))
    }
}

#[cfg(test)]
#[path = "tests/span.rs"]
mod tests;
