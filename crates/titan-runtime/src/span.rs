//! Source locations
//!
//! Titan reports positions as 1-based line/column pairs, so a span records
//! where a token or node starts plus how many characters it covers on that line.

use serde::{Deserialize, Serialize};

/// A source location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Number of characters covered
    pub length: usize,
}

impl Span {
    /// Create a new span
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// Placeholder span for synthesized nodes
    pub fn dummy() -> Self {
        Self::new(0, 0, 0)
    }

    /// Extend this span to the end of `other`
    ///
    /// Spans on different lines keep the start position and the original length.
    pub fn merge(self, other: Span) -> Span {
        if self.line == other.line && other.column >= self.column {
            let end = other.column + other.length;
            Span::new(self.line, self.column, end - self.column)
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_same_line() {
        let a = Span::new(3, 5, 2);
        let b = Span::new(3, 10, 4);
        assert_eq!(a.merge(b), Span::new(3, 5, 9));
    }

    #[test]
    fn test_merge_across_lines_keeps_start() {
        let a = Span::new(1, 5, 2);
        let b = Span::new(2, 1, 1);
        assert_eq!(a.merge(b), a);
    }

    #[test]
    fn test_dummy() {
        assert_eq!(Span::dummy(), Span::new(0, 0, 0));
    }
}
