use std::cmp::Ordering;
use std::fmt;

/// A point in source text. `line` and `column` are 1-based and count chars;
/// `offset` is the char index from the start of the document.
///
/// Equality and ordering only look at `line` and `column` so that positions
/// coming from an editor (which never know the offset) compare with positions
/// produced by the lexer.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Position without a known char offset.
    pub fn at(line: u32, column: u32) -> Self {
        Self { line, column, offset: 0 }
    }

    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line && self.column == other.column
    }
}

impl Eq for Position {}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.line, self.column).cmp(&(other.line, other.column))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source range. `end` is one past the last char of the construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn single(pos: Position) -> Self {
        Self { start: pos, end: pos }
    }

    /// Cursor containment: both ends inclusive, so a cursor sitting right
    /// after the last char of a construct still counts as inside it.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}:{}-{}", self.start.line, self.start.column, self.end.column)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Text covered by `span`, sliced by char offsets.
pub fn span_text(text: &str, span: &Span) -> String {
    let len = span.end.offset.saturating_sub(span.start.offset);
    text.chars().skip(span.start.offset).take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ignores_offset() {
        assert_eq!(Position::new(2, 3, 17), Position::at(2, 3));
        assert!(Position::at(1, 9) < Position::at(2, 1));
        assert!(Position::at(2, 4) > Position::new(2, 3, 100));
    }

    #[test]
    fn test_span_contains_is_inclusive() {
        let span = Span::new(Position::at(1, 5), Position::at(1, 10));
        assert!(span.contains(Position::at(1, 5)));
        assert!(span.contains(Position::at(1, 10)));
        assert!(!span.contains(Position::at(1, 4)));
        assert!(!span.contains(Position::at(1, 11)));
    }

    #[test]
    fn test_span_display() {
        let span1 = Span::new(Position::new(1, 5, 4), Position::new(1, 10, 9));
        assert_eq!(span1.to_string(), "1:5-10");

        let span2 = Span::new(Position::new(1, 5, 4), Position::new(3, 2, 20));
        assert_eq!(span2.to_string(), "1:5-3:2");
    }

    #[test]
    fn test_span_text() {
        let text = "local x = 1;\nx";
        let span = Span::new(Position::new(1, 7, 6), Position::new(1, 12, 11));
        assert_eq!(span_text(text, &span), "x = 1");
    }
}
