use std::fmt::Display;

/// A byte offset into the source text
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BytePos(usize);

impl BytePos {
    pub fn new(pos: usize) -> Self {
        BytePos(pos)
    }

    pub fn shift(self, ch: char) -> Self {
        BytePos(self.0 + ch.len_utf8())
    }
}

impl Display for BytePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subsection of the source code, along with the (1-based) line it starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: BytePos,
    pub end: BytePos,
    pub line: usize,
}

impl Span {
    pub fn new(start: BytePos, end: BytePos, line: usize) -> Span {
        Span { start, end, line }
    }

    /// Convert the given span to the "(line 1, 0..3)" format
    pub fn at_str(&self) -> String {
        format!("({})", self)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, {}..{}", self.line, self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithSpan<T> {
    pub value: T,
    pub span: Span,
}

impl<T> WithSpan<T> {
    pub fn new(value: T, span: Span) -> WithSpan<T> {
        WithSpan { value, span }
    }
}

impl<T> WithSpan<T>
where
    T: Display,
{
    /// Convert the given WithSpan to the "value (line 1, 0..3)" format
    pub fn at_str(&self) -> String {
        format!("{} {}", self.value, self.span.at_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::span::{BytePos, Span, WithSpan};

    #[test]
    fn at_str_includes_line_and_offsets() {
        let tok = WithSpan::new("foo", Span::new(BytePos::new(4), BytePos::new(7), 2));
        assert_eq!(tok.at_str(), "foo (line 2, 4..7)");
    }

    #[test]
    fn shift_counts_utf8_bytes() {
        assert_eq!(BytePos::new(0).shift('é'), BytePos::new(2));
    }
}
