use miette::SourceSpan;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn union(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// 1-based line of `start` within `source`.
    pub fn line_in(&self, source: &str) -> usize {
        line_of_offset(source, self.start)
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

pub fn line_of_offset(source: &str, offset: usize) -> usize {
    let clamped = offset.min(source.len());
    source.as_bytes()[..clamped]
        .iter()
        .filter(|byte| **byte == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_spans() {
        let joined = Span::new(4, 6).union(Span::new(1, 3));
        assert_eq!(joined, Span::new(1, 6));
        assert_eq!(joined.len(), 5);
    }

    #[test]
    fn lines_are_one_based() {
        let source = "int a;\nint b;\n\nint c;";
        assert_eq!(line_of_offset(source, 0), 1);
        assert_eq!(line_of_offset(source, 7), 2);
        assert_eq!(line_of_offset(source, source.len()), 4);
        assert_eq!(line_of_offset(source, 10_000), 4);
    }
}
