use core::ops::Range;

/// Byte range into the source text of a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }

    pub fn at(offset: usize) -> Self {
        Self(offset..offset)
    }

    pub fn combine(a: &Span, b: &Span) -> Span {
        Span::new(a.0.start.min(b.0.start), a.0.end.max(b.0.end))
    }

    pub fn start(&self) -> usize {
        self.0.start
    }

    pub fn end(&self) -> usize {
        self.0.end
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.0.clone()).unwrap_or("")
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self(range)
    }
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|&(_, c)| c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// 1-based line of `offset`.
    pub fn line(&self, offset: usize) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line as u32 + 1,
            Err(next) => next as u32,
        }
    }

    /// 1-based `(line, column)` of `offset`; columns count characters.
    pub fn line_col(&self, source: &str, offset: usize) -> (u32, u32) {
        let line = self.line(offset);
        let start = self.line_starts[line as usize - 1];
        let column = source
            .get(start..offset.min(source.len()))
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        (line, column as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "a = 1;\nb = 2;\n\nc";
        let index = LineIndex::new(src);
        assert_eq!(index.line_col(src, 0), (1, 1));
        assert_eq!(index.line_col(src, 4), (1, 5));
        assert_eq!(index.line_col(src, 7), (2, 1));
        assert_eq!(index.line_col(src, 15), (4, 1));
        assert_eq!(index.line(14), 3);
    }

    #[test]
    fn test_combine() {
        let s = Span::combine(&Span::new(4, 6), &Span::new(1, 3));
        assert_eq!(s, Span::new(1, 6));
        assert_eq!(Span::new(2, 5).str_of("abcdefg"), "cde");
    }
}
