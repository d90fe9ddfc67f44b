//! Buffered line cursor with pushback.
//!
//! Every block parser reads through a [`LineReader`]; running out of lines is a
//! normal terminal condition here and only becomes an error in the caller.

use crate::preprocess::Source;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct LineReader {
    lines: Vec<String>,
    origins: Vec<usize>,
    cursor: usize,
    pushback: Vec<String>,
    lineno: usize,
}

impl LineReader {
    pub fn new(text: &str) -> Self {
        Self::from_source(Source::verbatim("-", text))
    }

    pub fn from_source(source: Source) -> Self {
        LineReader {
            lines: source.lines,
            origins: source.origins,
            cursor: 0,
            pushback: Vec::new(),
            lineno: 0,
        }
    }

    /// Pop the next line, preferring pushed-back ones.
    pub fn gets(&mut self) -> Option<String> {
        if let Some(line) = self.pushback.pop() {
            self.lineno += 1;
            return Some(line);
        }
        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        self.lineno += 1;
        Some(line)
    }

    /// Push `line` back so the next `gets` returns it.
    pub fn ungets(&mut self, line: String) {
        self.pushback.push(line);
        self.lineno = self.lineno.saturating_sub(1);
    }

    pub fn peek(&mut self) -> Option<String> {
        let line = self.gets()?;
        self.ungets(line.clone());
        Some(line)
    }

    pub fn has_next(&self) -> bool {
        !self.pushback.is_empty() || self.cursor < self.lines.len()
    }

    /// Number of lines consumed so far (1-based position of the last line read).
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Line number in the author's file of the last line read.
    pub fn source_line(&self) -> usize {
        match self.lineno {
            0 => 0,
            n => self
                .origins
                .get(n - 1)
                .copied()
                .unwrap_or_else(|| self.origins.last().map_or(n, |last| last + 1)),
        }
    }

    /// Consume lines while `pred` holds; the first miss stays unread.
    pub fn take_while<F>(&mut self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut out = Vec::new();
        while let Some(line) = self.gets() {
            if !pred(&line) {
                self.ungets(line);
                break;
            }
            out.push(line);
        }
        out
    }

    /// Consume lines until `pred` holds; the matching line stays unread.
    pub fn take_until<F>(&mut self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.take_while(|line| !pred(line))
    }

    pub fn while_match(&mut self, re: &Regex) -> Vec<String> {
        self.take_while(|line| re.is_match(line))
    }

    pub fn until_match(&mut self, re: &Regex) -> Vec<String> {
        self.take_until(|line| re.is_match(line))
    }

    /// Consume lines up to a terminator and discard the terminator itself.
    /// Returns `None` when input ends before any terminator is seen.
    pub fn until_terminator(&mut self, re: &Regex) -> Option<Vec<String>> {
        let body = self.until_match(re);
        match self.gets() {
            Some(_) => Some(body),
            None => {
                for line in body.into_iter().rev() {
                    self.ungets(line);
                }
                None
            }
        }
    }

    pub fn skip_blank_lines(&mut self) -> usize {
        self.take_while(|line| line.trim().is_empty()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess;

    #[test]
    fn test_gets_until_end() {
        let mut r = LineReader::new("a\nb\n");
        assert_eq!(r.gets().as_deref(), Some("a"));
        assert_eq!(r.gets().as_deref(), Some("b"));
        assert_eq!(r.gets(), None);
        assert_eq!(r.gets(), None);
        assert_eq!(r.lineno(), 2);
    }

    #[test]
    fn test_ungets_is_transparent() {
        let mut r = LineReader::new("a\nb\n");
        let a = r.gets().unwrap();
        assert_eq!(r.lineno(), 1);
        r.ungets(a);
        assert_eq!(r.lineno(), 0);
        assert_eq!(r.gets().as_deref(), Some("a"));
        assert_eq!(r.lineno(), 1);
    }

    #[test]
    fn test_ungets_stack() {
        let mut r = LineReader::new("c\n");
        r.ungets("b".to_string());
        r.ungets("a".to_string());
        assert_eq!(r.gets().as_deref(), Some("a"));
        assert_eq!(r.gets().as_deref(), Some("b"));
        assert_eq!(r.gets().as_deref(), Some("c"));
    }

    #[test]
    fn test_peek_has_no_effect() {
        let mut r = LineReader::new("a\n");
        assert_eq!(r.peek().as_deref(), Some("a"));
        assert_eq!(r.lineno(), 0);
        assert!(r.has_next());
        r.gets();
        assert!(!r.has_next());
        assert_eq!(r.peek(), None);
    }

    #[test]
    fn test_while_match_stops_at_miss() {
        let re = Regex::new(r"^\s+\*").unwrap();
        let mut r = LineReader::new(" * a\n * b\nplain\n");
        assert_eq!(r.while_match(&re), vec![" * a", " * b"]);
        assert_eq!(r.gets().as_deref(), Some("plain"));
    }

    #[test]
    fn test_until_match() {
        let re = Regex::new(r"^//").unwrap();
        let mut r = LineReader::new("x\ny\n//}\n");
        assert_eq!(r.until_match(&re), vec!["x", "y"]);
        assert_eq!(r.peek().as_deref(), Some("//}"));
    }

    #[test]
    fn test_until_terminator_discards_terminator() {
        let re = Regex::new(r"^//\}").unwrap();
        let mut r = LineReader::new("foo\nbar\n//}\nafter\n");
        assert_eq!(r.until_terminator(&re), Some(vec!["foo".to_string(), "bar".to_string()]));
        assert_eq!(r.gets().as_deref(), Some("after"));
    }

    #[test]
    fn test_until_terminator_missing() {
        let re = Regex::new(r"^//\}").unwrap();
        let mut r = LineReader::new("foo\nbar\n");
        assert_eq!(r.until_terminator(&re), None);
        assert_eq!(r.gets().as_deref(), Some("foo"));
    }

    #[test]
    fn test_source_line_follows_origins() {
        let source = preprocess("a.re", "one\n#@# skip\ntwo\n").unwrap();
        let mut r = LineReader::from_source(source);
        r.gets();
        assert_eq!(r.source_line(), 1);
        r.gets();
        assert_eq!(r.source_line(), 3);
    }

    #[test]
    fn test_skip_blank_lines() {
        let mut r = LineReader::new("\n  \nx\n");
        assert_eq!(r.skip_blank_lines(), 2);
        assert_eq!(r.gets().as_deref(), Some("x"));
    }
}
