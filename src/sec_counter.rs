/// Hierarchical section counter for one chapter or part render pass.
///
/// Slot `level - 1` counts headings of that level; slot 0 holds the chapter's own
/// number. Counting always happens; `prefix` only decides whether to show it.
#[derive(Debug, Clone)]
pub struct SecCounter {
    counts: Vec<usize>,
    label: String,
    numbered: bool,
    postfix: String,
}

impl SecCounter {
    /// `number` is the chapter's number; `None` seeds slot 0 with 1 and turns
    /// display prefixes off.
    pub fn new(depth: usize, number: Option<usize>) -> Self {
        let depth = depth.max(1);
        let mut counts = vec![0; depth];
        counts[0] = number.unwrap_or(1);
        SecCounter {
            label: counts[0].to_string(),
            counts,
            numbered: number.is_some(),
            postfix: "\u{3000}".to_string(),
        }
    }

    /// Display label for slot 0, e.g. `A` for an appendix.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }

    pub fn depth(&self) -> usize {
        self.counts.len()
    }

    /// Count one more heading at `level` and reset everything deeper.
    /// Levels beyond the configured depth are ignored.
    pub fn inc(&mut self, level: usize) {
        if level < 2 || level > self.counts.len() {
            return;
        }
        let slot = level - 1;
        self.counts[slot] += 1;
        for c in self.counts.iter_mut().skip(slot + 1) {
            *c = 0;
        }
    }

    fn path(&self, level: usize) -> impl Iterator<Item = String> + '_ {
        let n = level.clamp(1, self.counts.len());
        std::iter::once(self.label.clone())
            .chain(self.counts[1..n].iter().map(|c| c.to_string()))
    }

    /// Stable id fragment such as `1-1-2-1`.
    pub fn anchor(&self, level: usize) -> String {
        self.path(level).collect::<Vec<_>>().join("-")
    }

    /// Human-facing number such as `1.1　`, or `None` when `level` is deeper than
    /// `secnolevel` or the chapter is unnumbered.
    pub fn prefix(&self, level: usize, secnolevel: usize) -> Option<String> {
        if !self.numbered || level > secnolevel {
            return None;
        }
        let mut out = self.path(level).collect::<Vec<_>>().join(".");
        out.push_str(&self.postfix);
        Some(out)
    }

    /// Hierarchical number below the chapter, e.g. `[1, 2]` for a level-3 heading.
    pub fn numbers(&self, level: usize) -> Vec<usize> {
        let n = level.clamp(1, self.counts.len());
        self.counts[1..n].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_and_anchor() {
        let mut c = SecCounter::new(5, Some(1));
        c.inc(2);
        c.inc(3);
        c.inc(3);
        c.inc(4);
        assert_eq!(c.anchor(4), "1-1-2-1");
        assert_eq!(c.prefix(2, 5).as_deref(), Some("1.1\u{3000}"));
        assert_eq!(c.prefix(2, 1), None);
    }

    #[test]
    fn test_inc_resets_deeper_levels() {
        let mut c = SecCounter::new(5, Some(2));
        c.inc(2);
        c.inc(3);
        c.inc(3);
        c.inc(2);
        assert_eq!(c.anchor(3), "2-2-0");
        c.inc(3);
        assert_eq!(c.anchor(3), "2-2-1");
        assert_eq!(c.numbers(3), vec![2, 1]);
    }

    #[test]
    fn test_unnumbered_chapter_has_anchor_but_no_prefix() {
        let mut c = SecCounter::new(5, None);
        c.inc(2);
        assert_eq!(c.anchor(2), "1-1");
        assert_eq!(c.prefix(2, 5), None);
    }

    #[test]
    fn test_levels_beyond_depth_are_ignored() {
        let mut c = SecCounter::new(3, Some(1));
        c.inc(2);
        c.inc(6);
        assert_eq!(c.anchor(6), "1-1-0");
    }

    #[test]
    fn test_appendix_label() {
        let mut c = SecCounter::new(5, Some(1)).with_label("A");
        c.inc(2);
        assert_eq!(c.prefix(2, 2).as_deref(), Some("A.1\u{3000}"));
        assert_eq!(c.anchor(2), "A-1");
    }

    #[test]
    fn test_postfix_override() {
        let mut c = SecCounter::new(5, Some(3)).with_postfix(". ");
        c.inc(2);
        assert_eq!(c.prefix(2, 2).as_deref(), Some("3.1. "));
    }
}
