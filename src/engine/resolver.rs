//! 冲突消解：先起点、后长度的贪心选择
//! 排序键 (起点升序, 长度降序, 规则声明序号升序)，单遍扫描选出两两不重叠的最大子集

use super::collector::Match;

/// 两两不重叠的匹配集合（按起点升序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMatchSet<'r> {
    matches: Vec<Match<'r>>,
    discarded: usize,
}

impl<'r> ResolvedMatchSet<'r> {
    pub fn matches(&self) -> &[Match<'r>] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// 因与已接受匹配重叠而丢弃的候选数
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn into_matches(self) -> Vec<Match<'r>> {
        self.matches
    }
}

/// 冲突消解器
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn resolve(mut candidates: Vec<Match<'_>>) -> ResolvedMatchSet<'_> {
        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.len().cmp(&a.len()))
                .then_with(|| a.rule_index.cmp(&b.rule_index))
        });

        let total = candidates.len();
        let mut last_accepted_end: Option<usize> = None;
        let mut accepted = Vec::with_capacity(total);

        for candidate in candidates {
            if last_accepted_end.is_none_or(|end| candidate.start >= end) {
                last_accepted_end = Some(candidate.end);
                accepted.push(candidate);
            }
        }

        ResolvedMatchSet {
            discarded: total - accepted.len(),
            matches: accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn m(start: usize, end: usize, rule_index: usize) -> Match<'static> {
        Match { start, end, replacement: Cow::Borrowed(""), rule_index }
    }

    fn spans(set: &ResolvedMatchSet<'_>) -> Vec<(usize, usize)> {
        set.matches().iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_earliest_start_wins_over_longer() {
        let set = ConflictResolver::resolve(vec![m(2, 8, 0), m(0, 5, 1)]);
        assert_eq!(spans(&set), vec![(0, 5)]);
        assert_eq!(set.discarded(), 1);
    }

    #[test]
    fn test_longest_wins_on_equal_start() {
        let set = ConflictResolver::resolve(vec![m(0, 3, 0), m(0, 4, 1), m(4, 6, 2)]);
        assert_eq!(spans(&set), vec![(0, 4), (4, 6)]);
    }

    #[test]
    fn test_identical_span_tie_uses_declaration_order() {
        let set = ConflictResolver::resolve(vec![m(1, 3, 7), m(1, 3, 2), m(1, 3, 5)]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.matches()[0].rule_index, 2);
    }

    #[test]
    fn test_adjacent_spans_not_overlapping() {
        let set = ConflictResolver::resolve(vec![m(3, 5, 0), m(0, 3, 0), m(5, 9, 0)]);
        assert_eq!(spans(&set), vec![(0, 3), (3, 5), (5, 9)]);
        assert_eq!(set.discarded(), 0);
    }

    #[test]
    fn test_accepted_matches_pairwise_disjoint() {
        // 稠密、相互交错的候选
        let mut candidates = Vec::new();
        for start in 0..40 {
            for len in 1..6 {
                candidates.push(m(start, start + len, (start * 7 + len) % 5));
            }
        }
        let set = ConflictResolver::resolve(candidates);
        let accepted = set.matches();
        for (i, a) in accepted.iter().enumerate() {
            for b in &accepted[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
        assert_eq!(spans(&set), (0..8).map(|k| (k * 5, k * 5 + 5)).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input() {
        let set = ConflictResolver::resolve(Vec::new());
        assert!(set.is_empty());
        assert_eq!(set.discarded(), 0);
    }
}
