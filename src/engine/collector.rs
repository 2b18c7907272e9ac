//! 候选匹配收集
//! 在原文上运行全部匹配器，得到无序的候选列表；不同匹配器之间允许重叠

use std::borrow::Cow;
use regex::Captures;

use crate::compiler::{CompiledMatcher, LiteralMatcher, PatternBranch, PatternMatcher};
use crate::error::{TermError, TermResult};
use crate::utils::preview_compact;

/// 候选匹配：原文上的半开区间 `[start, end)` 与其替换文本
/// 替换文本通常借用自编译结果，含分组引用时为展开后的新串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'r> {
    pub start: usize,
    pub end: usize,
    pub replacement: Cow<'r, str>,
    /// 产生该匹配的规则声明序号（同区间平局时的决胜键）
    pub rule_index: usize,
}

impl Match<'_> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn overlaps(&self, other: &Match<'_>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// 候选匹配收集器
pub struct MatchCollector;

impl MatchCollector {
    /// 收集所有非空候选匹配
    pub fn collect<'r>(matchers: &'r [CompiledMatcher], text: &str) -> TermResult<Vec<Match<'r>>> {
        let mut candidates = Vec::new();
        for matcher in matchers {
            match matcher {
                CompiledMatcher::Pattern(pattern) => Self::collect_pattern(pattern, text, &mut candidates),
                CompiledMatcher::Literal(literal) => Self::collect_literal(literal, text, &mut candidates)?,
            }
        }
        Ok(candidates)
    }

    fn collect_pattern<'r>(pattern: &'r PatternMatcher, text: &str, out: &mut Vec<Match<'r>>) {
        let with_captures = pattern.replacement.is_template();
        for branch in &pattern.branches {
            Self::scan_branch(branch, text, with_captures, |start, end, caps| {
                out.push(Match {
                    start,
                    end,
                    replacement: pattern.replacement.render(caps.as_ref()),
                    rule_index: pattern.rule_index,
                });
            });
        }
    }

    /// 逐个候选推进；守卫拒绝时从下一个字符重新搜索，等价于引擎内的后行断言回溯
    /// 只有替换文本需要分组时才走较慢的捕获搜索
    fn scan_branch<'t>(
        branch: &PatternBranch,
        text: &'t str,
        with_captures: bool,
        mut emit: impl FnMut(usize, usize, Option<Captures<'t>>),
    ) {
        let mut pos = 0;
        while pos <= text.len() {
            let (start, end, caps) = if with_captures {
                let Some(caps) = branch.regex.captures_at(text, pos) else {
                    break;
                };
                let Some(whole) = caps.get(0) else {
                    break;
                };
                (whole.start(), whole.end(), Some(caps))
            } else {
                let Some(m) = branch.regex.find_at(text, pos) else {
                    break;
                };
                (m.start(), m.end(), None)
            };

            if start == end {
                pos = next_char_boundary(text, end);
                continue;
            }

            let allowed = branch
                .guard
                .as_ref()
                .is_none_or(|guard| guard.allows(text, start));
            if allowed {
                emit(start, end, caps);
                pos = end;
            } else {
                pos = next_char_boundary(text, start);
            }
        }
    }

    fn collect_literal<'r>(literal: &'r LiteralMatcher, text: &str, out: &mut Vec<Match<'r>>) -> TermResult<()> {
        for caps in literal.regex.captures_iter(text) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            if m.is_empty() {
                continue;
            }
            let target = literal.resolve(&caps).ok_or_else(|| {
                TermError::RewriteError(format!(
                    "matched text {:?} at {} has no replacement in literal bucket [{}]",
                    preview_compact(m.as_str(), 40).to_string(),
                    m.start(),
                    literal.bucket
                ))
            })?;
            out.push(Match {
                start: m.start(),
                end: m.end(),
                replacement: Cow::Borrowed(&target.replacement),
                rule_index: target.rule_index,
            });
        }
        Ok(())
    }
}

/// `index` 之后的下一个字符边界；越过末尾时返回 len + 1 以终止扫描
fn next_char_boundary(text: &str, index: usize) -> usize {
    match text[index..].chars().next() {
        Some(c) => index + c.len_utf8(),
        None => text.len() + 1,
    }
}
