//! 规则编译器核心
//! 仅负责将校验后的规则编译为可执行匹配器：正则规则逐条编译，字面量规则按桶合并

use std::collections::{HashMap, HashSet};
use std::time::Instant;
use regex::{Regex, RegexBuilder};
use regex_syntax::ParserBuilder;
use tracing::{debug, warn};

use super::lookbehind::{self, Lookbehind, NormalizedBranch};
use super::pattern::{
    CompiledMatcher, LiteralBucket, LiteralMatcher, LiteralTarget, LookbehindGuard,
    PatternBranch, PatternMatcher, Replacement, RuleBucket,
};
use crate::error::{TermError, TermResult};
use crate::rule::Rule;

/// 合并字面量正则的编译体积上限（默认 10MB 对上千条术语不够用）
const LITERAL_SIZE_LIMIT: usize = 64 * (1 << 20);

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则序列
    pub fn compile(rules: &[Rule]) -> TermResult<Vec<CompiledMatcher>> {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let mut matchers = Vec::new();
        let mut literal_buckets: HashMap<LiteralBucket, Vec<(usize, &Rule)>> = HashMap::new();

        // 1. 分桶：正则规则直接编译，字面量规则按 (大小写 × 全词) 收集
        for (index, rule) in rules.iter().enumerate() {
            match RuleBucket::of(rule) {
                RuleBucket::Pattern => {
                    let matcher = Self::compile_pattern_rule(index, rule, &mut stats)?;
                    matchers.push(CompiledMatcher::Pattern(matcher));
                }
                RuleBucket::Literal(bucket) => {
                    literal_buckets.entry(bucket).or_default().push((index, rule));
                }
            }
        }

        // 2. 每个非空字面量桶编译为一个合并正则
        for bucket in LiteralBucket::ALL {
            let Some(entries) = literal_buckets.remove(&bucket) else {
                continue;
            };
            if let Some(matcher) = Self::compile_literal_bucket(bucket, &entries, &mut stats)? {
                matchers.push(CompiledMatcher::Literal(matcher));
            }
        }

        debug!("✅ 规则编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "📊 编译统计：正则规则{}条（后行断言展开{}条，分支{}个，分组引用替换{}条）、字面量{}条（合并为{}个桶，跳过{}条）",
            stats.pattern_count,
            stats.lookbehind_rewrites,
            stats.branch_count,
            stats.template_count,
            stats.literal_count,
            stats.bucket_count,
            stats.skipped_literals
        );

        Ok(matchers)
    }

    /// 编译单条正则规则：先做后行断言规范化，再逐分支编译
    fn compile_pattern_rule(index: usize, rule: &Rule, stats: &mut CompileStats) -> TermResult<PatternMatcher> {
        let label = rule.label(index);
        let normalized = lookbehind::normalize(&rule.original);
        if normalized.rewritten {
            stats.lookbehind_rewrites += 1;
            debug!("规则 {} 后行断言展开为：{}", label, normalized.to_pattern_string());
        }

        let branches = normalized
            .branches
            .iter()
            .map(|branch| Self::compile_branch(branch, rule))
            .collect::<Result<Vec<_>, regex::Error>>()
            .map_err(|source| TermError::PatternCompile {
                rule: label.clone(),
                source,
            })?;

        stats.pattern_count += 1;
        stats.branch_count += branches.len();

        let replacement = Replacement::parse(&rule.replacement);
        if replacement.is_template() {
            stats.template_count += 1;
        }

        Ok(PatternMatcher {
            rule_index: index,
            label,
            replacement,
            normalized: normalized.to_pattern_string(),
            branches,
        })
    }

    fn compile_branch(branch: &NormalizedBranch, rule: &Rule) -> Result<PatternBranch, regex::Error> {
        let body = if rule.whole_word {
            format!(r"{}\b(?:{})\b", branch.flags, branch.body)
        } else {
            format!("{}{}", branch.flags, branch.body)
        };
        let regex = Self::build_regex(&body, rule.case_sensitive)?;

        let guard = match &branch.lookbehind {
            Some(lb) => Some(Self::compile_guard(&branch.flags, lb, rule.case_sensitive)?),
            None => None,
        };

        Ok(PatternBranch { guard, regex })
    }

    /// 后行断言守卫：断言体锚定到候选起点之前
    fn compile_guard(flags: &str, lookbehind: &Lookbehind, case_sensitive: bool) -> Result<LookbehindGuard, regex::Error> {
        let pattern = format!(r"{}(?:{})\z", flags, lookbehind.body());
        let regex = Self::build_regex(&pattern, case_sensitive)?;

        // 解析失败时不设窗口，退化为检查完整前缀
        let max_width = ParserBuilder::new()
            .case_insensitive(!case_sensitive)
            .build()
            .parse(&pattern)
            .ok()
            .and_then(|hir| hir.properties().maximum_len());

        Ok(LookbehindGuard {
            regex,
            negated: lookbehind.is_negated(),
            max_width,
        })
    }

    fn build_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
    }

    /// 编译字面量桶：按长度降序拼接，保证同起点时长字面量优先
    /// 每个备选项独占一个捕获组，组号与 `targets` 下标一一对应
    fn compile_literal_bucket(
        bucket: LiteralBucket,
        entries: &[(usize, &Rule)],
        stats: &mut CompileStats,
    ) -> TermResult<Option<LiteralMatcher>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut literals: Vec<(&str, LiteralTarget)> = Vec::new();

        for (index, rule) in entries {
            if rule.original.is_empty() {
                warn!("规则 {} 原文为空，已跳过", rule.label(*index));
                stats.skipped_literals += 1;
                continue;
            }
            if !seen.insert(bucket.dedup_key(&rule.original)) {
                // 同桶重复字面量：以先声明者为准
                warn!("规则 {} 与先前字面量重复（桶 {}），已跳过", rule.label(*index), bucket);
                stats.skipped_literals += 1;
                continue;
            }
            literals.push((&rule.original, LiteralTarget {
                rule_index: *index,
                replacement: rule.replacement.clone(),
            }));
        }

        if literals.is_empty() {
            return Ok(None);
        }

        // 稳定排序：等长时保持声明顺序
        literals.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

        let alternation = literals
            .iter()
            .map(|(lit, _)| {
                let escaped = regex::escape(lit);
                if bucket.whole_word {
                    format!(r"\b({})\b", escaped)
                } else {
                    format!("({})", escaped)
                }
            })
            .collect::<Vec<_>>()
            .join("|");

        let regex = RegexBuilder::new(&alternation)
            .case_insensitive(!bucket.case_sensitive)
            .size_limit(LITERAL_SIZE_LIMIT)
            .build()
            .map_err(|source| TermError::PatternCompile {
                rule: format!("literal bucket [{}]", bucket),
                source,
            })?;

        stats.literal_count += literals.len();
        stats.bucket_count += 1;

        let targets = literals.into_iter().map(|(_, target)| target).collect();
        Ok(Some(LiteralMatcher { bucket, regex, targets }))
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    pattern_count: usize,
    branch_count: usize,
    lookbehind_rewrites: usize,
    template_count: usize,
    literal_count: usize,
    bucket_count: usize,
    skipped_literals: usize,
}
