//! 编译后模式模型
//! 正则规则编译为带守卫的分支集合，字面量规则按桶合并为单一交替正则

use std::borrow::Cow;
use std::fmt;
use regex::{Captures, Regex};

use crate::rule::Rule;

/// 字面量桶：大小写敏感 × 全词匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiteralBucket {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

impl LiteralBucket {
    /// 固定的桶编译顺序
    pub const ALL: [LiteralBucket; 4] = [
        LiteralBucket { case_sensitive: true, whole_word: false },
        LiteralBucket { case_sensitive: true, whole_word: true },
        LiteralBucket { case_sensitive: false, whole_word: false },
        LiteralBucket { case_sensitive: false, whole_word: true },
    ];

    /// 同桶重复检测键：大小写不敏感桶统一转小写
    pub fn dedup_key(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

impl fmt::Display for LiteralBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            if self.case_sensitive { "case-sensitive" } else { "case-insensitive" },
            if self.whole_word { "whole-word" } else { "substring" }
        )
    }
}

/// 规则所属分桶
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleBucket {
    Pattern,
    Literal(LiteralBucket),
}

impl RuleBucket {
    pub fn of(rule: &Rule) -> Self {
        if rule.is_regex {
            RuleBucket::Pattern
        } else {
            RuleBucket::Literal(LiteralBucket {
                case_sensitive: rule.case_sensitive,
                whole_word: rule.whole_word,
            })
        }
    }
}

/// 后行断言守卫：`(?:X)\z` 在候选起点之前的文本上检查
#[derive(Debug, Clone)]
pub struct LookbehindGuard {
    pub regex: Regex,
    pub negated: bool,
    /// 断言可能覆盖的最大字节宽度，None 表示无上界
    pub max_width: Option<usize>,
}

impl LookbehindGuard {
    /// 起点 `start` 处是否满足断言
    pub fn allows(&self, text: &str, start: usize) -> bool {
        let prefix = &text[..start];
        let from = match self.max_width {
            Some(width) => floor_char_boundary(prefix, start.saturating_sub(width)),
            None => 0,
        };
        // is_match_at 会参考 from 之前的上下文，`^`、`\b` 语义不受窗口截断影响
        self.regex.is_match_at(prefix, from) != self.negated
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// 正则规则的单个可执行分支
#[derive(Debug, Clone)]
pub struct PatternBranch {
    pub guard: Option<LookbehindGuard>,
    pub regex: Regex,
}

/// 正则规则的替换文本
///
/// 规则文档沿用 `\1`、`\g<name>` 形式的分组引用；含引用的文本在编译时转换为
/// `Captures::expand` 的 `${..}` 模板，其余情况原样插入。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Literal(String),
    Template(String),
}

impl Replacement {
    /// 解析替换文本：`\N`/`\g<name>` 为分组引用，`\\`、`\n`、`\t`、`\r` 为转义，
    /// 其余反斜杠原样保留
    pub fn parse(text: &str) -> Self {
        if !text.contains('\\') {
            return Replacement::Literal(text.to_string());
        }

        let mut plain = String::with_capacity(text.len());
        let mut template = String::with_capacity(text.len() + 8);
        let mut has_group = false;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '\\' {
                plain.push(c);
                if c == '$' {
                    template.push_str("$$");
                } else {
                    template.push(c);
                }
                continue;
            }

            match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    // 最多两位组号，与 `\12` 的常见写法一致
                    let mut group = String::new();
                    while group.len() < 2 {
                        match chars.peek() {
                            Some(d) if d.is_ascii_digit() => {
                                group.push(*d);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    has_group = true;
                    template.push_str(&format!("${{{}}}", group));
                }
                Some('g') => {
                    let rest: String = chars.clone().skip(1).collect();
                    let name = rest
                        .strip_prefix('<')
                        .and_then(|r| r.find('>').map(|end| r[..end].to_string()))
                        .filter(|n| !n.is_empty());
                    match name {
                        Some(name) => {
                            // 跳过 `g<name>`
                            for _ in 0..name.chars().count() + 3 {
                                chars.next();
                            }
                            has_group = true;
                            template.push_str(&format!("${{{}}}", name));
                        }
                        None => {
                            plain.push('\\');
                            template.push('\\');
                        }
                    }
                }
                Some(e @ ('\\' | 'n' | 't' | 'r')) => {
                    chars.next();
                    let decoded = match e {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        _ => '\\',
                    };
                    plain.push(decoded);
                    template.push(decoded);
                }
                _ => {
                    plain.push('\\');
                    template.push('\\');
                }
            }
        }

        if has_group {
            Replacement::Template(template)
        } else {
            Replacement::Literal(plain)
        }
    }

    /// 按匹配的分组展开；`caps` 仅在模板时使用
    pub fn render<'r>(&'r self, caps: Option<&Captures<'_>>) -> Cow<'r, str> {
        match (self, caps) {
            (Replacement::Literal(text), _) => Cow::Borrowed(text),
            (Replacement::Template(template), Some(caps)) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                Cow::Owned(out)
            }
            (Replacement::Template(template), None) => Cow::Borrowed(template),
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Replacement::Template(_))
    }
}

/// 正则规则匹配器（一条规则、一个替换文本）
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pub rule_index: usize,
    pub label: String,
    pub replacement: Replacement,
    /// 规范化后的等价正则文本
    pub normalized: String,
    pub branches: Vec<PatternBranch>,
}

/// 字面量命中后的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralTarget {
    pub rule_index: usize,
    pub replacement: String,
}

/// 字面量分组匹配器
///
/// 交替正则中第 i 个备选项包在第 i+1 个捕获组里，`targets[i]` 即其目标。
/// 按组号反查而不是按命中文本反查，大小写折叠规则始终与正则引擎一致。
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    pub bucket: LiteralBucket,
    pub regex: Regex,
    pub targets: Vec<LiteralTarget>,
}

impl LiteralMatcher {
    /// 由参与匹配的捕获组反查具体是哪条字面量
    pub fn resolve(&self, caps: &Captures<'_>) -> Option<&LiteralTarget> {
        caps.iter()
            .skip(1)
            .position(|group| group.is_some())
            .and_then(|i| self.targets.get(i))
    }
}

/// 编译后的匹配器
#[derive(Debug, Clone)]
pub enum CompiledMatcher {
    Pattern(PatternMatcher),
    Literal(LiteralMatcher),
}

impl CompiledMatcher {
    /// 规则描述（用于日志/调试输出）
    pub fn describe(&self) -> String {
        match self {
            CompiledMatcher::Pattern(p) => format!("pattern {}: {}", p.label, p.normalized),
            CompiledMatcher::Literal(l) => format!("literals [{}] x{}", l.bucket, l.targets.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_bucket_partition() {
        assert_eq!(RuleBucket::of(&Rule::pattern("a+", "b")), RuleBucket::Pattern);
        assert_eq!(
            RuleBucket::of(&Rule::literal("a", "b").case_sensitive(false).whole_word(true)),
            RuleBucket::Literal(LiteralBucket { case_sensitive: false, whole_word: true })
        );
    }

    #[test]
    fn test_guard_window_and_negation() {
        let guard = LookbehindGuard {
            regex: Regex::new(r"(?:\d)\z").unwrap(),
            negated: false,
            max_width: Some(4),
        };
        let text = "10cr é1cr xcr";
        assert!(guard.allows(text, 2));
        assert!(guard.allows(text, text.find("1cr").unwrap() + 1));
        assert!(!guard.allows(text, text.rfind("cr").unwrap()));
        assert!(!guard.allows(text, 0));

        let negated = LookbehindGuard { negated: true, ..guard };
        assert!(negated.allows(text, text.rfind("cr").unwrap()));
    }

    #[test]
    fn test_guard_sees_context_before_window() {
        // `^` 只在真正的文本开头成立
        let guard = LookbehindGuard {
            regex: Regex::new(r"(?:^a)\z").unwrap(),
            negated: false,
            max_width: Some(1),
        };
        assert!(guard.allows("ab", 1));
        assert!(!guard.allows("bab", 2));
    }

    #[test]
    fn test_replacement_group_references() {
        assert_eq!(Replacement::parse("$5 credits"), Replacement::Literal("$5 credits".to_string()));
        assert_eq!(Replacement::parse(r"a\\b\q"), Replacement::Literal(r"a\b\q".to_string()));
        assert_eq!(
            Replacement::parse(r"\1 costs $\g<amount>"),
            Replacement::Template("${1} costs $$${amount}".to_string())
        );
        assert_eq!(Replacement::parse(r"\g<"), Replacement::Literal(r"\g<".to_string()));

        let regex = Regex::new(r"(\w+)=(?P<amount>\d+)").unwrap();
        let caps = regex.captures("gold=10").unwrap();
        let template = Replacement::parse(r"\1 costs $\g<amount>");
        assert_eq!(template.render(Some(&caps)), "gold costs $10");
    }

    #[test]
    fn test_literal_resolved_by_group() {
        let matcher = LiteralMatcher {
            bucket: LiteralBucket { case_sensitive: false, whole_word: false },
            regex: regex::RegexBuilder::new("(ab)|(s)").case_insensitive(true).build().unwrap(),
            targets: vec![
                LiteralTarget { rule_index: 3, replacement: "X".to_string() },
                LiteralTarget { rule_index: 0, replacement: "Z".to_string() },
            ],
        };
        let caps = matcher.regex.captures("ſ").unwrap();
        assert_eq!(matcher.resolve(&caps).map(|t| t.rule_index), Some(0));
        let caps = matcher.regex.captures("xAB").unwrap();
        assert_eq!(matcher.resolve(&caps).map(|t| t.rule_index), Some(3));
    }
}
