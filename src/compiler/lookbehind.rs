//! 后行断言规范化
//! `(?<=A|B|...)X` 在定宽后行断言引擎中无法直接编译，这里把它展开为
//! 多个分支：`\b` 备选项改写为匹配前的单词边界，其余备选项保留为独立的 `(?<=A)`。
//! 每个分支的前导后行断言会被抽出，由匹配阶段作为守卫检查执行。

use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;

/// 仅由内联修饰符组成的前缀，如 `(?i)`、`(?i-u)`
static INLINE_FLAGS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\(\?[a-zA-Z-]+\))+").unwrap()
});

/// 零宽单词边界
const WORD_BOUNDARY: &str = r"\b";

/// 抽出的后行断言
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookbehind {
    /// `(?<=X)`
    Positive(String),
    /// `(?<!X)`
    Negative(String),
}

impl Lookbehind {
    pub fn body(&self) -> &str {
        match self {
            Lookbehind::Positive(b) | Lookbehind::Negative(b) => b,
        }
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Lookbehind::Negative(_))
    }
}

impl fmt::Display for Lookbehind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookbehind::Positive(b) => write!(f, "(?<={})", b),
            Lookbehind::Negative(b) => write!(f, "(?<!{})", b),
        }
    }
}

/// 规范化后的单个分支：可选的前导后行断言 + 主体正则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBranch {
    /// 作用于整个分支的内联修饰符前缀（主体与守卫共享）
    pub flags: String,
    pub lookbehind: Option<Lookbehind>,
    pub body: String,
}

impl fmt::Display for NormalizedBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flags)?;
        if let Some(lb) = &self.lookbehind {
            write!(f, "{}", lb)?;
        }
        f.write_str(&self.body)
    }
}

/// 规范化结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPattern {
    pub branches: Vec<NormalizedBranch>,
    /// 是否发生了后行断言内备选项的展开
    pub rewritten: bool,
}

impl NormalizedPattern {
    /// 等价的单一正则文本（分支以 `|` 连接），用于日志
    pub fn to_pattern_string(&self) -> String {
        self.branches
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// 规范化用户正则
pub fn normalize(pattern: &str) -> NormalizedPattern {
    let flags = INLINE_FLAGS_REGEX
        .find(pattern)
        .map(|m| m.as_str())
        .unwrap_or("");
    let rest = &pattern[flags.len()..];

    // 不含后行断言的正则整体保留：拆开顶层 `|` 会把最左优先变成最长优先，
    // 也会丢掉写在中间的内联修饰符
    let alternatives = split_top_level(rest);
    if alternatives.iter().all(|alt| find_lookbehind(alt).is_none()) {
        return NormalizedPattern {
            branches: vec![plain_branch(flags, rest.to_string())],
            rewritten: false,
        };
    }

    // 只展开带断言的备选项，其余备选项按原顺序合并为一个分支
    let mut branches = Vec::new();
    let mut untouched: Vec<&str> = Vec::new();
    let mut rewritten = false;

    for alternative in alternatives {
        if find_lookbehind(alternative).is_some() {
            rewritten |= expand_alternative(flags, alternative, &mut branches);
        } else {
            untouched.push(alternative);
        }
    }
    if !untouched.is_empty() {
        branches.push(plain_branch(flags, untouched.join("|")));
    }

    NormalizedPattern { branches, rewritten }
}

/// 展开单个顶层备选项，返回是否拆分了后行断言内的备选项
fn expand_alternative(flags: &str, alternative: &str, out: &mut Vec<NormalizedBranch>) -> bool {
    let Some((open, negated)) = find_lookbehind(alternative) else {
        out.push(plain_branch(flags, alternative.to_string()));
        return false;
    };
    let Some(close) = find_group_end(alternative, open) else {
        // 括号不闭合，原样交给正则引擎报错
        out.push(plain_branch(flags, alternative.to_string()));
        return false;
    };

    let head = &alternative[..open];
    let inner = &alternative[open + 4..close];
    let tail = &alternative[close + 1..];

    if negated {
        out.push(guarded_branch(flags, head, Lookbehind::Negative(inner.to_string()), tail));
        return false;
    }

    let options = split_top_level(inner);
    if options.len() < 2 {
        out.push(guarded_branch(flags, head, Lookbehind::Positive(inner.to_string()), tail));
        return false;
    }

    for option in options {
        if option.trim() == WORD_BOUNDARY {
            out.push(plain_branch(flags, format!("{}{}{}", head, WORD_BOUNDARY, tail)));
        } else {
            out.push(guarded_branch(flags, head, Lookbehind::Positive(option.to_string()), tail));
        }
    }
    true
}

fn plain_branch(flags: &str, body: String) -> NormalizedBranch {
    NormalizedBranch {
        flags: flags.to_string(),
        lookbehind: None,
        body,
    }
}

/// 断言前仍有内容时无法抽成守卫，保留在主体里
fn guarded_branch(flags: &str, head: &str, lookbehind: Lookbehind, tail: &str) -> NormalizedBranch {
    if head.is_empty() {
        NormalizedBranch {
            flags: flags.to_string(),
            lookbehind: Some(lookbehind),
            body: tail.to_string(),
        }
    } else {
        plain_branch(flags, format!("{}{}{}", head, lookbehind, tail))
    }
}

/// 查找第一个 `(?<=` / `(?<!`，返回其起始位置与是否为否定断言
fn find_lookbehind(pattern: &str) -> Option<(usize, bool)> {
    let bytes = pattern.as_bytes();
    let mut scanner = Scanner::default();
    for i in 0..bytes.len() {
        if scanner.is_literal(bytes, i) {
            continue;
        }
        if bytes[i] == b'(' && bytes[i + 1..].starts_with(b"?<=") {
            return Some((i, false));
        }
        if bytes[i] == b'(' && bytes[i + 1..].starts_with(b"?<!") {
            return Some((i, true));
        }
    }
    None
}

/// 从 `open` 处的 `(` 出发查找与之配对的 `)`
fn find_group_end(pattern: &str, open: usize) -> Option<usize> {
    let bytes = pattern.as_bytes();
    let mut scanner = Scanner::default();
    let mut depth = 0usize;
    for i in open..bytes.len() {
        if scanner.is_literal(bytes, i) {
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// 按顶层（不在分组/字符集内、未转义）的 `|` 拆分
pub fn split_top_level(pattern: &str) -> Vec<&str> {
    let bytes = pattern.as_bytes();
    let mut scanner = Scanner::default();
    let mut depth = 0usize;
    let mut parts = Vec::new();
    let mut last = 0;

    for i in 0..bytes.len() {
        if scanner.is_literal(bytes, i) {
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'|' if depth == 0 => {
                parts.push(&pattern[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&pattern[last..]);
    parts
}

/// 逐字节扫描状态：跟踪转义与字符集，只在 ASCII 位置上做判断，UTF-8 安全
#[derive(Debug, Default)]
struct Scanner {
    escaped: bool,
    class_depth: usize,
    class_start: Option<usize>,
}

impl Scanner {
    /// 当前字节是否应视为字面内容（被转义或位于字符集内）
    fn is_literal(&mut self, bytes: &[u8], i: usize) -> bool {
        let b = bytes[i];
        if self.escaped {
            self.escaped = false;
            return true;
        }
        if b == b'\\' {
            self.escaped = true;
            return true;
        }

        if self.class_depth > 0 {
            match b {
                b'[' => self.class_depth += 1,
                b']' => {
                    // `[]` / `[^]` 开头的 `]` 是字面量
                    let leading = self.class_start.is_some_and(|s| {
                        i == s + 1 || (i == s + 2 && bytes[s + 1] == b'^')
                    });
                    if !leading {
                        self.class_depth -= 1;
                    }
                }
                _ => {}
            }
            return true;
        }

        if b == b'[' {
            self.class_depth = 1;
            self.class_start = Some(i);
            return true;
        }
        false
    }
}
