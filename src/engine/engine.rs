//! 改写引擎门面：一次编译，多次改写
//! 编译结果不可变，可在多个线程间共享；每次改写调用互不影响

use std::time::Instant;
use rayon::prelude::*;
use tracing::debug;

use super::collector::MatchCollector;
use super::resolver::ConflictResolver;
use super::splice::Rewriter;
use crate::compiler::{CompiledMatcher, RuleCompiler};
use crate::config::GlobalConfig;
use crate::error::TermResult;
use crate::rule::{Rule, RuleLoader};
use crate::utils::preview_compact;

/// 单次改写统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// 收集到的非空候选数
    pub candidates: usize,
    /// 最终应用的匹配数
    pub accepted: usize,
    /// 因重叠被丢弃的候选数
    pub discarded: usize,
}

/// 改写结果（文本 + 统计）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    pub stats: RewriteStats,
}

/// 术语改写引擎
#[derive(Debug, Clone)]
pub struct TermEngine {
    matchers: Vec<CompiledMatcher>,
    rule_count: usize,
    parallel: bool,
}

impl TermEngine {
    /// 按配置从规则文件加载并编译
    pub async fn new(config: GlobalConfig) -> TermResult<Self> {
        let rules = RuleLoader::load_file(&config.rule_path, config.target_name.as_deref()).await?;
        let mut engine = Self::from_rules(&rules)?;
        engine.parallel = config.parallel;

        if config.verbose {
            for matcher in &engine.matchers {
                debug!("已编译匹配器：{}", matcher.describe());
            }
        }
        Ok(engine)
    }

    /// 从已校验的规则编译
    pub fn from_rules(rules: &[Rule]) -> TermResult<Self> {
        let matchers = RuleCompiler::compile(rules)?;
        Ok(Self {
            matchers,
            rule_count: rules.len(),
            parallel: true,
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn matchers(&self) -> &[CompiledMatcher] {
        &self.matchers
    }

    /// 改写单段文本
    pub fn rewrite(&self, text: &str) -> TermResult<String> {
        self.rewrite_detailed(text).map(|outcome| outcome.text)
    }

    /// 改写单段文本并返回统计
    pub fn rewrite_detailed(&self, text: &str) -> TermResult<RewriteOutcome> {
        let start = Instant::now();

        let candidates = MatchCollector::collect(&self.matchers, text)?;
        let candidate_count = candidates.len();
        let resolved = ConflictResolver::resolve(candidates);
        let stats = RewriteStats {
            candidates: candidate_count,
            accepted: resolved.len(),
            discarded: resolved.discarded(),
        };

        let text = if resolved.is_empty() {
            text.to_string()
        } else {
            Rewriter::apply(text, &resolved)?
        };

        debug!(
            "改写完成，耗时{:?}：候选{}、应用{}、丢弃{}，结果预览：{}",
            start.elapsed(),
            stats.candidates,
            stats.accepted,
            stats.discarded,
            preview_compact(&text, 60)
        );

        Ok(RewriteOutcome { text, stats })
    }

    /// 批量改写相互独立的文本（如各章节），结果顺序与输入一致
    pub fn rewrite_batch<S>(&self, texts: &[S]) -> Vec<TermResult<String>>
    where
        S: AsRef<str> + Sync,
    {
        if self.parallel {
            texts.par_iter().map(|t| self.rewrite(t.as_ref())).collect()
        } else {
            texts.iter().map(|t| self.rewrite(t.as_ref())).collect()
        }
    }
}

/// 解析并校验规则文档
pub fn load_rules(document: &[u8], target_name: Option<&str>) -> TermResult<Vec<Rule>> {
    RuleLoader::load_rules(document, target_name)
}

/// 用给定规则改写文本（每次调用都会重新编译规则）
pub fn rewrite(text: &str, rules: &[Rule]) -> TermResult<String> {
    if rules.is_empty() {
        return Ok(text.to_string());
    }
    TermEngine::from_rules(rules)?.rewrite(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::error::TermError;

    #[test]
    fn test_end_to_end_credits() {
        let document = br#"[{"original":"(?<=\\d|\\b)(cr)\\b","replacement":"credits","isRegex":true,"caseSensitive":true,"wholeWord":false}]"#;
        let rules = load_rules(document, None).unwrap();
        let out = rewrite("The cr earned was 10 cr.", &rules).unwrap();
        assert_eq!(out, "The credits earned was 10 credits.");
    }

    #[test]
    fn test_longer_literal_precedence() {
        let rules = vec![Rule::literal("cat", "X"), Rule::literal("cats", "Y")];
        assert_eq!(rewrite("cats", &rules).unwrap(), "Y");
    }

    #[test]
    fn test_whole_word_boundary() {
        let rules = vec![Rule::literal("cat", "dog").whole_word(true)];
        assert_eq!(rewrite("a cat sat", &rules).unwrap(), "a dog sat");
        assert_eq!(rewrite("cats", &rules).unwrap(), "cats");
    }

    #[test]
    fn test_case_sensitivity() {
        let sensitive = vec![Rule::literal("Cat", "Dog")];
        assert_eq!(rewrite("cat Cat", &sensitive).unwrap(), "cat Dog");

        let insensitive = vec![Rule::literal("Cat", "Dog").case_sensitive(false)];
        assert_eq!(rewrite("cat CAT Cat", &insensitive).unwrap(), "Dog Dog Dog");
    }

    #[test]
    fn test_earliest_start_across_rules() {
        // [0,5) 与 [2,8) 重叠：先起点者胜出，即使后者更长
        let rules = vec![Rule::pattern("cdefgh", "LONG"), Rule::literal("abcde", "short")];
        assert_eq!(rewrite("abcdefgh", &rules).unwrap(), "shortfgh");
    }

    #[test]
    fn test_priority_ignores_declaration_order() {
        let forward = vec![Rule::literal("Jon", "John"), Rule::literal("Jon Snow", "Lord Snow")];
        let backward = vec![Rule::literal("Jon Snow", "Lord Snow"), Rule::literal("Jon", "John")];
        let text = "Jon Snow and Jon";
        assert_eq!(rewrite(text, &forward).unwrap(), "Lord Snow and John");
        assert_eq!(rewrite(text, &backward).unwrap(), "Lord Snow and John");
    }

    #[test]
    fn test_identical_span_uses_first_declared_rule() {
        let rules = vec![
            Rule::pattern("Sir", "Ser"),
            Rule::literal("Sir", "Lord"),
        ];
        assert_eq!(rewrite("Sir Jaime", &rules).unwrap(), "Ser Jaime");
    }

    #[test]
    fn test_no_match_returns_identical_text() {
        let rules = vec![Rule::literal("dragon", "wyrm")];
        let text = "Nothing to see here.\n\tEven whitespace stays.";
        assert_eq!(rewrite(text, &rules).unwrap(), text);
        assert_eq!(rewrite(text, &[]).unwrap(), text);
    }

    #[test]
    fn test_replacement_is_literal_text() {
        let rules = vec![Rule::pattern(r"(\d+) gold", "$1 silver")];
        assert_eq!(rewrite("10 gold", &rules).unwrap(), "$1 silver");
    }

    #[test]
    fn test_group_references_in_regex_replacement() {
        let rules = vec![Rule::pattern(r"(\d+) gold", r"\1 silver")];
        assert_eq!(rewrite("10 gold, 3 gold", &rules).unwrap(), "10 silver, 3 silver");

        let named = vec![Rule::pattern(r"Ser (?P<name>\w+)", r"\g<name> of House")];
        assert_eq!(rewrite("Ser Jaime", &named).unwrap(), "Jaime of House");

        // 字面量规则不解析反斜杠
        let literal = vec![Rule::literal("gold", r"\1")];
        assert_eq!(rewrite("gold", &literal).unwrap(), r"\1");
    }

    #[test]
    fn test_regex_alternation_is_leftmost_first() {
        let rules = vec![Rule::pattern("Mr|Mrs", "X")];
        assert_eq!(rewrite("Mrs", &rules).unwrap(), "Xs");

        let mid_flags = vec![Rule::pattern("a(?i)b|c", "X")];
        assert_eq!(rewrite("C", &mid_flags).unwrap(), "X");
        assert_eq!(rewrite("aB", &mid_flags).unwrap(), "X");
    }

    #[test]
    fn test_case_insensitive_literal_non_ascii() {
        let rules = vec![Rule::literal("s", "Z").case_sensitive(false)];
        assert_eq!(rewrite("ſ", &rules).unwrap(), "Z");

        let greek = vec![Rule::literal("λογοσ", "logos").case_sensitive(false)];
        assert_eq!(rewrite("ὁ λογος", &greek).unwrap(), "ὁ logos");
    }

    #[test]
    fn test_rewrite_detailed_counts() {
        let engine = TermEngine::from_rules(&[Rule::literal("ab", "X"), Rule::pattern("bc", "Y")]).unwrap();
        let outcome = engine.rewrite_detailed("abc abc").unwrap();
        assert_eq!(outcome.text, "Xc Xc");
        assert_eq!(
            outcome.stats,
            RewriteStats { candidates: 4, accepted: 2, discarded: 2 }
        );
    }

    #[test]
    fn test_rewrite_batch_keeps_order() {
        let engine = TermEngine::from_rules(&[Rule::literal("Jon", "John")]).unwrap();
        let chapters: Vec<String> = (0..32).map(|i| format!("Chapter {}: Jon", i)).collect();
        let results = engine.rewrite_batch(&chapters);
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), format!("Chapter {}: John", i));
        }
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TermEngine>();
    }

    #[test]
    fn test_invalid_pattern_fails_rewrite() {
        let rules = vec![Rule::pattern("[", "x")];
        assert!(matches!(rewrite("text", &rules), Err(TermError::PatternCompile { .. })));
    }

    #[tokio::test]
    async fn test_engine_from_config() {
        let dir = std::env::temp_dir().join(format!("termsub-engine-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rules.json");
        std::fs::write(
            &path,
            r#"{"formatVersion":"1.0","settings":{},"terms":{"my-book":[{"original":"cr","replacement":"credits","caseSensitive":false,"isRegex":true,"wholeWord":true}]}}"#,
        )
        .unwrap();

        let config = ConfigManager::custom()
            .rule_path(&path)
            .target_name("My_Book.epub")
            .parallel(false)
            .build();
        let engine = TermEngine::new(config).await.unwrap();
        assert_eq!(engine.rule_count(), 1);
        assert_eq!(engine.rewrite("CR and cr, not crab").unwrap(), "credits and credits, not crab");
    }

    #[tokio::test]
    async fn test_disabled_book_yields_no_engine() {
        let dir = std::env::temp_dir().join(format!("termsub-engine-off-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("my-book-terms.json");
        std::fs::write(
            &path,
            r#"{"formatVersion":"1.0","settings":{"my-book":{"isDisabled":true}},"terms":{"my-book":[]}}"#,
        )
        .unwrap();

        let config = ConfigManager::custom().rule_path(&path).build();
        assert!(matches!(TermEngine::new(config).await, Err(TermError::BookDisabled(_))));
    }
}
