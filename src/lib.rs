//! termsub - 电子书章节文本术语替换引擎
//!
//! 规则文档 → RuleLoader → RuleCompiler → MatchCollector → ConflictResolver → Rewriter

// 导出全局错误类型
pub use self::error::{TermError, TermResult};

// 导出配置模块
pub use self::config::{GlobalConfig, ConfigManager, CustomConfigBuilder};

// 导出规则模块核心接口
pub use self::rule::{Rule, RuleDocument, BookSettings, RuleLoader};

// 导出编译模块核心接口
pub use self::compiler::{CompiledMatcher, RuleCompiler};

// 导出改写模块核心接口
pub use self::engine::{
    TermEngine,
    RewriteOutcome,
    RewriteStats,
    Match,
    MatchCollector,
    ConflictResolver,
    ResolvedMatchSet,
    Rewriter,
    load_rules,
    rewrite,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod engine;
pub mod utils;
