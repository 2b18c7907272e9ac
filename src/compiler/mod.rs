//! 编译模块：将校验后的规则编译为可执行匹配器
pub mod lookbehind;
pub mod pattern;
pub mod compiler;

pub use self::pattern::{
    CompiledMatcher, LiteralBucket, LiteralMatcher, LiteralTarget, LookbehindGuard,
    PatternBranch, PatternMatcher, Replacement, RuleBucket,
};
pub use self::compiler::RuleCompiler;
