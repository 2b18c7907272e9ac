//! 改写模块：候选收集 → 冲突消解 → 偏移安全改写
pub mod collector;
pub mod resolver;
pub mod splice;
pub mod engine;

// 导出核心接口
pub use self::collector::{Match, MatchCollector};
pub use self::resolver::{ConflictResolver, ResolvedMatchSet};
pub use self::splice::Rewriter;
pub use self::engine::{TermEngine, RewriteOutcome, RewriteStats, load_rules, rewrite};
