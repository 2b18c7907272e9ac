//! 规则模块：负责规则文档解析、book-key 推导与规则校验
pub mod model;
pub mod book_key;
pub mod loader;

// 导出核心接口
pub use self::model::{Rule, RuleDocument, BookSettings};
pub use self::loader::RuleLoader;
