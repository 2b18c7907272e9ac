//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;

#[derive(Error, Debug)]
pub enum TermError {
    // 规则文档相关错误
    #[error("Malformed rule document: {0}")]
    MalformedDocument(String),
    #[error("Rule document is missing required key `{0}`")]
    MissingStructure(&'static str),
    #[error("Book key `{0}` not found in rule document terms")]
    UnresolvableBookKey(String),
    #[error("Rule set for book key `{0}` is disabled")]
    BookDisabled(String),
    #[error("Invalid rule #{index}: field `{field}` {reason}")]
    InvalidRule {
        index: usize,
        field: &'static str,
        reason: String,
    },

    // 编译相关错误
    #[error("Pattern compilation failed for rule {rule}: {source}")]
    PatternCompile {
        rule: String,
        #[source]
        source: RegexError,
    },

    // 改写相关错误
    #[error("Rewrite failed: {0}")]
    RewriteError(String),

    // 基础错误
    #[error("JSON parse failed: {0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("IO operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type TermResult<T> = Result<T, TermError>;
