//! book-key 推导：从目标文件名（或规则文件名）得到结构化文档中的分组键

use std::path::Path;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TermError, TermResult};

/// 规则文件名约定后缀（`my-book-terms.json` -> `my-book`）
pub const TERMS_SUFFIX: &str = "-terms";

/// 字母、数字以外的连续字符视为一个分隔符
static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}]+").unwrap()
});

/// 取文件基名并去扩展名、转小写、分隔符统一为连字符（首尾不留连字符）
pub fn normalize_name(name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());

    let lowered = stem.trim().to_lowercase();
    SEPARATOR_REGEX
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// 由目标文件名推导 book-key
pub fn from_target(target_name: &str) -> String {
    normalize_name(target_name)
}

/// 由规则文档自身文件名推导 book-key（去掉 `-terms` 后缀）
pub fn from_document(document_name: &str) -> String {
    let key = normalize_name(document_name);
    match key.strip_suffix(TERMS_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => key,
    }
}

/// 优先目标文件名，其次规则文件名；两者都没有时无法定位规则子集
pub fn resolve(target_name: Option<&str>, document_name: Option<&str>) -> TermResult<String> {
    let key = match (target_name, document_name) {
        (Some(target), _) if !target.trim().is_empty() => from_target(target),
        (_, Some(document)) if !document.trim().is_empty() => from_document(document),
        _ => {
            return Err(TermError::InvalidInput(
                "structured rule document needs a target or document name to derive the book key".to_string(),
            ));
        }
    };

    if key.is_empty() {
        return Err(TermError::InvalidInput("derived book key is empty".to_string()));
    }
    Ok(key)
}
