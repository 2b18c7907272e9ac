//! 规则数据模型定义
//! 仅存储规则数据，字段校验在加载阶段一次完成，匹配阶段不再重复校验

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TermError, TermResult};

/// 单条查找/替换规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub original: String,
    pub replacement: String,
    pub case_sensitive: bool,
    pub is_regex: bool,
    #[serde(default)]
    pub whole_word: bool,
}

impl Rule {
    /// 字面量规则（测试与调用方便捷构造）
    pub fn literal(original: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            id: None,
            original: original.into(),
            replacement: replacement.into(),
            case_sensitive: true,
            is_regex: false,
            whole_word: false,
        }
    }

    /// 正则规则
    pub fn pattern(original: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            is_regex: true,
            ..Self::literal(original, replacement)
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 从松散的 JSON 对象校验并构造规则，任何字段不合法即整体失败
    pub fn from_value(index: usize, value: &Value) -> TermResult<Self> {
        let Value::Object(obj) = value else {
            return Err(TermError::InvalidRule {
                index,
                field: "<rule>",
                reason: format!("must be an object, got {}", json_type_name(value)),
            });
        };

        Ok(Self {
            id: optional_string(obj, index, "id")?,
            original: required_string(obj, index, "original")?,
            replacement: required_string(obj, index, "replacement")?,
            case_sensitive: required_bool(obj, index, "caseSensitive")?,
            is_regex: required_bool(obj, index, "isRegex")?,
            whole_word: optional_bool(obj, index, "wholeWord")?.unwrap_or(false),
        })
    }

    /// 日志与错误信息中使用的规则标识
    pub fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) => format!("`{}` (#{})", id, index),
            None => format!("#{} `{}`", index, self.original),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_regex { "regex" } else { "literal" };
        write!(f, "{} {:?} -> {:?}", kind, self.original, self.replacement)
    }
}

/// 单本书的规则集设置（未知字段原样保留）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSettings {
    #[serde(rename = "isDisabled", default)]
    pub is_disabled: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// 规则文档（两种格式）
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    /// 扁平格式：规则数组
    Flat(Vec<Value>),
    /// 结构化格式：按 book-key 分组
    Structured {
        format_version: String,
        settings: HashMap<String, BookSettings>,
        terms: HashMap<String, Vec<Value>>,
    },
}

impl RuleDocument {
    /// 结构化文档的三个必需顶层键
    pub const REQUIRED_KEYS: [&'static str; 3] = ["formatVersion", "settings", "terms"];

    /// 按顶层形状识别文档格式：数组为扁平格式，对象为结构化格式
    pub fn parse(bytes: &[u8]) -> TermResult<Self> {
        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| TermError::MalformedDocument(e.to_string()))?;

        match root {
            Value::Array(items) => Ok(RuleDocument::Flat(items)),
            Value::Object(mut obj) => {
                for key in Self::REQUIRED_KEYS {
                    if !obj.contains_key(key) {
                        return Err(TermError::MissingStructure(key));
                    }
                }

                let format_version = match obj.remove("formatVersion") {
                    Some(Value::String(v)) => v,
                    other => {
                        return Err(TermError::MalformedDocument(format!(
                            "`formatVersion` must be a string, got {}",
                            other.as_ref().map_or("nothing", json_type_name)
                        )));
                    }
                };

                let settings = obj.remove("settings").unwrap_or(Value::Null);
                let settings: HashMap<String, BookSettings> = serde_json::from_value(settings)
                    .map_err(|e| TermError::MalformedDocument(format!("`settings`: {}", e)))?;

                let terms = obj.remove("terms").unwrap_or(Value::Null);
                let terms: HashMap<String, Vec<Value>> = serde_json::from_value(terms)
                    .map_err(|e| TermError::MalformedDocument(format!("`terms`: {}", e)))?;

                Ok(RuleDocument::Structured {
                    format_version,
                    settings,
                    terms,
                })
            }
            other => Err(TermError::MalformedDocument(format!(
                "top level must be an array or an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, RuleDocument::Structured { .. })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn required_string(obj: &Map<String, Value>, index: usize, field: &'static str) -> TermResult<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(wrong_type(index, field, "a string", other)),
        None => Err(missing(index, field)),
    }
}

fn required_bool(obj: &Map<String, Value>, index: usize, field: &'static str) -> TermResult<bool> {
    match obj.get(field) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(wrong_type(index, field, "a boolean", other)),
        None => Err(missing(index, field)),
    }
}

fn optional_string(obj: &Map<String, Value>, index: usize, field: &'static str) -> TermResult<Option<String>> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(wrong_type(index, field, "a string", other)),
        None => Ok(None),
    }
}

fn optional_bool(obj: &Map<String, Value>, index: usize, field: &'static str) -> TermResult<Option<bool>> {
    match obj.get(field) {
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(wrong_type(index, field, "a boolean", other)),
        None => Ok(None),
    }
}

fn missing(index: usize, field: &'static str) -> TermError {
    TermError::InvalidRule {
        index,
        field,
        reason: "is required".to_string(),
    }
}

fn wrong_type(index: usize, field: &'static str, expected: &str, got: &Value) -> TermError {
    TermError::InvalidRule {
        index,
        field,
        reason: format!("must be {}, got {}", expected, json_type_name(got)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_from_value_defaults_whole_word() {
        let value = json!({"original": "Jon", "replacement": "John", "caseSensitive": true, "isRegex": false});
        let rule = Rule::from_value(0, &value).unwrap();
        assert_eq!(rule, Rule::literal("Jon", "John"));
        assert!(!rule.whole_word);
    }

    #[test]
    fn test_rule_from_value_names_bad_field() {
        let value = json!({"original": "Jon", "replacement": "John", "caseSensitive": "yes", "isRegex": false});
        match Rule::from_value(3, &value) {
            Err(TermError::InvalidRule { index, field, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(field, "caseSensitive");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rule_from_value_missing_replacement() {
        let value = json!({"original": "Jon", "caseSensitive": true, "isRegex": false});
        let err = Rule::from_value(0, &value).unwrap_err();
        assert!(matches!(err, TermError::InvalidRule { field: "replacement", .. }));
    }

    #[test]
    fn test_rule_from_value_rejects_non_object() {
        let err = Rule::from_value(1, &json!("Jon")).unwrap_err();
        assert!(matches!(err, TermError::InvalidRule { index: 1, field: "<rule>", .. }));
    }

    #[test]
    fn test_parse_detects_shape() {
        let flat = RuleDocument::parse(br#"[]"#).unwrap();
        assert!(!flat.is_structured());

        let structured = RuleDocument::parse(
            br#"{"formatVersion":"1.0","settings":{"a":{"isDisabled":true,"note":"x"}},"terms":{"a":[]}}"#,
        )
        .unwrap();
        match structured {
            RuleDocument::Structured { format_version, settings, terms } => {
                assert_eq!(format_version, "1.0");
                assert!(settings["a"].is_disabled);
                assert_eq!(settings["a"].extra.get("note"), Some(&json!("x")));
                assert!(terms["a"].is_empty());
            }
            RuleDocument::Flat(_) => panic!("expected structured document"),
        }
    }

    #[test]
    fn test_parse_missing_structure() {
        let err = RuleDocument::parse(br#"{"formatVersion":"1.0","terms":{}}"#).unwrap_err();
        assert!(matches!(err, TermError::MissingStructure("settings")));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            RuleDocument::parse(b"{not json"),
            Err(TermError::MalformedDocument(_))
        ));
        assert!(matches!(
            RuleDocument::parse(b"42"),
            Err(TermError::MalformedDocument(_))
        ));
    }
}
