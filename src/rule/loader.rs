//! 规则加载管理器
//! 负责解析规则文档、定位 book-key 对应的规则子集并逐条校验

use std::path::Path;
use tracing::debug;

use super::book_key;
use super::model::{Rule, RuleDocument};
use crate::error::{TermError, TermResult};

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 从文档字节加载规则（结构化格式时用目标文件名推导 book-key）
    pub fn load_rules(bytes: &[u8], target_name: Option<&str>) -> TermResult<Vec<Rule>> {
        Self::load_rules_named(bytes, target_name, None)
    }

    /// 同 load_rules，额外提供规则文档自身的文件名作为 book-key 后备来源
    pub fn load_rules_named(
        bytes: &[u8],
        target_name: Option<&str>,
        document_name: Option<&str>,
    ) -> TermResult<Vec<Rule>> {
        let document = RuleDocument::parse(bytes)?;

        let raw_rules = match document {
            RuleDocument::Flat(items) => {
                debug!("识别为扁平规则文档，规则数：{}", items.len());
                items
            }
            RuleDocument::Structured {
                format_version,
                settings,
                mut terms,
            } => {
                let key = book_key::resolve(target_name, document_name)?;
                debug!("识别为结构化规则文档 v{}，book-key：{}", format_version, key);

                if settings.get(&key).is_some_and(|s| s.is_disabled) {
                    return Err(TermError::BookDisabled(key));
                }
                terms
                    .remove(&key)
                    .ok_or(TermError::UnresolvableBookKey(key))?
            }
        };

        // 任意一条不合法即整体失败，不返回部分规则
        let rules = raw_rules
            .iter()
            .enumerate()
            .map(|(index, value)| Rule::from_value(index, value))
            .collect::<TermResult<Vec<_>>>()?;

        debug!("规则校验完成，有效规则数：{}", rules.len());
        Ok(rules)
    }

    /// 从本地文件加载规则
    pub async fn load_file(path: impl AsRef<Path>, target_name: Option<&str>) -> TermResult<Vec<Rule>> {
        let path = path.as_ref();
        Self::validate_rule_path(path)?;

        let bytes = tokio::fs::read(path).await?;
        let document_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Self::load_rules_named(&bytes, target_name, document_name.as_deref())
    }

    /// 读取前的路径校验：文件必须存在且为 .json
    fn validate_rule_path(path: &Path) -> TermResult<()> {
        if !path.exists() {
            return Err(TermError::InvalidInput(format!(
                "rule file does not exist: {}",
                path.display()
            )));
        }
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(TermError::InvalidInput(format!(
                "rule file must be a JSON file (.json): {}",
                path.display()
            )));
        }
        Ok(())
    }
}
