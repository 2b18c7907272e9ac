//! 偏移安全改写：按起点从后往前拼接替换文本
//! 后部的编辑不会移动前部区间的偏移，因此尚未应用的匹配始终有效

use super::resolver::ResolvedMatchSet;
use crate::error::{TermError, TermResult};

/// 改写器
pub struct Rewriter;

impl Rewriter {
    pub fn apply(text: &str, resolved: &ResolvedMatchSet<'_>) -> TermResult<String> {
        let mut ordered: Vec<_> = resolved.matches().iter().collect();
        ordered.sort_by(|a, b| b.start.cmp(&a.start));

        let grown: usize = ordered.iter().map(|m| m.replacement.len()).sum();
        let mut output = String::with_capacity(text.len() + grown);
        output.push_str(text);

        let mut upper_bound = text.len();
        for m in ordered {
            if m.start >= m.end || m.end > upper_bound {
                return Err(TermError::RewriteError(format!(
                    "match [{}, {}) is empty, out of range or overlaps a later match",
                    m.start, m.end
                )));
            }
            if !text.is_char_boundary(m.start) || !text.is_char_boundary(m.end) {
                return Err(TermError::RewriteError(format!(
                    "match [{}, {}) does not fall on character boundaries",
                    m.start, m.end
                )));
            }
            output.replace_range(m.start..m.end, &m.replacement);
            upper_bound = m.start;
        }

        Ok(output)
    }
}
