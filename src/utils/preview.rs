//! 日志预览：章节正文折叠为单行并截断，避免整章写进日志

use std::fmt::{self, Write};

/// 文本的单行预览，格式化时才逐字符输出，不复制原文
///
/// 连续空白折叠为一个空格，首尾空白不输出；超出 `limit` 个字符且后面仍有
/// 可见内容时以 `…` 结尾。
#[derive(Debug, Clone, Copy)]
pub struct Preview<'a> {
    text: &'a str,
    limit: usize,
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = 0;
        let mut gap = false;

        for ch in self.text.chars() {
            if ch.is_whitespace() {
                gap = written > 0;
                continue;
            }

            let needed = if gap { 2 } else { 1 };
            if written + needed > self.limit {
                return f.write_char('…');
            }
            if gap {
                f.write_char(' ')?;
                gap = false;
            }
            f.write_char(ch)?;
            written += needed;
        }
        Ok(())
    }
}

/// 最多 `max_len` 个字符的单行预览
pub fn preview_compact(s: &str, max_len: usize) -> Preview<'_> {
    Preview { text: s, limit: max_len }
}
