//! 工具模块
pub mod preview;

pub use self::preview::{preview_compact, Preview};
