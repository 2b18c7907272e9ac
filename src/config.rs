//! 全局配置管理,存储引擎外围的可配置项
//! 改写核心本身不读取任何配置，仅由 TermEngine::new 和批量改写使用

use std::path::PathBuf;

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 规则文档路径
    pub rule_path: PathBuf,
    // 目标文件名（用于推导 book-key），为空时退回规则文件名
    pub target_name: Option<String>,
    // 批量改写时是否并行处理章节
    pub parallel: bool,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            rule_path: PathBuf::from("terms.json"),
            target_name: None,
            parallel: true,
            verbose: false,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn rule_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rule_path = path.into();
        self
    }

    pub fn target_name(mut self, name: impl Into<String>) -> Self {
        self.config.target_name = Some(name.into());
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
