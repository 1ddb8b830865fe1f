//! 定义加载器抽象接口
//!
//! 目录扫描发现的文件交给加载器转换为定义

use crate::definition::Definition;
use serde_json::Value;
use std::path::Path;
use trellis_common::ApplicationResult;

/// 从文件加载出的定义
#[derive(Debug, Clone)]
pub struct LoadedDefinition {
    pub definition: Definition,
    /// 文件中声明的依赖，可能是任意 JSON 值
    pub inject: Option<Value>,
}

impl LoadedDefinition {
    pub fn new(definition: Definition) -> Self {
        Self {
            definition,
            inject: None,
        }
    }

    pub fn with_inject(mut self, inject: Value) -> Self {
        self.inject = Some(inject);
        self
    }
}

/// 定义加载器 trait
pub trait DefinitionLoader: Send + Sync {
    /// 加载器名称
    fn name(&self) -> &str;

    /// 可识别的文件扩展名（不含点）
    fn extensions(&self) -> &[&str];

    /// 加载单个文件
    fn load(&self, path: &Path) -> ApplicationResult<LoadedDefinition>;

    /// 是否可以加载该文件
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                self.extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(extension))
            })
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 是否包含以 `.` 开头的文件和目录
    pub include_hidden: bool,
    /// 是否跟随符号链接
    pub follow_links: bool,
    /// 最大递归深度，`None` 表示不限制
    pub max_depth: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            follow_links: false,
            max_depth: None,
        }
    }
}
