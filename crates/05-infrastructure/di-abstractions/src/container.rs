//! 容器配置与统计

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 内置依赖名的保留前缀
pub const BUILTIN_PREFIX: char = '$';

/// 名称是否位于内置命名空间
pub fn is_builtin_name(name: &str) -> bool {
    name.starts_with(BUILTIN_PREFIX)
}

/// 容器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 等待模块就绪的超时时间（毫秒）
    pub ready_timeout_ms: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 100,
            ready_timeout_ms: 5000,
        }
    }
}

impl ContainerConfig {
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 已构造的模块数量
    pub constructed_modules: usize,
    /// 单例缓存命中次数
    pub cache_hits: usize,
    /// 内置依赖解析次数
    pub builtin_hits: usize,
    /// 外部库解析次数
    pub library_loads: usize,
    /// 已实例化的顶层构件数量
    pub instantiated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_timeout_round_trip() {
        let config = ContainerConfig::default().with_ready_timeout(Duration::from_millis(250));
        assert_eq!(config.ready_timeout(), Duration::from_millis(250));
        assert!(is_builtin_name("$L"));
        assert!(!is_builtin_name("users"));
    }
}
