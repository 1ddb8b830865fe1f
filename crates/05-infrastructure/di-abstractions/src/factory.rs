//! 外部库提供者
//!
//! 既不是内置依赖也不是已注册模块的名称，最后会尝试作为外部库加载。

use trellis_common::{ApplicationResult, Instance};

/// 外部库提供者 trait
pub trait LibraryProvider: Send + Sync {
    /// 加载库实例
    fn load(&self, name: &str) -> ApplicationResult<Instance>;
}

impl<F> LibraryProvider for F
where
    F: Fn(&str) -> ApplicationResult<Instance> + Send + Sync,
{
    fn load(&self, name: &str) -> ApplicationResult<Instance> {
        self(name)
    }
}
