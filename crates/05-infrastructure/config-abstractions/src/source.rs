//! 参数来源抽象接口

use serde_json::Value;
use std::collections::BTreeMap;
use trellis_common::ConfigResult;

/// 参数来源 trait
///
/// 返回的键即参数名，例如 `log level`。
pub trait ParameterSource: Send + Sync {
    /// 来源名称，用于日志
    fn name(&self) -> &str;

    /// 读取全部参数
    fn load(&self) -> ConfigResult<BTreeMap<String, Value>>;
}

