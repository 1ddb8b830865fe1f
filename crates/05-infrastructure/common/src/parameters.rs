//! 应用参数
//!
//! 参数必须先注册再赋值；必填参数在完整启动前统一校验。

use crate::errors::{ApplicationError, ApplicationResult};
use crate::logging::LogLevel;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 内置参数：启动时应用到日志器的级别
pub const LOG_LEVEL_PARAMETER: &str = "log level";

#[derive(Debug, Clone)]
struct ParameterSpec {
    required: bool,
    default: Option<Value>,
}

/// 参数表
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    known: BTreeMap<String, ParameterSpec>,
    values: HashMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先登记可选的 `log level` 参数
    pub fn with_log_level(default: LogLevel) -> Self {
        let mut parameters = Self::default();
        parameters.known.insert(
            LOG_LEVEL_PARAMETER.to_string(),
            ParameterSpec {
                required: false,
                default: Some(Value::String(default.as_str().to_string())),
            },
        );
        parameters
    }

    /// 注册参数，重复注册会更新必填标记
    pub fn register(&mut self, name: impl Into<String>, required: bool) -> ApplicationResult<()> {
        self.register_with_default(name, required, None)
    }

    /// 注册带默认值的参数
    pub fn register_with_default(
        &mut self,
        name: impl Into<String>,
        required: bool,
        default: Option<Value>,
    ) -> ApplicationResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApplicationError::illegal_value("参数名不能为空"));
        }
        self.known.insert(name, ParameterSpec { required, default });
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.known.contains_key(name)
    }

    /// 设置参数值，未注册的参数返回 NotFound
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> ApplicationResult<()> {
        if !self.known.contains_key(name) {
            return Err(ApplicationError::not_found(format!("未注册的参数: {name}")));
        }
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    /// 读取参数
    ///
    /// 未注册或必填但未设置时返回 NotFound；可选且未设置时返回默认值。
    pub fn get(&self, name: &str) -> ApplicationResult<Option<Value>> {
        let spec = self
            .known
            .get(name)
            .ok_or_else(|| ApplicationError::not_found(format!("未注册的参数: {name}")))?;
        match self.values.get(name) {
            Some(value) => Ok(Some(value.clone())),
            None if spec.required && spec.default.is_none() => Err(ApplicationError::not_found(
                format!("必填参数未设置: {name}"),
            )),
            None => Ok(spec.default.clone()),
        }
    }

    /// 读取并转换参数
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> ApplicationResult<Option<T>> {
        self.get(name)?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    ApplicationError::illegal_value(format!("参数 '{name}' 类型不匹配: {e}"))
                })
            })
            .transpose()
    }

    /// 尚未设置的必填参数
    pub fn missing_required(&self) -> Vec<String> {
        self.known
            .iter()
            .filter(|(name, spec)| {
                spec.required && spec.default.is_none() && !self.values.contains_key(*name)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// 校验必填参数
    pub fn validate(&self) -> ApplicationResult<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApplicationError::not_found(format!(
                "必填参数未设置: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.known.keys().map(String::as_str)
    }
}

/// 注入给业务模块的只读参数访问器（内置依赖 `$Params`）
#[derive(Debug, Clone)]
pub struct ParameterAccessor {
    inner: Arc<RwLock<Parameters>>,
}

impl ParameterAccessor {
    pub fn new(inner: Arc<RwLock<Parameters>>) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> ApplicationResult<Option<Value>> {
        self.inner.read().get(name)
    }

    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> ApplicationResult<Option<T>> {
        self.inner.read().get_as(name)
    }
}
