//! 内存参数来源

use config_abstractions::ParameterSource;
use serde_json::Value;
use std::collections::BTreeMap;
use trellis_common::ConfigResult;

/// 内存参数来源
#[derive(Debug, Clone, Default)]
pub struct MemoryParameterSource {
    values: BTreeMap<String, Value>,
}

impl MemoryParameterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ParameterSource for MemoryParameterSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> ConfigResult<BTreeMap<String, Value>> {
        Ok(self.values.clone())
    }
}
