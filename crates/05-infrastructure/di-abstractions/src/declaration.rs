//! 依赖声明的参数与存储槽

use serde_json::Value;

/// 一次依赖声明中的单个参数
///
/// 声明入口接受任意 JSON 值，只有非空字符串才是合法的依赖名。
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyArg(Value);

impl DependencyArg {
    /// 合法的依赖名
    pub fn as_name(&self) -> Option<&str> {
        self.0.as_str().filter(|name| !name.is_empty())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for DependencyArg {
    fn from(name: &str) -> Self {
        Self(Value::String(name.to_string()))
    }
}

impl From<String> for DependencyArg {
    fn from(name: String) -> Self {
        Self(Value::String(name))
    }
}

impl From<&String> for DependencyArg {
    fn from(name: &String) -> Self {
        Self(Value::String(name.clone()))
    }
}

impl From<Value> for DependencyArg {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// 定义的依赖槽
#[derive(Debug, Clone, PartialEq)]
pub enum DependencySlot {
    /// 已声明的依赖名，按声明顺序排列
    Declared(Vec<String>),
    /// 被非列表值占用
    Foreign(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_non_empty_strings_are_names() {
        assert_eq!(DependencyArg::from("db").as_name(), Some("db"));
        assert_eq!(DependencyArg::from("").as_name(), None);
        assert_eq!(DependencyArg::from(json!(42)).as_name(), None);
        assert_eq!(DependencyArg::from(json!(["a"])).as_name(), None);
    }
}
