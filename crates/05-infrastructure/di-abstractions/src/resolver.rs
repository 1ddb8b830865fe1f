//! 依赖解析器抽象接口
//!
//! 提供按名称解析依赖和实例化注册项的能力

use crate::definition::Instantiated;
use crate::registry::Registration;
use async_trait::async_trait;
use trellis_common::{ApplicationError, ApplicationResult, Instance};

/// 依赖解析器 trait
#[async_trait]
pub trait DependencyResolver: Send {
    /// 按名称解析依赖
    async fn resolve(&mut self, name: &str) -> ApplicationResult<Instance>;

    /// 解析注册项的依赖列表并构造它
    async fn instantiate(&mut self, registration: &Registration) -> ApplicationResult<Instantiated>;
}

/// 解析路径
///
/// 一次顶层解析中正在构造的模块名，按进入顺序排列，用于检测循环依赖。
#[derive(Debug, Clone)]
pub struct ResolutionPath {
    chain: Vec<String>,
    max_depth: usize,
}

impl ResolutionPath {
    pub fn new(max_depth: usize) -> Self {
        Self {
            chain: Vec::new(),
            max_depth,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chain.iter().any(|entry| entry == name)
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// 进入模块
    pub fn push(&mut self, name: &str) -> ApplicationResult<()> {
        if self.contains(name) {
            return Err(self.cycle_error(name));
        }
        if self.chain.len() >= self.max_depth {
            return Err(ApplicationError::illegal_value(format!(
                "解析深度超过上限 {}: {}",
                self.max_depth,
                self.describe(name)
            )));
        }
        self.chain.push(name.to_string());
        Ok(())
    }

    /// 离开模块
    pub fn pop(&mut self) -> Option<String> {
        self.chain.pop()
    }

    /// 以 `name` 结尾的循环依赖错误
    pub fn cycle_error(&self, name: &str) -> ApplicationError {
        ApplicationError::CircularDependency {
            chain: self.describe(name),
        }
    }

    fn describe(&self, closing: &str) -> String {
        let mut parts: Vec<&str> = self.chain.iter().map(String::as_str).collect();
        parts.push(closing);
        parts.join(" -> ")
    }
}

impl Default for ResolutionPath {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::ErrorKind;

    #[test]
    fn test_cycle_reports_chain() {
        let mut path = ResolutionPath::default();
        path.push("a").unwrap();
        path.push("b").unwrap();

        let err = path.push("a").unwrap_err();
        match err {
            ApplicationError::CircularDependency { chain } => assert_eq!(chain, "a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(path.depth(), 2);

        assert_eq!(path.pop().as_deref(), Some("b"));
        path.push("c").unwrap();
        assert!(!path.contains("b"));
    }

    #[test]
    fn test_depth_limit() {
        let mut path = ResolutionPath::new(2);
        path.push("a").unwrap();
        path.push("b").unwrap();
        assert_eq!(path.push("c").unwrap_err().kind(), ErrorKind::IllegalValue);
    }
}
