//! 注册类别与注册项

use crate::definition::{Definition, Shape};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use trellis_common::ApplicationError;

/// 注册类别，每个类别拥有独立的命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationKind {
    Module,
    Resource,
    Route,
    Room,
}

impl RegistrationKind {
    /// 全部类别，按完整启动时的实例化顺序排列
    pub const ALL: [Self; 4] = [Self::Module, Self::Resource, Self::Route, Self::Room];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Resource => "resource",
            Self::Route => "route",
            Self::Room => "room",
        }
    }

    /// 该类别是否接受给定的构造形态
    pub fn accepts(&self, shape: &Shape) -> bool {
        matches!(
            (self, shape),
            (Self::Module, Shape::Module(_))
                | (Self::Resource, Shape::Resource(_))
                | (Self::Route, Shape::Routes(_))
                | (Self::Room, Shape::Room(_))
        )
    }
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationKind {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(Self::Module),
            "resource" => Ok(Self::Resource),
            "route" | "routes" => Ok(Self::Route),
            "room" => Ok(Self::Room),
            other => Err(ApplicationError::illegal_value(format!(
                "未知的注册类别: {other}"
            ))),
        }
    }
}

/// 注册项：尚未执行的延迟工厂
///
/// 依赖列表在注册时取快照，此后不可变。
#[derive(Debug, Clone)]
pub struct Registration {
    key: String,
    kind: RegistrationKind,
    definition: Definition,
    dependencies: Arc<[String]>,
}

impl Registration {
    pub fn new(
        kind: RegistrationKind,
        key: impl Into<String>,
        definition: Definition,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            definition,
            dependencies: dependencies.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// 按名称查找模块注册项
pub trait ModuleLookup: Send + Sync {
    fn module(&self, name: &str) -> Option<&Registration>;
}
