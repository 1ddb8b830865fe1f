//! 错误类型定义

use std::fmt;
use thiserror::Error;

/// 装箱的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用结果类型
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {message}")]
    ParseError { message: String },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },
}

/// 应用错误类型
///
/// 声明、注册、解析与启动编排共用同一套错误分类。
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("非法值: {message}")]
    IllegalValue { message: String },

    #[error("未找到: {message}")]
    NotFound { message: String },

    #[error("重复注册: {kind} '{key}'")]
    DuplicateEntry { kind: String, key: String },

    #[error("检测到循环依赖: {chain}")]
    CircularDependency { chain: String },

    #[error("等待超时: {message}")]
    Timeout { message: String },

    #[error("组件创建失败: {name}, 原因: {source}")]
    ComponentCreationFailed { name: String, source: BoxError },

    #[error("生命周期错误: {message}")]
    Lifecycle { message: String },

    #[error("配置错误: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IllegalValue,
    NotFound,
    DuplicateEntry,
    CircularDependency,
    Timeout,
    ComponentCreationFailed,
    Lifecycle,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IllegalValue => "IllegalValue",
            Self::NotFound => "NotFound",
            Self::DuplicateEntry => "DuplicateEntry",
            Self::CircularDependency => "CircularDependency",
            Self::Timeout => "Timeout",
            Self::ComponentCreationFailed => "ComponentCreationFailed",
            Self::Lifecycle => "Lifecycle",
            Self::Config => "Config",
        };
        f.write_str(name)
    }
}

impl ApplicationError {
    /// 创建非法值错误
    pub fn illegal_value(message: impl Into<String>) -> Self {
        Self::IllegalValue {
            message: message.into(),
        }
    }

    /// 创建未找到错误
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// 创建重复注册错误
    pub fn duplicate_entry(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateEntry {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// 创建超时错误
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// 创建生命周期错误
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// 创建组件创建失败错误
    pub fn creation_failed(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ComponentCreationFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IllegalValue { .. } => ErrorKind::IllegalValue,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateEntry { .. } => ErrorKind::DuplicateEntry,
            Self::CircularDependency { .. } => ErrorKind::CircularDependency,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ComponentCreationFailed { .. } => ErrorKind::ComponentCreationFailed,
            Self::Lifecycle { .. } => ErrorKind::Lifecycle,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// 是否属于给定分类
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }
}

/// 注入给业务模块的错误构造器（内置依赖 `$E`）
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorKinds;

impl ErrorKinds {
    pub fn illegal_value(&self, message: impl Into<String>) -> ApplicationError {
        ApplicationError::illegal_value(message)
    }

    pub fn not_found(&self, message: impl Into<String>) -> ApplicationError {
        ApplicationError::not_found(message)
    }

    pub fn duplicate_entry(
        &self,
        kind: impl Into<String>,
        key: impl Into<String>,
    ) -> ApplicationError {
        ApplicationError::duplicate_entry(kind, key)
    }

    pub fn timeout(&self, message: impl Into<String>) -> ApplicationError {
        ApplicationError::timeout(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err = ApplicationError::duplicate_entry("module", "users");
        assert_eq!(err.kind(), ErrorKind::DuplicateEntry);
        assert_eq!(err.to_string(), "重复注册: module 'users'");

        let err: ApplicationError = ConfigError::KeyNotFound {
            key: "port".to_string(),
        }
        .into();
        assert!(err.is(ErrorKind::Config));
    }

    #[test]
    fn test_error_kinds_builtin() {
        let kinds = ErrorKinds;
        assert!(kinds.not_found("x").is(ErrorKind::NotFound));
        assert!(kinds.illegal_value("x").is(ErrorKind::IllegalValue));
    }

    #[test]
    fn test_creation_failed_keeps_source() {
        let err = ApplicationError::creation_failed("db", "连接被拒绝");
        assert!(err.to_string().contains("连接被拒绝"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
