//! 注入给业务模块的日志设施（内置依赖 `$L`）
//!
//! 日志最终通过 `tracing` 输出；本模块只负责级别过滤与命名日志器。

use crate::errors::{ApplicationError, ApplicationResult};
use parking_lot::RwLock;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 日志级别，从低到高排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// 输出全部日志
    All,
    Trace,
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
    /// 关闭日志
    Off,
}

impl LogLevel {
    /// 级别名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Trace => "trace",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Off => "none",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "trace" => Ok(Self::Trace),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            "none" | "off" => Ok(Self::Off),
            other => Err(ApplicationError::illegal_value(format!(
                "未知的日志级别: {other}"
            ))),
        }
    }
}

/// 分级日志器
///
/// 通过 [`Logger::get_logger`] 派生的命名日志器与根日志器共享级别阈值。
#[derive(Clone)]
pub struct Logger {
    name: Option<Arc<str>>,
    threshold: Arc<RwLock<LogLevel>>,
}

impl Logger {
    /// 创建根日志器
    pub fn new(level: LogLevel) -> Self {
        Self {
            name: None,
            threshold: Arc::new(RwLock::new(level)),
        }
    }

    /// 派生命名日志器
    pub fn get_logger(&self, name: impl Into<String>) -> Self {
        Self {
            name: Some(Arc::from(name.into())),
            threshold: self.threshold.clone(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn level(&self) -> LogLevel {
        *self.threshold.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.threshold.write() = level;
    }

    /// 按名称设置级别，未知名称返回 IllegalValue
    pub fn set_level_named(&self, level: &str) -> ApplicationResult<()> {
        self.set_level(level.parse()?);
        Ok(())
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::All && level != LogLevel::Off && level >= self.level()
    }

    /// 按级别输出，返回是否实际输出
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) -> bool {
        if !self.enabled(level) {
            return false;
        }
        let logger = self.name.as_deref().unwrap_or("app");
        match level {
            LogLevel::Trace | LogLevel::Verbose => {
                tracing::trace!(logger = logger, severity = %level, "{message}")
            }
            LogLevel::Debug => tracing::debug!(logger = logger, "{message}"),
            LogLevel::Info => tracing::info!(logger = logger, "{message}"),
            LogLevel::Warn => tracing::warn!(logger = logger, "{message}"),
            LogLevel::Error | LogLevel::Critical => {
                tracing::error!(logger = logger, severity = %level, "{message}")
            }
            LogLevel::All | LogLevel::Off => return false,
        }
        true
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(LogLevel::Trace, message);
    }

    pub fn verbose(&self, message: impl fmt::Display) {
        self.log(LogLevel::Verbose, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl fmt::Display) {
        self.log(LogLevel::Critical, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .finish()
    }
}
