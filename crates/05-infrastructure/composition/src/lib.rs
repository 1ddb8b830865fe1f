//! # 应用组合层
//!
//! 这个 crate 把依赖声明、注册表、注入器与参数、日志等框架服务组合成一个
//! 显式的应用上下文，并负责测试模式与完整启动两种编排序列。
//!
//! ## 主要功能
//!
//! - **应用上下文**: 声明依赖、注册构件、扫描目录
//! - **应用构建器**: 组装容器配置、协作者与参数来源
//! - **内置依赖**: `$L`、`$E`、`$Params`、`$KV`、`$DB`、`$Broadcast`
//! - **启动编排**: 按模块、资源、路由的顺序实例化并挂载
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use trellis_composition::Application;
//! use di_abstractions::Definition;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = Application::new();
//!
//!     let config = Definition::module("config", |_| Ok(8080u16));
//!     let server = Definition::module("server", |deps| {
//!         let port = deps.get::<u16>(0)?;
//!         Ok(format!("0.0.0.0:{port}"))
//!     });
//!     app.inject(&server, ["config"])?;
//!     app.module("config", config)?.module("server", server)?;
//!
//!     app.test().await?;
//!     let address = app.resolve::<String>("server").await?;
//!     println!("监听地址: {}", address);
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod builder;
pub mod builtins;
pub mod orchestrator;

#[cfg(test)]
mod tests;

pub use application::Application;
pub use builder::{initialize_logging, ApplicationBuilder, LoggingConfig};

// 重新导出错误类型
pub use trellis_common::{ApplicationError, ApplicationResult};
