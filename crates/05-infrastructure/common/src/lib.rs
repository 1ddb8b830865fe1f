//! # Trellis Common
//!
//! 这个 crate 提供了依赖注入容器与生命周期编排共用的基础类型。
//!
//! ## 核心组件
//!
//! - [`ApplicationError`] - 统一的错误分类
//! - [`Logger`] - 分级日志设施，支持命名日志器
//! - [`Parameters`] - 应用参数注册与校验
//! - [`EventBus`] / [`readiness`] - 生命周期事件与模块就绪信号
//! - [`WebApplication`] / [`KvStore`] / [`Database`] - 外部协作者接口

pub mod component;
pub mod errors;
pub mod hosting;
pub mod lifecycle;
pub mod logging;
pub mod parameters;
pub mod storage;

pub use component::*;
pub use errors::*;
pub use hosting::*;
pub use lifecycle::*;
pub use logging::*;
pub use parameters::*;
pub use storage::*;
