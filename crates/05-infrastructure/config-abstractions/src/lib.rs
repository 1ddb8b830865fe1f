//! # Configuration Abstractions
//!
//! 参数来源抽象层。应用启动前从参数来源批量读取参数值。
//!
//! ## 核心接口
//!
//! - [`ParameterSource`] - 参数来源接口

pub mod source;

pub use source::*;
