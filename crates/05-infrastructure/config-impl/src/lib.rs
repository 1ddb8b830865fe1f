//! # Configuration Implementation
//!
//! 参数来源的具体实现。
//!
//! ## 主要组件
//!
//! - [`LayeredParameterSource`] - 基于 `config` crate 的分层来源（TOML、JSON、环境变量）
//! - [`MemoryParameterSource`] - 内存来源，主要用于测试

pub mod layered;
pub mod memory;

pub use layered::*;
pub use memory::*;
