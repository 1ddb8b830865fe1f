//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义定义、注册项和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`Definition`] - 可构造的构件及其构造形态
//! - [`Registration`] - 按类别注册的延迟工厂
//! - [`DependencyResolver`] - 依赖解析器接口
//! - [`DefinitionLoader`] - 目录扫描使用的定义加载器
//! - [`LibraryProvider`] - 外部库提供者

pub mod container;
pub mod declaration;
pub mod definition;
pub mod factory;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use container::*;
pub use declaration::*;
pub use definition::*;
pub use factory::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
