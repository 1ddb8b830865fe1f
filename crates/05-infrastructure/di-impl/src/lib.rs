//! # 依赖注入具体实现
//!
//! 提供依赖声明表、注册表、目录扫描器、外部库目录和注入器的具体实现

pub mod declarations;
pub mod injector;
pub mod library;
pub mod registry;
pub mod scanner;

pub use declarations::Declarations;
pub use injector::Injector;
pub use library::LibraryCatalog;
pub use registry::Registry;
pub use scanner::{
    DefinitionCatalog, DirectoryScanner, DiscoveredFile, ManifestLoader, ScannedDefinition,
};
