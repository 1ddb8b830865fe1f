//! 应用构建器

use crate::application::Application;
use crate::builtins::Services;
use config_abstractions::ParameterSource;
use config_impl::LayeredParameterSource;
use di_abstractions::{ContainerConfig, Definition, DefinitionLoader, LibraryProvider, ScanOptions};
use di_impl::{DefinitionCatalog, DirectoryScanner, LibraryCatalog, ManifestLoader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use trellis_common::{
    ApplicationError, ApplicationResult, DatabaseProvider, KvStore, LogLevel, MemoryKvStore,
};

/// 应用构建器
///
/// 使用建造者模式组装容器配置、协作者与参数来源
pub struct ApplicationBuilder {
    /// 容器配置
    container: ContainerConfig,
    /// 日志配置，`None` 表示不初始化全局订阅器
    logging: Option<LoggingConfig>,
    /// 根日志器的初始级别
    log_level: LogLevel,
    kv_store: Option<Arc<dyn KvStore>>,
    databases: Vec<Arc<dyn DatabaseProvider>>,
    libraries: LibraryCatalog,
    /// 自定义的定义加载器，缺省使用清单加载器
    loader: Option<Arc<dyn DefinitionLoader>>,
    /// 清单可引用的定义
    catalog: DefinitionCatalog,
    scan_options: ScanOptions,
    parameter_sources: Vec<Box<dyn ParameterSource>>,
}

impl ApplicationBuilder {
    /// 创建新的应用构建器
    pub fn new() -> Self {
        Self {
            container: ContainerConfig::default(),
            logging: None,
            log_level: LogLevel::Debug,
            kv_store: None,
            databases: Vec::new(),
            libraries: LibraryCatalog::new(),
            loader: None,
            catalog: DefinitionCatalog::new(),
            scan_options: ScanOptions::default(),
            parameter_sources: Vec::new(),
        }
    }

    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container = config;
        self
    }

    /// 设置模块就绪等待上限
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.container = self.container.with_ready_timeout(timeout);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// 替换共享键值存储，缺省为进程内存储
    pub fn with_kv_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.kv_store = Some(store);
        self
    }

    /// 添加数据库提供者
    pub fn with_database(mut self, provider: Arc<dyn DatabaseProvider>) -> Self {
        self.databases.push(provider);
        self
    }

    /// 登记外部库
    pub fn with_library<P>(mut self, name: impl Into<String>, provider: P) -> ApplicationResult<Self>
    where
        P: LibraryProvider + 'static,
    {
        self.libraries.provide(name, provider)?;
        Ok(self)
    }

    /// 登记可被定义清单引用的定义
    pub fn with_definition(
        mut self,
        name: impl Into<String>,
        definition: Definition,
    ) -> ApplicationResult<Self> {
        self.catalog.insert(name, definition)?;
        Ok(self)
    }

    /// 使用自定义的定义加载器扫描目录
    pub fn with_definition_loader(mut self, loader: Arc<dyn DefinitionLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    /// 添加参数来源，按添加顺序加载，后加载的值覆盖先加载的值
    pub fn with_parameter_source<S: ParameterSource + 'static>(mut self, source: S) -> Self {
        self.parameter_sources.push(Box::new(source));
        self
    }

    /// 添加 TOML 参数文件
    pub fn with_parameter_file<P: AsRef<Path>>(self, path: P) -> ApplicationResult<Self> {
        let path = path.as_ref();
        let source = LayeredParameterSource::new(path.display().to_string()).add_toml(path)?;
        info!("添加参数文件: {}", path.display());
        Ok(self.with_parameter_source(source))
    }

    /// 从带前缀的环境变量读取参数
    pub fn with_env_parameters(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let source = LayeredParameterSource::new(format!("env:{prefix}")).add_env(prefix);
        self.with_parameter_source(source)
    }

    /// 构建应用实例
    pub fn build(self) -> ApplicationResult<Application> {
        info!("开始构建应用");

        // 只有在明确配置了日志时才初始化全局订阅器，避免测试中重复初始化
        if let Some(logging) = &self.logging {
            initialize_logging(logging)?;
        }

        let loader: Arc<dyn DefinitionLoader> = match self.loader {
            Some(loader) => loader,
            None => Arc::new(ManifestLoader::new(Arc::new(self.catalog))),
        };
        let scanner = DirectoryScanner::new(loader).with_options(self.scan_options);
        let services = Services::new(
            self.log_level,
            self.kv_store
                .unwrap_or_else(|| Arc::new(MemoryKvStore::new()) as Arc<dyn KvStore>),
            self.databases,
        );

        let mut application = Application::from_parts(
            self.container,
            scanner,
            services,
            self.libraries,
        );
        for source in &self.parameter_sources {
            debug!("加载参数来源: {}", source.name());
            application.load_parameters(source.as_ref())?;
        }

        info!("应用构建完成");
        Ok(application)
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先使用其过滤规则
pub fn initialize_logging(config: &LoggingConfig) -> ApplicationResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| ApplicationError::lifecycle(format!("日志初始化失败: {e}")))?;

    info!("日志系统初始化完成");
    Ok(())
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::ErrorKind;

    #[test]
    fn test_logging_presets() {
        let dev = LoggingConfig::development();
        assert_eq!(dev.level, tracing::Level::DEBUG);
        assert!(!dev.json_format);

        let prod = LoggingConfig::production();
        assert_eq!(prod.level, tracing::Level::INFO);
        assert!(prod.json_format);
    }

    #[test]
    fn test_builder_applies_log_level_and_rejects_duplicate_library() {
        let app = ApplicationBuilder::new()
            .with_log_level(LogLevel::Warn)
            .build()
            .unwrap();
        assert_eq!(app.logger().level(), LogLevel::Warn);

        let err = ApplicationBuilder::new()
            .with_library("lib", |_: &str| Ok(Arc::new(1u8) as trellis_common::Instance))
            .unwrap()
            .with_library("lib", |_: &str| Ok(Arc::new(2u8) as trellis_common::Instance))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::DuplicateEntry);
    }
}
