//! 应用上下文
//!
//! 每个 [`Application`] 独占自己的依赖声明、注册表、参数与单例缓存，
//! 多个实例可以在同一进程内并存而互不影响。

use crate::builder::ApplicationBuilder;
use crate::builtins::Services;
use config_abstractions::ParameterSource;
use di_abstractions::{
    ContainerConfig, ContainerStats, Definition, DependencyArg, DependencyResolver,
    LibraryProvider, RegistrationKind,
};
use di_impl::{
    Declarations, DefinitionCatalog, DirectoryScanner, Injector, LibraryCatalog, ManifestLoader,
    Registry,
};
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use trellis_common::{
    ApplicationError, ApplicationResult, ApplicationState, EventBus, KvStore, LifecycleEvent,
    LogLevel, Logger, MemoryKvStore, Room,
};

/// 应用
pub struct Application {
    pub(crate) state: ApplicationState,
    pub(crate) config: ContainerConfig,
    declarations: Declarations,
    /// 编排开始前独占，之后与注入器共享
    pub(crate) registry: Arc<Registry>,
    scanner: DirectoryScanner,
    pub(crate) services: Services,
    pub(crate) events: EventBus,
    /// 编排开始时移交给注入器
    pub(crate) libraries: LibraryCatalog,
    pub(crate) injector: Option<Injector>,
}

impl Application {
    /// 使用默认配置创建应用
    pub fn new() -> Self {
        Self::from_parts(
            ContainerConfig::default(),
            DirectoryScanner::new(Arc::new(ManifestLoader::new(Arc::new(
                DefinitionCatalog::new(),
            )))),
            Services::new(LogLevel::Debug, Arc::new(MemoryKvStore::new()), Vec::new()),
            LibraryCatalog::new(),
        )
    }

    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub(crate) fn from_parts(
        config: ContainerConfig,
        scanner: DirectoryScanner,
        services: Services,
        libraries: LibraryCatalog,
    ) -> Self {
        Self {
            state: ApplicationState::Declaring,
            config,
            declarations: Declarations::new(),
            registry: Arc::new(Registry::new()),
            scanner,
            services,
            events: EventBus::new(),
            libraries,
            injector: None,
        }
    }

    pub fn state(&self) -> ApplicationState {
        self.state
    }

    /// 根日志器，与 `$L` 共享级别
    pub fn logger(&self) -> &Logger {
        &self.services.logger
    }

    pub fn kv_store(&self) -> &Arc<dyn KvStore> {
        &self.services.kv_store
    }

    fn ensure_declaring(&self, action: &str) -> ApplicationResult<()> {
        if self.state.is_declaring() {
            Ok(())
        } else {
            Err(ApplicationError::illegal_value(format!(
                "编排开始后不能再{action} (当前状态: {:?})",
                self.state
            )))
        }
    }

    fn registry_mut(&mut self) -> ApplicationResult<&mut Registry> {
        Arc::get_mut(&mut self.registry)
            .ok_or_else(|| ApplicationError::lifecycle("注册表已移交给注入器"))
    }

    /// 为定义追加依赖名，多次调用按先后顺序拼接
    pub fn inject<I, A>(&mut self, definition: &Definition, names: I) -> ApplicationResult<&mut Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<DependencyArg>,
    {
        self.ensure_declaring("声明依赖")?;
        let declared = self.declarations.declare(definition, names)?;
        debug!("定义 {} 的依赖: {:?}", definition.label(), declared);
        Ok(self)
    }

    /// 定义当前声明的依赖列表
    pub fn dependencies_of(&self, definition: &Definition) -> ApplicationResult<Vec<String>> {
        self.declarations.dependencies_of(definition)
    }

    /// 注册构件
    ///
    /// 依赖列表在此刻固定，之后再对定义追加的依赖不会影响本次注册。
    pub fn register(
        &mut self,
        kind: RegistrationKind,
        key: impl Into<String>,
        definition: Definition,
    ) -> ApplicationResult<&mut Self> {
        self.ensure_declaring("注册构件")?;
        let dependencies = self.declarations.dependencies_of(&definition)?;
        let registered = definition.clone();
        self.registry_mut()?
            .register(kind, key, definition, dependencies)?;
        self.declarations.mark_registered(&registered);
        Ok(self)
    }

    pub fn module(&mut self, key: impl Into<String>, definition: Definition) -> ApplicationResult<&mut Self> {
        self.register(RegistrationKind::Module, key, definition)
    }

    pub fn resource(&mut self, key: impl Into<String>, definition: Definition) -> ApplicationResult<&mut Self> {
        self.register(RegistrationKind::Resource, key, definition)
    }

    pub fn route(&mut self, key: impl Into<String>, definition: Definition) -> ApplicationResult<&mut Self> {
        self.register(RegistrationKind::Route, key, definition)
    }

    pub fn room<R: Room + 'static>(&mut self, key: impl Into<String>, room: R) -> ApplicationResult<&mut Self> {
        let key = key.into();
        let definition = Definition::room(key.clone(), room);
        self.register(RegistrationKind::Room, key, definition)
    }

    /// 扫描目录并按相对路径逐个注册，返回注册数量
    ///
    /// 先校验全部条目再注册，任一条目不合法时注册表保持原样。
    pub fn register_tree(
        &mut self,
        kind: RegistrationKind,
        base: impl AsRef<Path>,
    ) -> ApplicationResult<usize> {
        self.ensure_declaring("注册目录")?;
        let base = base.as_ref();
        let scanned = self.scanner.scan(base)?;

        let mut staged = Declarations::new();
        let mut keys = HashSet::new();
        let mut plan = Vec::with_capacity(scanned.len());
        for entry in scanned {
            let definition = entry.loaded.definition;
            match entry.loaded.inject {
                None => {}
                Some(Value::Array(names)) if names.is_empty() => {}
                Some(Value::Array(names)) => {
                    if staged.slot(&definition).is_some() {
                        return Err(ApplicationError::illegal_value(format!(
                            "'{}' 在目录中重复出现且声明了依赖",
                            entry.key
                        )));
                    }
                    staged.declare(&definition, names)?;
                }
                Some(other) => staged.attach_foreign(&definition, other)?,
            }
            let dependencies = staged.dependencies_of(&definition)?;
            if !dependencies.is_empty() && self.declarations.is_registered(&definition) {
                return Err(ApplicationError::illegal_value(format!(
                    "'{}' 的定义已注册，不能再追加依赖",
                    entry.key
                )));
            }
            self.registry.check(kind, &entry.key, &definition)?;
            if !keys.insert(entry.key.clone()) {
                return Err(ApplicationError::duplicate_entry(kind.as_str(), entry.key));
            }
            plan.push((entry.key, definition, dependencies));
        }

        let count = plan.len();
        for (key, definition, dependencies) in plan {
            if !dependencies.is_empty() {
                self.declarations.declare(&definition, &dependencies)?;
            }
            self.register(kind, key, definition)?;
        }

        info!("从 {} 注册了 {} 个 {}", base.display(), count, kind);
        Ok(count)
    }

    /// 已注册的键，按注册顺序
    pub fn registered(&self, kind: RegistrationKind) -> Vec<&str> {
        self.registry.keys(kind)
    }

    /// 注册参数
    pub fn register_parameter(&mut self, name: impl Into<String>, required: bool) -> ApplicationResult<&mut Self> {
        self.services.parameters.write().register(name, required)?;
        Ok(self)
    }

    pub fn register_parameter_with_default(
        &mut self,
        name: impl Into<String>,
        required: bool,
        default: impl Into<Value>,
    ) -> ApplicationResult<&mut Self> {
        self.services
            .parameters
            .write()
            .register_with_default(name, required, Some(default.into()))?;
        Ok(self)
    }

    /// 设置参数值，未注册的参数返回 NotFound
    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> ApplicationResult<&mut Self> {
        self.services.parameters.write().set(name, value)?;
        Ok(self)
    }

    pub fn parameter(&self, name: &str) -> ApplicationResult<Option<Value>> {
        self.services.parameters.read().get(name)
    }

    /// 从参数来源批量读取参数
    ///
    /// 来源中尚未注册的参数按可选参数登记。
    pub fn load_parameters(&mut self, source: &dyn ParameterSource) -> ApplicationResult<usize> {
        let values = source.load()?;
        let mut parameters = self.services.parameters.write();
        for (name, value) in &values {
            if !parameters.is_registered(name) {
                parameters.register(name.clone(), false)?;
            }
            parameters.set(name, value.clone())?;
        }
        debug!("参数来源 {} 提供了 {} 个参数", source.name(), values.len());
        Ok(values.len())
    }

    /// 订阅生命周期事件
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F) -> &mut Self
    where
        F: FnMut(LifecycleEvent) + Send + 'static,
    {
        self.events.on(event, listener);
        self
    }

    /// 订阅生命周期事件，只触发一次
    pub fn once<F>(&mut self, event: LifecycleEvent, listener: F) -> &mut Self
    where
        F: FnMut(LifecycleEvent) + Send + 'static,
    {
        self.events.once(event, listener);
        self
    }

    /// 登记外部库
    pub fn provide_library<P>(&mut self, name: impl Into<String>, provider: P) -> ApplicationResult<&mut Self>
    where
        P: LibraryProvider + 'static,
    {
        self.ensure_declaring("登记外部库")?;
        self.libraries.provide(name, provider)?;
        Ok(self)
    }

    /// 编排开始后按名称取得已构建的依赖
    pub async fn resolve<T: Any + Send + Sync>(&mut self, name: &str) -> ApplicationResult<Arc<T>> {
        let injector = self
            .injector
            .as_mut()
            .ok_or_else(|| ApplicationError::lifecycle("应用尚未启动，无法解析依赖"))?;
        injector.resolve(name).await?.downcast::<T>().map_err(|_| {
            ApplicationError::illegal_value(format!("依赖 '{name}' 不是 {} 类型", type_name::<T>()))
        })
    }

    /// 注入器统计，编排开始前为 `None`
    pub fn stats(&self) -> Option<&ContainerStats> {
        self.injector.as_ref().map(Injector::stats)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}
