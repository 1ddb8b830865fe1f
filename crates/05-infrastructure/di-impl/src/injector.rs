//! 注入器：按名称解析依赖并构造单例模块
//!
//! 解析顺序：内置依赖、单例缓存、已注册模块（递归构造）、外部库。
//! 解析路径作为参数在递归中传递，用于检测循环依赖。

use crate::library::LibraryCatalog;
use async_trait::async_trait;
use di_abstractions::{
    is_builtin_name, Constructed, ContainerConfig, ContainerStats, Dependencies,
    DependencyResolver, Instantiated, ModuleLookup, Registration, ResolutionPath, Shape,
};
use futures::future::{try_join_all, BoxFuture};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use trellis_common::{ApplicationError, ApplicationResult, Instance, ReadyHandle};

/// 注入器
pub struct Injector {
    modules: Arc<dyn ModuleLookup>,
    builtins: HashMap<String, Instance>,
    singletons: HashMap<String, Instance>,
    /// 尚未确认就绪的模块
    pending: BTreeMap<String, ReadyHandle>,
    libraries: LibraryCatalog,
    config: ContainerConfig,
    stats: ContainerStats,
}

impl Injector {
    pub fn new(modules: Arc<dyn ModuleLookup>, config: ContainerConfig) -> Self {
        Self {
            modules,
            builtins: HashMap::new(),
            singletons: HashMap::new(),
            pending: BTreeMap::new(),
            libraries: LibraryCatalog::new(),
            config,
            stats: ContainerStats::default(),
        }
    }

    pub fn with_libraries(mut self, libraries: LibraryCatalog) -> Self {
        self.libraries = libraries;
        self
    }

    /// 注册内置依赖，名称必须以 `$` 开头
    pub fn register_builtin<T>(&mut self, name: &str, value: T) -> ApplicationResult<()>
    where
        T: Any + Send + Sync,
    {
        self.register_builtin_instance(name, Arc::new(value))
    }

    pub fn register_builtin_instance(&mut self, name: &str, instance: Instance) -> ApplicationResult<()> {
        if !is_builtin_name(name) {
            return Err(ApplicationError::illegal_value(format!(
                "内置依赖名必须以 '$' 开头: {name}"
            )));
        }
        if self.builtins.contains_key(name) {
            return Err(ApplicationError::duplicate_entry("builtin", name));
        }
        debug!("注册内置依赖: {}", name);
        self.builtins.insert(name.to_string(), instance);
        Ok(())
    }

    pub fn has_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// 模块是否已构造
    pub fn is_constructed(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn stats(&self) -> &ContainerStats {
        &self.stats
    }

    /// 解析模块但不等待其就绪
    ///
    /// 编排器按注册顺序构造模块时使用，互不依赖的模块无需彼此等待。
    pub async fn resolve_module(&mut self, name: &str) -> ApplicationResult<Instance> {
        let mut path = ResolutionPath::new(self.config.max_resolution_depth);
        self.resolve_in(name, &mut path).await
    }

    /// 等待单个模块就绪
    pub async fn await_ready(&mut self, name: &str) -> ApplicationResult<()> {
        let Some(handle) = self.pending.get(name).cloned() else {
            return Ok(());
        };
        handle.wait(name, self.config.ready_timeout()).await?;
        self.pending.remove(name);
        Ok(())
    }

    /// 并发等待所有尚未就绪的模块
    pub async fn await_pending(&mut self) -> ApplicationResult<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }
        info!("等待 {} 个模块就绪", pending.len());
        let bound = self.config.ready_timeout();
        try_join_all(pending.iter().map(|(name, handle)| handle.wait(name, bound))).await?;
        Ok(())
    }

    fn resolve_in<'a>(
        &'a mut self,
        name: &'a str,
        path: &'a mut ResolutionPath,
    ) -> BoxFuture<'a, ApplicationResult<Instance>> {
        Box::pin(async move {
            if let Some(instance) = self.builtins.get(name) {
                self.stats.builtin_hits += 1;
                return Ok(instance.clone());
            }
            if is_builtin_name(name) {
                return Err(ApplicationError::not_found(format!("未知的内置依赖: {name}")));
            }
            if let Some(instance) = self.singletons.get(name) {
                self.stats.cache_hits += 1;
                return Ok(instance.clone());
            }
            if path.contains(name) {
                return Err(path.cycle_error(name));
            }
            if let Some(registration) = self.modules.module(name).cloned() {
                path.push(name)?;
                let constructed = self.construct_module(&registration, path).await;
                path.pop();
                return constructed;
            }
            match self.libraries.load(name)? {
                Some(instance) => {
                    self.stats.library_loads += 1;
                    Ok(instance)
                }
                None => Err(ApplicationError::not_found(format!("无法解析依赖: {name}"))),
            }
        })
    }

    /// 按声明顺序解析依赖列表；被依赖的模块必须先就绪
    async fn resolve_dependencies(
        &mut self,
        names: &[String],
        path: &mut ResolutionPath,
    ) -> ApplicationResult<Dependencies> {
        let mut instances = Vec::with_capacity(names.len());
        for name in names {
            let instance = self.resolve_in(name, path).await?;
            self.await_ready(name).await?;
            instances.push(instance);
        }
        Ok(Dependencies::new(names.to_vec(), instances))
    }

    async fn construct_module(
        &mut self,
        registration: &Registration,
        path: &mut ResolutionPath,
    ) -> ApplicationResult<Instance> {
        let Shape::Module(constructor) = registration.definition().shape() else {
            return Err(ApplicationError::illegal_value(format!(
                "'{}' 不是模块定义",
                registration.key()
            )));
        };
        let constructor = constructor.clone();
        let dependencies = self
            .resolve_dependencies(registration.dependencies(), path)
            .await?;

        debug!("构造模块: {}", registration.key());
        let Constructed {
            instance,
            readiness,
        } = constructor(dependencies)?;

        self.singletons
            .insert(registration.key().to_string(), instance.clone());
        if let Some(handle) = readiness.filter(|handle| !handle.is_ready()) {
            self.pending.insert(registration.key().to_string(), handle);
        }
        self.stats.constructed_modules += 1;
        Ok(instance)
    }
}

#[async_trait]
impl DependencyResolver for Injector {
    /// 解析依赖并等待其就绪
    async fn resolve(&mut self, name: &str) -> ApplicationResult<Instance> {
        let instance = self.resolve_module(name).await?;
        self.await_ready(name).await?;
        Ok(instance)
    }

    async fn instantiate(&mut self, registration: &Registration) -> ApplicationResult<Instantiated> {
        let mut path = ResolutionPath::new(self.config.max_resolution_depth);
        let instantiated = match registration.definition().shape() {
            Shape::Module(_) => {
                Instantiated::Module(self.resolve_in(registration.key(), &mut path).await?)
            }
            Shape::Resource(constructor) => {
                let constructor = constructor.clone();
                let dependencies = self
                    .resolve_dependencies(registration.dependencies(), &mut path)
                    .await?;
                Instantiated::Resource(constructor(dependencies)?)
            }
            Shape::Routes(constructor) => {
                let constructor = constructor.clone();
                let dependencies = self
                    .resolve_dependencies(registration.dependencies(), &mut path)
                    .await?;
                Instantiated::Routes(constructor(dependencies)?)
            }
            Shape::Room(_) => {
                return Err(ApplicationError::illegal_value(format!(
                    "房间 '{}' 不经过注入器实例化",
                    registration.key()
                )))
            }
        };
        self.stats.instantiated += 1;
        Ok(instantiated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use di_abstractions::{Definition, RegistrationKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use trellis_common::{readiness, ErrorKind, Logger};

    struct Counter(usize);

    fn registry_with(modules: Vec<(&str, Definition, Vec<&str>)>) -> Arc<Registry> {
        let mut registry = Registry::new();
        for (key, definition, deps) in modules {
            registry
                .register(
                    RegistrationKind::Module,
                    key,
                    definition,
                    deps.into_iter().map(String::from).collect(),
                )
                .unwrap();
        }
        Arc::new(registry)
    }

    fn counting_module(label: &str, constructions: Arc<AtomicUsize>) -> Definition {
        Definition::module(label, move |_| {
            Ok(Counter(constructions.fetch_add(1, Ordering::SeqCst)))
        })
    }

    #[tokio::test]
    async fn test_singleton_identity_across_dependents() {
        let constructions = Arc::new(AtomicUsize::new(0));
        let registry = registry_with(vec![
            ("a", counting_module("a", constructions.clone()), vec![]),
            (
                "b",
                Definition::module("b", |deps| deps.get::<Counter>(0)),
                vec!["a"],
            ),
        ]);
        let mut injector = Injector::new(registry, ContainerConfig::default());

        let first = injector.resolve("b").await.unwrap();
        let second = injector.resolve("b").await.unwrap();
        let a = injector.resolve("a").await.unwrap();

        let first = first.downcast::<Arc<Counter>>().unwrap();
        let second = second.downcast::<Arc<Counter>>().unwrap();
        let a = a.downcast::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&*first, &a));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert_eq!(injector.stats().constructed_modules, 2);
    }

    #[tokio::test]
    async fn test_cycle_detected_from_either_side() {
        let registry = registry_with(vec![
            ("a", Definition::module("a", |_| Ok(())), vec!["b"]),
            ("b", Definition::module("b", |_| Ok(())), vec!["a"]),
        ]);
        let mut injector = Injector::new(registry, ContainerConfig::default());

        for name in ["a", "b"] {
            let err = injector.resolve(name).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CircularDependency);
        }
        assert!(!injector.is_constructed("a"));
    }

    #[tokio::test]
    async fn test_builtins_and_libraries() {
        let registry = registry_with(vec![(
            "greeter",
            Definition::module("greeter", |deps| {
                let logger = deps.get::<Logger>(0)?;
                let prefix = deps.get::<String>(1)?;
                Ok(format!("{} {:?}", prefix, logger.name()))
            }),
            vec!["$L", "moment"],
        )]);
        let mut libraries = LibraryCatalog::new();
        libraries
            .provide("moment", |_: &str| -> ApplicationResult<Instance> {
                Ok(Arc::new("hello".to_string()))
            })
            .unwrap();

        let mut injector =
            Injector::new(registry, ContainerConfig::default()).with_libraries(libraries);
        injector.register_builtin("$L", Logger::default()).unwrap();

        let greeting = injector.resolve("greeter").await.unwrap();
        assert_eq!(greeting.downcast::<String>().unwrap().as_str(), "hello None");

        let err = injector.resolve("$DB").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = injector.resolve("lodash").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            injector.register_builtin("L", 1u8).unwrap_err().kind(),
            ErrorKind::IllegalValue
        );
    }

    #[tokio::test]
    async fn test_dependency_ready_before_dependent_constructed() {
        let (notifier, handle) = readiness();
        let notifier = std::sync::Mutex::new(Some(notifier));
        let registry = registry_with(vec![
            (
                "pool",
                Definition::async_module("pool", move |_| {
                    let (inner, handle_for_pool) = readiness();
                    if let Some(outer) = notifier.lock().unwrap().take() {
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            outer.ready();
                            inner.ready();
                        });
                    }
                    Ok(Constructed::pending(Counter(0), handle_for_pool))
                }),
                vec![],
            ),
            (
                "repo",
                Definition::module("repo", move |_| Ok(handle.is_ready())),
                vec!["pool"],
            ),
        ]);
        let mut injector = Injector::new(registry, ContainerConfig::default());

        let ready_at_construction = injector.resolve("repo").await.unwrap();
        assert!(*ready_at_construction.downcast::<bool>().unwrap());
    }

    #[tokio::test]
    async fn test_pending_module_times_out() {
        let registry = registry_with(vec![(
            "slow",
            Definition::async_module("slow", |_| {
                let (notifier, handle) = readiness();
                std::mem::forget(notifier);
                Ok(Constructed::pending((), handle))
            }),
            vec![],
        )]);
        let config = ContainerConfig::default().with_ready_timeout(Duration::from_millis(30));
        let mut injector = Injector::new(registry, config);

        injector.resolve_module("slow").await.unwrap();
        let err = injector.await_pending().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
