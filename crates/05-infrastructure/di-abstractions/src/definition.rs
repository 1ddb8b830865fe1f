//! 可构造的定义及其构造形态

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use trellis_common::{
    ApplicationError, ApplicationResult, Instance, ReadyHandle, Resource, Room, Routes,
};
use uuid::Uuid;

/// 定义标识
///
/// 依赖声明以标识为键保存在旁路表中，克隆定义不会改变标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(Uuid);

impl DefinitionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 模块构造结果
pub struct Constructed {
    pub instance: Instance,
    /// 异步初始化的就绪信号，`None` 表示构造即就绪
    pub readiness: Option<ReadyHandle>,
}

impl Constructed {
    /// 构造完成即就绪
    pub fn ready<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            instance: Arc::new(value),
            readiness: None,
        }
    }

    /// 需要等待异步初始化
    pub fn pending<T: Any + Send + Sync>(value: T, readiness: ReadyHandle) -> Self {
        Self {
            instance: Arc::new(value),
            readiness: Some(readiness),
        }
    }
}

impl fmt::Debug for Constructed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructed")
            .field("pending", &self.readiness.is_some())
            .finish_non_exhaustive()
    }
}

/// 模块构造函数
pub type ModuleConstructor =
    Arc<dyn Fn(Dependencies) -> ApplicationResult<Constructed> + Send + Sync>;

/// 资源构造函数
pub type ResourceConstructor =
    Arc<dyn Fn(Dependencies) -> ApplicationResult<Arc<dyn Resource>> + Send + Sync>;

/// 路由构造函数
pub type RoutesConstructor =
    Arc<dyn Fn(Dependencies) -> ApplicationResult<Arc<dyn Routes>> + Send + Sync>;

/// 构造形态
#[derive(Clone)]
pub enum Shape {
    Module(ModuleConstructor),
    Resource(ResourceConstructor),
    Routes(RoutesConstructor),
    /// 房间不经过注入器构造
    Room(Arc<dyn Room>),
}

impl Shape {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Module(_) => "module",
            Self::Resource(_) => "resource",
            Self::Routes(_) => "routes",
            Self::Room(_) => "room",
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// 定义：一个可构造的构件
#[derive(Debug, Clone)]
pub struct Definition {
    id: DefinitionId,
    label: Arc<str>,
    shape: Shape,
}

impl Definition {
    /// 以任意形态创建定义
    pub fn new(label: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: DefinitionId::new(),
            label: Arc::from(label.into()),
            shape,
        }
    }

    /// 构造即就绪的模块
    pub fn module<T, F>(label: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Dependencies) -> ApplicationResult<T> + Send + Sync + 'static,
    {
        Self::new(
            label,
            Shape::Module(Arc::new(move |deps: Dependencies| {
                constructor(deps).map(Constructed::ready)
            })),
        )
    }

    /// 自行给出就绪信号的模块
    pub fn async_module<F>(label: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Dependencies) -> ApplicationResult<Constructed> + Send + Sync + 'static,
    {
        Self::new(label, Shape::Module(Arc::new(constructor)))
    }

    /// REST 资源
    pub fn resource<R, F>(label: impl Into<String>, constructor: F) -> Self
    where
        R: Resource + 'static,
        F: Fn(Dependencies) -> ApplicationResult<R> + Send + Sync + 'static,
    {
        Self::new(
            label,
            Shape::Resource(Arc::new(move |deps: Dependencies| {
                constructor(deps).map(|resource| Arc::new(resource) as Arc<dyn Resource>)
            })),
        )
    }

    /// 路由集合
    pub fn routes<R, F>(label: impl Into<String>, constructor: F) -> Self
    where
        R: Routes + 'static,
        F: Fn(Dependencies) -> ApplicationResult<R> + Send + Sync + 'static,
    {
        Self::new(
            label,
            Shape::Routes(Arc::new(move |deps: Dependencies| {
                constructor(deps).map(|routes| Arc::new(routes) as Arc<dyn Routes>)
            })),
        )
    }

    /// 房间
    pub fn room<R: Room + 'static>(label: impl Into<String>, room: R) -> Self {
        Self::new(label, Shape::Room(Arc::new(room)))
    }

    /// 相同构造形态、全新标识的副本
    pub fn fork(&self) -> Self {
        Self {
            id: DefinitionId::new(),
            label: self.label.clone(),
            shape: self.shape.clone(),
        }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// 按声明顺序解析出的构造参数
#[derive(Clone, Default)]
pub struct Dependencies {
    names: Vec<String>,
    instances: Vec<Instance>,
}

impl Dependencies {
    pub fn new(names: Vec<String>, instances: Vec<Instance>) -> Self {
        Self { names, instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 第 `index` 个参数的原始实例
    pub fn instance(&self, index: usize) -> ApplicationResult<Instance> {
        self.instances.get(index).cloned().ok_or_else(|| {
            ApplicationError::illegal_value(format!(
                "构造参数下标越界: {index} (共 {} 个)",
                self.instances.len()
            ))
        })
    }

    /// 第 `index` 个参数，按类型向下转换
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> ApplicationResult<Arc<T>> {
        let name = self.names.get(index).map_or("?", String::as_str);
        self.instance(index)?.downcast::<T>().map_err(|_| {
            ApplicationError::illegal_value(format!(
                "依赖 '{name}' 不是 {} 类型",
                type_name::<T>()
            ))
        })
    }

    /// 按依赖名取参数
    pub fn by_name<T: Any + Send + Sync>(&self, name: &str) -> ApplicationResult<Arc<T>> {
        let index = self
            .names
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| ApplicationError::not_found(format!("未声明的依赖: {name}")))?;
        self.get(index)
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.names).finish()
    }
}

/// 实例化得到的顶层构件
#[derive(Clone)]
pub enum Instantiated {
    Module(Instance),
    Resource(Arc<dyn Resource>),
    Routes(Arc<dyn Routes>),
}

impl fmt::Debug for Instantiated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(_) => f.write_str("Instantiated::Module"),
            Self::Resource(resource) => write!(f, "Instantiated::Resource({})", resource.base_path()),
            Self::Routes(_) => f.write_str("Instantiated::Routes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::ErrorKind;

    #[derive(Debug, PartialEq)]
    struct Config {
        port: u16,
    }

    #[test]
    fn test_fork_keeps_shape_with_new_identity() {
        let definition = Definition::module("config", |_| Ok(Config { port: 80 }));
        let copy = definition.clone();
        let fork = definition.fork();

        assert_eq!(copy.id(), definition.id());
        assert_ne!(fork.id(), definition.id());
        assert_eq!(fork.label(), "config");
        assert_eq!(fork.shape().describe(), "module");
    }

    #[test]
    fn test_dependencies_typed_access() {
        let deps = Dependencies::new(
            vec!["config".to_string(), "name".to_string()],
            vec![
                Arc::new(Config { port: 8080 }) as Instance,
                Arc::new("users".to_string()) as Instance,
            ],
        );

        assert_eq!(deps.get::<Config>(0).unwrap().port, 8080);
        assert_eq!(deps.by_name::<String>("name").unwrap().as_str(), "users");
        assert_eq!(deps.get::<String>(0).unwrap_err().kind(), ErrorKind::IllegalValue);
        assert_eq!(deps.get::<Config>(5).unwrap_err().kind(), ErrorKind::IllegalValue);
        assert_eq!(deps.by_name::<Config>("db").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
