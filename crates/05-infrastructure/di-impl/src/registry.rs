//! 注册表：四个互相独立、保持注册顺序的命名空间

use di_abstractions::{is_builtin_name, Definition, ModuleLookup, Registration, RegistrationKind};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use trellis_common::{ApplicationError, ApplicationResult};

#[derive(Debug, Default)]
struct Namespace {
    entries: Vec<Registration>,
    index: HashMap<String, usize>,
}

/// 注册表
#[derive(Debug, Default)]
pub struct Registry {
    namespaces: BTreeMap<RegistrationKind, Namespace>,
    sealed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个延迟工厂，不会执行任何构造
    pub fn register(
        &mut self,
        kind: RegistrationKind,
        key: impl Into<String>,
        definition: Definition,
        dependencies: Vec<String>,
    ) -> ApplicationResult<()> {
        let key = key.into();
        self.check(kind, &key, &definition)?;

        debug!("注册 {}: {} ({:?})", kind, key, dependencies);
        let namespace = self.namespaces.entry(kind).or_default();
        namespace.index.insert(key.clone(), namespace.entries.len());
        namespace
            .entries
            .push(Registration::new(kind, key, definition, dependencies));
        Ok(())
    }

    /// 检查注册是否会成功，不修改注册表
    pub fn check(&self, kind: RegistrationKind, key: &str, definition: &Definition) -> ApplicationResult<()> {
        if self.sealed {
            return Err(ApplicationError::illegal_value(format!(
                "编排开始后不能再注册 {kind} '{key}'"
            )));
        }
        if key.is_empty() {
            return Err(ApplicationError::illegal_value(format!("{kind} 的注册键不能为空")));
        }
        if kind == RegistrationKind::Module && is_builtin_name(key) {
            return Err(ApplicationError::illegal_value(format!(
                "模块名 '{key}' 占用了内置依赖的保留前缀"
            )));
        }
        if !kind.accepts(definition.shape()) {
            return Err(ApplicationError::illegal_value(format!(
                "{kind} '{key}' 需要 {kind} 形态的定义，实际为 {}",
                definition.shape().describe()
            )));
        }
        if self.contains(kind, key) {
            return Err(ApplicationError::duplicate_entry(kind.as_str(), key));
        }
        Ok(())
    }

    pub fn contains(&self, kind: RegistrationKind, key: &str) -> bool {
        self.get(kind, key).is_some()
    }

    /// 封存注册表，此后拒绝注册
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn get(&self, kind: RegistrationKind, key: &str) -> Option<&Registration> {
        let namespace = self.namespaces.get(&kind)?;
        namespace
            .index
            .get(key)
            .and_then(|position| namespace.entries.get(*position))
    }

    /// 某类别的全部注册项，按注册顺序
    pub fn entries(&self, kind: RegistrationKind) -> &[Registration] {
        match self.namespaces.get(&kind) {
            Some(namespace) => namespace.entries.as_slice(),
            None => &[],
        }
    }

    pub fn keys(&self, kind: RegistrationKind) -> Vec<&str> {
        self.entries(kind)
            .iter()
            .map(Registration::key)
            .collect()
    }

    pub fn len(&self, kind: RegistrationKind) -> usize {
        self.entries(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces
            .values()
            .all(|namespace| namespace.entries.is_empty())
    }
}

impl ModuleLookup for Registry {
    fn module(&self, name: &str) -> Option<&Registration> {
        self.get(RegistrationKind::Module, name)
    }
}
