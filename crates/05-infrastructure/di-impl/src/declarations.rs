//! 依赖声明旁路表
//!
//! 以定义标识为键保存依赖列表，不修改定义本身。

use di_abstractions::{Definition, DefinitionId, DependencyArg, DependencySlot};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use trellis_common::{ApplicationError, ApplicationResult};

/// 依赖声明表
#[derive(Debug, Default)]
pub struct Declarations {
    slots: HashMap<DefinitionId, DependencySlot>,
    /// 已注册的定义，其依赖列表不再可变
    registered: HashSet<DefinitionId>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为定义追加依赖名
    ///
    /// 多次声明按先后顺序拼接。参数校验先于任何修改，失败时依赖槽保持原样。
    /// 定义注册后依赖列表已固定，再次声明返回 IllegalValue。
    pub fn declare<I, A>(&mut self, definition: &Definition, args: I) -> ApplicationResult<&[String]>
    where
        I: IntoIterator<Item = A>,
        A: Into<DependencyArg>,
    {
        let names = dependency_names(definition, args)?;
        if self.is_registered(definition) {
            return Err(ApplicationError::illegal_value(format!(
                "'{}' 已注册，不能再追加依赖 {:?}",
                definition.label(),
                names
            )));
        }

        let slot = self
            .slots
            .entry(definition.id())
            .or_insert_with(|| DependencySlot::Declared(Vec::new()));
        match slot {
            DependencySlot::Declared(existing) => {
                existing.extend(names);
                debug!("声明依赖: {} -> {:?}", definition.label(), existing);
                Ok(existing.as_slice())
            }
            DependencySlot::Foreign(value) => Err(ApplicationError::illegal_value(format!(
                "'{}' 的依赖槽已被非列表值占用: {}",
                definition.label(),
                value
            ))),
        }
    }

    /// 将非列表值放入依赖槽
    pub fn attach_foreign(&mut self, definition: &Definition, value: Value) -> ApplicationResult<()> {
        if self.slots.contains_key(&definition.id()) {
            return Err(ApplicationError::illegal_value(format!(
                "'{}' 的依赖槽已被占用",
                definition.label()
            )));
        }
        self.slots
            .insert(definition.id(), DependencySlot::Foreign(value));
        Ok(())
    }

    /// 定义的依赖列表，未声明时为空
    pub fn dependencies_of(&self, definition: &Definition) -> ApplicationResult<Vec<String>> {
        match self.slots.get(&definition.id()) {
            None => Ok(Vec::new()),
            Some(DependencySlot::Declared(names)) => Ok(names.clone()),
            Some(DependencySlot::Foreign(value)) => Err(ApplicationError::illegal_value(format!(
                "'{}' 的依赖列表不是列表: {}",
                definition.label(),
                value
            ))),
        }
    }

    pub fn slot(&self, definition: &Definition) -> Option<&DependencySlot> {
        self.slots.get(&definition.id())
    }

    /// 标记定义已注册
    pub fn mark_registered(&mut self, definition: &Definition) {
        self.registered.insert(definition.id());
    }

    pub fn is_registered(&self, definition: &Definition) -> bool {
        self.registered.contains(&definition.id())
    }
}

/// 校验声明参数并取出依赖名
fn dependency_names<I, A>(definition: &Definition, args: I) -> ApplicationResult<Vec<String>>
where
    I: IntoIterator<Item = A>,
    A: Into<DependencyArg>,
{
    let args: Vec<DependencyArg> = args.into_iter().map(Into::into).collect();
    if args.is_empty() {
        return Err(ApplicationError::not_found(format!(
            "为 '{}' 声明依赖时至少需要一个依赖名",
            definition.label()
        )));
    }

    args.iter()
        .enumerate()
        .map(|(position, arg)| {
            arg.as_name().map(str::to_string).ok_or_else(|| {
                ApplicationError::illegal_value(format!(
                    "'{}' 的第 {} 个依赖名必须是非空字符串，实际为 {}",
                    definition.label(),
                    position + 1,
                    arg.value()
                ))
            })
        })
        .collect()
}
