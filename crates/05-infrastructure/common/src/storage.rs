//! 键值存储与事务化数据访问句柄（内置依赖 `$KV` / `$DB`）

use crate::errors::{ApplicationError, ApplicationResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// 共享键值存储
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> ApplicationResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> ApplicationResult<()>;

    /// 删除键，返回键是否存在
    async fn delete(&self, key: &str) -> ApplicationResult<bool>;

    /// 清空全部数据
    async fn flush(&self) -> ApplicationResult<()>;
}

/// 进程内键值存储
///
/// 可以派生共享底层数据、按前缀隔离的视图，`flush` 只清空本视图的键。
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, Value>>,
    prefix: String,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 共享数据、以 `prefix` 隔离的视图
    pub fn scoped(&self, prefix: impl AsRef<str>) -> Self {
        Self {
            entries: self.entries.clone(),
            prefix: format!("{}{}", self.prefix, prefix.as_ref()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 本视图内的键数量
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(&self.prefix))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> ApplicationResult<Option<Value>> {
        Ok(self
            .entries
            .get(&self.scoped_key(key))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> ApplicationResult<()> {
        self.entries.insert(self.scoped_key(key), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ApplicationResult<bool> {
        Ok(self.entries.remove(&self.scoped_key(key)).is_some())
    }

    async fn flush(&self) -> ApplicationResult<()> {
        debug!("清空内存键值存储 (前缀 '{}')，共 {} 项", self.prefix, self.len());
        self.entries.retain(|key, _| !key.starts_with(&self.prefix));
        Ok(())
    }
}

/// 键值存储句柄
#[derive(Clone)]
pub struct KvStoreHandle {
    store: Arc<dyn KvStore>,
}

impl KvStoreHandle {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

impl Deref for KvStoreHandle {
    type Target = dyn KvStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl fmt::Debug for KvStoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStoreHandle").finish_non_exhaustive()
    }
}

/// 事务连接
#[async_trait]
pub trait TransactionConnection: Send {
    async fn commit(&mut self) -> ApplicationResult<()>;

    async fn rollback(&mut self) -> ApplicationResult<()>;
}

/// 具名的后端存储提供者
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 打开一个处于事务中的连接
    async fn get_transaction_connection(&self) -> ApplicationResult<Box<dyn TransactionConnection>>;
}

/// 事务化数据访问句柄
///
/// 测试模式下以 `always_rollback` 创建，所有事务结束时都会回滚。
#[derive(Clone)]
pub struct Database {
    providers: Arc<BTreeMap<String, Arc<dyn DatabaseProvider>>>,
    always_rollback: bool,
}

impl Database {
    pub fn new(providers: Vec<Arc<dyn DatabaseProvider>>, always_rollback: bool) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.name().to_string(), provider))
            .collect();
        Self {
            providers: Arc::new(providers),
            always_rollback,
        }
    }

    pub fn always_rollback(&self) -> bool {
        self.always_rollback
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// 在所有提供者上开启事务
    pub async fn begin(&self) -> ApplicationResult<Transaction> {
        let mut connections = Vec::with_capacity(self.providers.len());
        for (name, provider) in self.providers.iter() {
            let connection = provider.get_transaction_connection().await?;
            connections.push((name.clone(), connection));
        }
        Ok(Transaction {
            connections,
            always_rollback: self.always_rollback,
        })
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("providers", &self.provider_names())
            .field("always_rollback", &self.always_rollback)
            .finish()
    }
}

/// 一次跨提供者的事务
pub struct Transaction {
    connections: Vec<(String, Box<dyn TransactionConnection>)>,
    always_rollback: bool,
}

impl Transaction {
    /// 按提供者名称取得连接
    pub fn connection(&mut self, name: &str) -> ApplicationResult<&mut dyn TransactionConnection> {
        for (provider, connection) in &mut self.connections {
            if provider == name {
                return Ok(connection.as_mut());
            }
        }
        Err(ApplicationError::not_found(format!("未配置的数据库提供者: {name}")))
    }

    /// 结束事务：成功时提交，失败或强制回滚时回滚
    pub async fn finish(mut self, success: bool) -> ApplicationResult<()> {
        let commit = success && !self.always_rollback;
        for (name, connection) in &mut self.connections {
            if commit {
                connection.commit().await?;
            } else {
                debug!("回滚事务: {}", name);
                connection.rollback().await?;
            }
        }
        Ok(())
    }
}
