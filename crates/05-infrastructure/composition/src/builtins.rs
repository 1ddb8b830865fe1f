//! 内置依赖
//!
//! 以 `$` 开头的名称保留给框架。日志器、错误构造器和参数访问器在编排开始时注册，
//! 数据访问句柄、键值存储与广播句柄按启动模式准备。

use di_impl::Injector;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use trellis_common::{
    ApplicationResult, Broadcast, BroadcastHandle, Database, DatabaseProvider, ErrorKinds,
    KvStore, KvStoreHandle, LogLevel, Logger, ParameterAccessor, Parameters,
};

/// 日志设施
pub const LOGGER: &str = "$L";
/// 错误构造器
pub const ERRORS: &str = "$E";
/// 参数访问器
pub const PARAMS: &str = "$Params";
/// 共享键值存储
pub const KV: &str = "$KV";
/// 事务化数据访问句柄
pub const DB: &str = "$DB";
/// 实时广播，仅完整启动且宿主提供时可用
pub const BROADCAST: &str = "$Broadcast";

/// 内置依赖的准备方式
pub(crate) enum BuiltinMode {
    /// 数据库总是回滚，键值存储先清空
    Test,
    Full {
        broadcast: Option<Arc<dyn Broadcast>>,
    },
}

/// 应用持有的框架服务
pub(crate) struct Services {
    pub(crate) logger: Logger,
    pub(crate) parameters: Arc<RwLock<Parameters>>,
    pub(crate) kv_store: Arc<dyn KvStore>,
    pub(crate) databases: Vec<Arc<dyn DatabaseProvider>>,
}

impl Services {
    pub(crate) fn new(
        log_level: LogLevel,
        kv_store: Arc<dyn KvStore>,
        databases: Vec<Arc<dyn DatabaseProvider>>,
    ) -> Self {
        Self {
            logger: Logger::new(log_level),
            parameters: Arc::new(RwLock::new(Parameters::with_log_level(log_level))),
            kv_store,
            databases,
        }
    }

    /// 向注入器注册全部内置依赖
    pub(crate) async fn install(
        &self,
        injector: &mut Injector,
        mode: BuiltinMode,
    ) -> ApplicationResult<()> {
        injector.register_builtin(LOGGER, self.logger.clone())?;
        injector.register_builtin(ERRORS, ErrorKinds)?;
        injector.register_builtin(PARAMS, ParameterAccessor::new(self.parameters.clone()))?;

        let always_rollback = matches!(mode, BuiltinMode::Test);
        if always_rollback {
            self.kv_store.flush().await?;
        }
        injector.register_builtin(KV, KvStoreHandle::new(self.kv_store.clone()))?;
        injector.register_builtin(DB, Database::new(self.databases.clone(), always_rollback))?;

        if let BuiltinMode::Full {
            broadcast: Some(broadcast),
        } = mode
        {
            injector.register_builtin(BROADCAST, BroadcastHandle::new(broadcast))?;
        }

        debug!("内置依赖准备完成 (always_rollback = {})", always_rollback);
        Ok(())
    }
}
