//! 宿主 Web 应用与实时广播的协作接口

use crate::component::{HttpMethod, RequestHandler, Room};
use crate::errors::ApplicationResult;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// 宿主 Web 应用
///
/// 完整启动时资源与路由通过它挂载处理函数，全部挂载完成后才调用 [`listen`](Self::listen)。
#[async_trait]
pub trait WebApplication: Send {
    /// 在给定路径挂载处理函数
    fn mount(&mut self, method: HttpMethod, path: &str, handler: RequestHandler)
        -> ApplicationResult<()>;

    /// 接管已注册的房间
    fn attach_rooms(&mut self, _rooms: Vec<(String, Arc<dyn Room>)>) -> ApplicationResult<()> {
        Ok(())
    }

    /// 宿主提供的实时广播设施
    fn broadcast(&self) -> Option<Arc<dyn Broadcast>> {
        None
    }

    /// 开始接收外部流量
    async fn listen(&mut self) -> ApplicationResult<()>;
}

/// 实时广播设施
pub trait Broadcast: Send + Sync {
    fn emit(&self, room: &str, event: &str, payload: Value) -> ApplicationResult<()>;
}

/// 注入给业务模块的广播句柄（内置依赖 `$Broadcast`）
#[derive(Clone)]
pub struct BroadcastHandle {
    inner: Arc<dyn Broadcast>,
}

impl BroadcastHandle {
    pub fn new(inner: Arc<dyn Broadcast>) -> Self {
        Self { inner }
    }

    pub fn emit(&self, room: &str, event: &str, payload: Value) -> ApplicationResult<()> {
        self.inner.emit(room, event, payload)
    }
}

impl fmt::Debug for BroadcastHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHandle").finish_non_exhaustive()
    }
}
