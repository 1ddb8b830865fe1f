//! 应用生命周期：状态、事件与模块就绪信号

use crate::errors::{ApplicationError, ApplicationResult};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

/// 应用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationState {
    /// 声明阶段，允许注册
    Declaring,
    /// 启动序列执行中
    Starting,
    /// 测试模式序列已完成
    Tested,
    /// 完整启动序列已完成，正在接收外部流量
    Running,
    /// 启动序列失败
    Failed,
}

impl ApplicationState {
    /// 是否仍处于声明阶段
    pub fn is_declaring(&self) -> bool {
        matches!(self, Self::Declaring)
    }
}

/// 生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// 启动序列开始
    Start,
    /// 所有构件已实例化
    PostInit,
    /// 开始接收外部流量
    Listening,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::PostInit => f.write_str("post init"),
            Self::Listening => f.write_str("listening"),
        }
    }
}

type Listener = Box<dyn FnMut(LifecycleEvent) + Send>;

struct Subscription {
    event: LifecycleEvent,
    once: bool,
    listener: Listener,
}

/// 生命周期事件总线
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    /// 创建空的事件总线
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F)
    where
        F: FnMut(LifecycleEvent) + Send + 'static,
    {
        self.subscriptions.push(Subscription {
            event,
            once: false,
            listener: Box::new(listener),
        });
    }

    /// 订阅事件，触发一次后自动移除
    pub fn once<F>(&mut self, event: LifecycleEvent, listener: F)
    where
        F: FnMut(LifecycleEvent) + Send + 'static,
    {
        self.subscriptions.push(Subscription {
            event,
            once: true,
            listener: Box::new(listener),
        });
    }

    /// 按订阅顺序通知监听者，返回被通知的数量
    pub fn emit(&mut self, event: LifecycleEvent) -> usize {
        let mut delivered = 0;
        self.subscriptions.retain_mut(|subscription| {
            if subscription.event != event {
                return true;
            }
            (subscription.listener)(event);
            delivered += 1;
            !subscription.once
        });
        delivered
    }

    /// 某事件的监听者数量
    pub fn listener_count(&self, event: LifecycleEvent) -> usize {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.event == event)
            .count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

/// 模块就绪状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

/// 创建一对就绪信号端点
///
/// 模块在构造时返回 [`ReadyHandle`]，并在异步初始化完成后通过
/// [`ReadyNotifier`] 发出信号。
pub fn readiness() -> (ReadyNotifier, ReadyHandle) {
    let (tx, rx) = watch::channel(Readiness::Pending);
    (ReadyNotifier { tx }, ReadyHandle { rx })
}

/// 就绪信号发送端
#[derive(Debug)]
pub struct ReadyNotifier {
    tx: watch::Sender<Readiness>,
}

impl ReadyNotifier {
    /// 标记模块已就绪
    pub fn ready(self) {
        self.tx.send_replace(Readiness::Ready);
    }

    /// 标记模块初始化失败
    pub fn fail(self, reason: impl Into<String>) {
        self.tx.send_replace(Readiness::Failed(reason.into()));
    }
}

/// 就绪信号接收端
#[derive(Debug, Clone)]
pub struct ReadyHandle {
    rx: watch::Receiver<Readiness>,
}

impl ReadyHandle {
    /// 当前状态
    pub fn state(&self) -> Readiness {
        self.rx.borrow().clone()
    }

    /// 是否已就绪
    pub fn is_ready(&self) -> bool {
        matches!(*self.rx.borrow(), Readiness::Ready)
    }

    /// 在给定时限内等待模块就绪
    pub async fn wait(&self, name: &str, bound: Duration) -> ApplicationResult<()> {
        let mut rx = self.rx.clone();
        let settled = tokio::time::timeout(bound, async move {
            rx.wait_for(|state| !matches!(state, Readiness::Pending))
                .await
                .map(|state| state.clone())
        })
        .await;

        match settled {
            Err(_) => Err(ApplicationError::timeout(format!(
                "模块 '{name}' 未在 {bound:?} 内就绪"
            ))),
            Ok(Err(_)) => Err(ApplicationError::creation_failed(
                name,
                "就绪信号在发出前被丢弃",
            )),
            Ok(Ok(Readiness::Failed(reason))) => {
                Err(ApplicationError::creation_failed(name, reason))
            }
            Ok(Ok(Readiness::Ready)) => Ok(()),
            Ok(Ok(Readiness::Pending)) => Err(ApplicationError::timeout(format!(
                "模块 '{name}' 仍未就绪"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_once_listener_fires_once() {
        let mut bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        bus.once(LifecycleEvent::Start, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = hits.clone();
        bus.on(LifecycleEvent::Start, move |_| {
            counter.fetch_add(10, Ordering::SeqCst);
        });

        assert_eq!(bus.emit(LifecycleEvent::Start), 2);
        assert_eq!(bus.emit(LifecycleEvent::Start), 1);
        assert_eq!(bus.emit(LifecycleEvent::PostInit), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 21);
        assert_eq!(bus.listener_count(LifecycleEvent::Start), 1);
    }

    #[tokio::test]
    async fn test_ready_signal_from_task() {
        let (notifier, handle) = readiness();
        assert!(!handle.is_ready());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            notifier.ready();
        });

        handle.wait("pool", Duration::from_secs(2)).await.unwrap();
        assert!(handle.is_ready());
    }

    #[tokio::test]
    async fn test_ready_signal_timeout() {
        let (_notifier, handle) = readiness();
        let err = handle
            .wait("slow", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_failed_and_dropped_signals() {
        let (notifier, handle) = readiness();
        notifier.fail("连接池不可用");
        let err = handle.wait("db", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComponentCreationFailed);

        let (notifier, handle) = readiness();
        drop(notifier);
        let err = handle.wait("db", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComponentCreationFailed);
    }
}
