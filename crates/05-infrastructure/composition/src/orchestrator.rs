//! 启动编排
//!
//! 测试模式只构造模块；完整启动依次构造模块、资源、路由并交出房间，最后开始监听。
//! 任一步骤失败都会中止整个序列，应用进入 `Failed` 状态且不会开始监听。

use crate::application::Application;
use crate::builtins::BuiltinMode;
use di_abstractions::{DependencyResolver, Instantiated, RegistrationKind, Shape};
use di_impl::Injector;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};
use trellis_common::{
    ApplicationError, ApplicationResult, ApplicationState, HttpMethod, LifecycleEvent,
    RequestHandler, Resource, Room, WebApplication, LOG_LEVEL_PARAMETER,
};

impl Application {
    /// 测试模式启动
    ///
    /// 数据库句柄总是回滚、键值存储先清空，只构造模块。
    pub async fn test(&mut self) -> ApplicationResult<()> {
        self.begin("test")?;
        let result = self.run_test_sequence().await;
        self.finish(result, ApplicationState::Tested)
    }

    /// 完整启动，所有构件挂载到宿主 Web 应用后开始监听
    pub async fn start(&mut self, web: &mut dyn WebApplication) -> ApplicationResult<()> {
        self.begin("start")?;
        let result = self.run_start_sequence(web).await;
        self.finish(result, ApplicationState::Running)
    }

    async fn run_test_sequence(&mut self) -> ApplicationResult<()> {
        self.emit(LifecycleEvent::Start);
        self.apply_log_level()?;

        let mut injector = self.take_injector()?;
        let result = self.build_modules(&mut injector).await;
        self.injector = Some(injector);
        result?;

        self.emit(LifecycleEvent::PostInit);
        Ok(())
    }

    async fn run_start_sequence(&mut self, web: &mut dyn WebApplication) -> ApplicationResult<()> {
        self.emit(LifecycleEvent::Start);
        self.apply_log_level()?;
        self.services.parameters.read().validate()?;

        let mut injector = self.take_injector()?;
        let result = self.build_all(&mut injector, web).await;
        self.injector = Some(injector);
        result?;

        self.emit(LifecycleEvent::PostInit);
        web.listen().await?;
        self.emit(LifecycleEvent::Listening);
        Ok(())
    }

    async fn build_modules(&self, injector: &mut Injector) -> ApplicationResult<()> {
        self.services.install(injector, BuiltinMode::Test).await?;
        self.instantiate_modules(injector).await
    }

    async fn build_all(
        &self,
        injector: &mut Injector,
        web: &mut dyn WebApplication,
    ) -> ApplicationResult<()> {
        let mode = BuiltinMode::Full {
            broadcast: web.broadcast(),
        };
        self.services.install(injector, mode).await?;
        self.instantiate_modules(injector).await?;
        self.mount_resources(injector, web).await?;
        self.mount_routes(injector, web).await?;
        self.attach_rooms(web)
    }

    /// 进入启动状态：封存注册表并创建注入器
    fn begin(&mut self, mode: &str) -> ApplicationResult<()> {
        if !self.state.is_declaring() {
            return Err(ApplicationError::lifecycle(format!(
                "应用只能启动一次，{mode} 被拒绝 (当前状态: {:?})",
                self.state
            )));
        }

        let registry = Arc::get_mut(&mut self.registry)
            .ok_or_else(|| ApplicationError::lifecycle("注册表已被共享，无法封存"))?;
        registry.seal();

        let libraries = std::mem::take(&mut self.libraries);
        self.injector =
            Some(Injector::new(self.registry.clone(), self.config.clone()).with_libraries(libraries));
        self.state = ApplicationState::Starting;
        info!(
            "应用开始启动 ({mode}): {} 个模块, {} 个资源, {} 个路由, {} 个房间",
            self.registry.len(RegistrationKind::Module),
            self.registry.len(RegistrationKind::Resource),
            self.registry.len(RegistrationKind::Route),
            self.registry.len(RegistrationKind::Room)
        );
        Ok(())
    }

    fn finish(
        &mut self,
        result: ApplicationResult<()>,
        success: ApplicationState,
    ) -> ApplicationResult<()> {
        match result {
            Ok(()) => {
                self.state = success;
                info!("应用启动完成: {:?}", success);
                Ok(())
            }
            Err(e) => {
                self.state = ApplicationState::Failed;
                error!("应用启动失败: {}", e);
                Err(e)
            }
        }
    }

    fn take_injector(&mut self) -> ApplicationResult<Injector> {
        self.injector
            .take()
            .ok_or_else(|| ApplicationError::lifecycle("注入器尚未创建"))
    }

    fn emit(&mut self, event: LifecycleEvent) {
        let delivered = self.events.emit(event);
        debug!("生命周期事件 {} 通知了 {} 个监听者", event, delivered);
    }

    /// 把 `log level` 参数应用到根日志器
    fn apply_log_level(&self) -> ApplicationResult<()> {
        let level = self.services.parameters.read().get(LOG_LEVEL_PARAMETER)?;
        match level {
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(level)) => self.services.logger.set_level_named(&level),
            Some(other) => Err(ApplicationError::illegal_value(format!(
                "日志级别必须是字符串: {other}"
            ))),
        }
    }

    /// 按注册顺序构造模块，然后等待全部就绪信号
    async fn instantiate_modules(&self, injector: &mut Injector) -> ApplicationResult<()> {
        for registration in self.registry.entries(RegistrationKind::Module) {
            injector.instantiate(registration).await?;
        }
        injector.await_pending().await?;
        info!(
            "模块构造完成: {} 个",
            self.registry.len(RegistrationKind::Module)
        );
        Ok(())
    }

    async fn mount_resources(
        &self,
        injector: &mut Injector,
        web: &mut dyn WebApplication,
    ) -> ApplicationResult<()> {
        for registration in self.registry.entries(RegistrationKind::Resource) {
            let Instantiated::Resource(resource) = injector.instantiate(registration).await? else {
                return Err(ApplicationError::illegal_value(format!(
                    "'{}' 不是资源",
                    registration.key()
                )));
            };
            let mounted = mount_resource(web, resource.as_ref())?;
            debug!("资源 {} 挂载了 {} 个处理函数", registration.key(), mounted);
        }
        Ok(())
    }

    async fn mount_routes(
        &self,
        injector: &mut Injector,
        web: &mut dyn WebApplication,
    ) -> ApplicationResult<()> {
        for registration in self.registry.entries(RegistrationKind::Route) {
            let Instantiated::Routes(routes) = injector.instantiate(registration).await? else {
                return Err(ApplicationError::illegal_value(format!(
                    "'{}' 不是路由",
                    registration.key()
                )));
            };
            routes.mount(web)?;
            debug!("路由 {} 挂载完成", registration.key());
        }
        Ok(())
    }

    fn attach_rooms(&self, web: &mut dyn WebApplication) -> ApplicationResult<()> {
        let rooms: Vec<(String, Arc<dyn Room>)> = self
            .registry
            .entries(RegistrationKind::Room)
            .iter()
            .filter_map(|registration| match registration.definition().shape() {
                Shape::Room(room) => Some((registration.key().to_string(), room.clone())),
                _ => None,
            })
            .collect();
        if rooms.is_empty() {
            return Ok(());
        }
        debug!("交出 {} 个房间", rooms.len());
        web.attach_rooms(rooms)
    }
}

/// 按资源提供的动词挂载处理函数，返回挂载数量
///
/// 集合动词挂载在基础路径，单项动词挂载在 `基础路径/:id`。
fn mount_resource(web: &mut dyn WebApplication, resource: &dyn Resource) -> ApplicationResult<usize> {
    let base = resource.base_path();
    if !base.starts_with('/') {
        return Err(ApplicationError::illegal_value(format!(
            "资源路径必须以 '/' 开头: {base}"
        )));
    }
    let trimmed = base.trim_end_matches('/');
    let collection = if trimmed.is_empty() { "/" } else { trimmed };
    let item = format!("{trimmed}/:id");

    let verbs: [(HttpMethod, &str, Option<RequestHandler>); 7] = [
        (HttpMethod::Get, collection, resource.get_all()),
        (HttpMethod::Get, item.as_str(), resource.get()),
        (HttpMethod::Post, collection, resource.post()),
        (HttpMethod::Put, item.as_str(), resource.put()),
        (HttpMethod::Put, collection, resource.put_all()),
        (HttpMethod::Delete, item.as_str(), resource.delete()),
        (HttpMethod::Delete, collection, resource.delete_all()),
    ];

    let mut mounted = 0;
    for (method, path, handler) in verbs {
        if let Some(handler) = handler {
            web.mount(method, path, handler)?;
            mounted += 1;
        }
    }
    Ok(mounted)
}
