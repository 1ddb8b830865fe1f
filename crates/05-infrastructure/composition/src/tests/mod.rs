//! 组合层测试与测试替身


use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use trellis_common::{
    handler, ApplicationResult, Broadcast, HttpMethod, Request, RequestHandler, Resource,
    Response, Room, Routes, WebApplication,
};

/// 共享的调用记录
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

/// 记录挂载与监听的宿主应用
#[derive(Default)]
pub(crate) struct RecordingWeb {
    pub(crate) mounts: Vec<String>,
    pub(crate) rooms: Vec<String>,
    pub(crate) listened: bool,
    pub(crate) broadcast: Option<Arc<dyn Broadcast>>,
}

#[async_trait]
impl WebApplication for RecordingWeb {
    fn mount(
        &mut self,
        method: HttpMethod,
        path: &str,
        _handler: RequestHandler,
    ) -> ApplicationResult<()> {
        self.mounts.push(format!("{method} {path}"));
        Ok(())
    }

    fn attach_rooms(&mut self, rooms: Vec<(String, Arc<dyn Room>)>) -> ApplicationResult<()> {
        self.rooms.extend(rooms.into_iter().map(|(key, _)| key));
        Ok(())
    }

    fn broadcast(&self) -> Option<Arc<dyn Broadcast>> {
        self.broadcast.clone()
    }

    async fn listen(&mut self) -> ApplicationResult<()> {
        self.listened = true;
        Ok(())
    }
}

/// 记录广播内容
#[derive(Default)]
pub(crate) struct RecordingBroadcast {
    pub(crate) sent: Mutex<Vec<(String, String, Value)>>,
}

impl Broadcast for RecordingBroadcast {
    fn emit(&self, room: &str, event: &str, payload: Value) -> ApplicationResult<()> {
        self.sent
            .lock()
            .push((room.to_string(), event.to_string(), payload));
        Ok(())
    }
}

pub(crate) struct UsersResource {
    pub(crate) base: String,
}

impl Resource for UsersResource {
    fn base_path(&self) -> &str {
        &self.base
    }

    fn get_all(&self) -> Option<RequestHandler> {
        Some(handler(|_request: Request| async { Ok(Response::ok(json!([]))) }))
    }

    fn get(&self) -> Option<RequestHandler> {
        Some(handler(|request: Request| async move {
            Ok(Response::ok(json!({ "id": request.params.get("id") })))
        }))
    }

    fn delete(&self) -> Option<RequestHandler> {
        Some(handler(|_request: Request| async { Ok(Response::status(204)) }))
    }
}

pub(crate) struct HealthRoutes;

impl Routes for HealthRoutes {
    fn mount(&self, app: &mut dyn WebApplication) -> ApplicationResult<()> {
        app.mount(
            HttpMethod::Get,
            "/health",
            handler(|_request: Request| async { Ok(Response::ok(json!("ok"))) }),
        )
    }
}

pub(crate) struct Lobby;

impl Room for Lobby {
    fn can_join(&self, _channel: &str, user: Option<&str>) -> bool {
        user.is_some()
    }
}
