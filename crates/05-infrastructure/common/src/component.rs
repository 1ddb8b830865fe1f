//! 可注册构件的能力接口：资源、路由与房间

use crate::errors::ApplicationResult;
use crate::hosting::WebApplication;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 解析得到的实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Put => f.write_str("PUT"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// 请求
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub path: String,
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// 响应
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: None }
    }
}

/// 请求处理函数
pub type RequestHandler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, ApplicationResult<Response>> + Send + Sync>;

/// 把异步函数包装成处理函数
pub fn handler<F, Fut>(f: F) -> RequestHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApplicationResult<Response>> + Send + 'static,
{
    Arc::new(
        move |request: Request| -> BoxFuture<'static, ApplicationResult<Response>> {
            Box::pin(f(request))
        },
    )
}

/// REST 资源
///
/// 资源按需实现各个动词；返回 `None` 的动词不会被挂载。
/// 集合动词挂载在 `base_path`，条目动词挂载在 `base_path/:id`。
pub trait Resource: Send + Sync {
    /// 资源根路径，必须以 `/` 开头
    fn base_path(&self) -> &str;

    fn get_all(&self) -> Option<RequestHandler> {
        None
    }

    fn get(&self) -> Option<RequestHandler> {
        None
    }

    fn post(&self) -> Option<RequestHandler> {
        None
    }

    fn put(&self) -> Option<RequestHandler> {
        None
    }

    fn put_all(&self) -> Option<RequestHandler> {
        None
    }

    fn delete(&self) -> Option<RequestHandler> {
        None
    }

    fn delete_all(&self) -> Option<RequestHandler> {
        None
    }
}

/// 自由路由集合，自行向宿主应用挂载处理函数
pub trait Routes: Send + Sync {
    fn mount(&self, app: &mut dyn WebApplication) -> ApplicationResult<()>;
}

/// 实时房间的成员授权
pub trait Room: Send + Sync {
    /// 用户是否可以加入给定频道
    fn can_join(&self, channel: &str, user: Option<&str>) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_handler_wraps_async_fn() {
        let get_user = handler(|request: Request| async move {
            let id = request.params.get("id").cloned().unwrap_or_default();
            Ok(Response::ok(json!({ "id": id })))
        });

        let response = get_user(Request::new("/users/7").with_param("id", "7"))
            .await
            .unwrap();
        assert_eq!(response, Response::ok(json!({ "id": "7" })));
    }
}
