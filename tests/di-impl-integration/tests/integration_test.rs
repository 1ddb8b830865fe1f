//! 跨 crate 集成测试：声明、注册、解析与两种启动序列

use async_trait::async_trait;
use di_abstractions::{Definition, RegistrationKind};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use trellis_common::{
    ApplicationResult, ErrorKind, HttpMethod, RequestHandler, Resource, Routes, WebApplication,
};
use trellis_composition::{Application, ApplicationBuilder};

type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct NullWeb {
    listened: bool,
}

#[async_trait]
impl WebApplication for NullWeb {
    fn mount(
        &mut self,
        _method: HttpMethod,
        _path: &str,
        _handler: RequestHandler,
    ) -> ApplicationResult<()> {
        Ok(())
    }

    async fn listen(&mut self) -> ApplicationResult<()> {
        self.listened = true;
        Ok(())
    }
}

struct PlainResource(String);

impl Resource for PlainResource {
    fn base_path(&self) -> &str {
        &self.0
    }
}

struct NoRoutes;

impl Routes for NoRoutes {
    fn mount(&self, _app: &mut dyn WebApplication) -> ApplicationResult<()> {
        Ok(())
    }
}

fn record(journal: &Journal, entry: String) {
    journal.lock().unwrap().push(entry);
}

#[test]
fn test_declarations_compose_in_order() -> anyhow::Result<()> {
    let mut app = Application::new();
    let service = Definition::module("service", |_| Ok(()));

    app.inject(&service, ["a", "b"])?.inject(&service, ["c"])?;
    assert_eq!(app.dependencies_of(&service)?, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_invalid_declarations() {
    let mut app = Application::new();
    let service = Definition::module("service", |_| Ok(()));

    let err = app
        .inject(&service, Vec::<&str>::new())
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = app
        .inject(&service, [serde_json::json!("a"), serde_json::json!(42)])
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::IllegalValue);
    assert!(app.dependencies_of(&service).unwrap().is_empty());
}

#[tokio::test]
async fn test_singleton_shared_between_dependents() -> anyhow::Result<()> {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();

    let mut app = Application::new();
    let a = Definition::module("A", move |_| Ok(counter.fetch_add(1, Ordering::SeqCst)));
    let b = Definition::module("B", |deps| deps.get::<usize>(0));
    app.inject(&b, ["A"])?;
    app.module("A", a)?.module("B", b)?;

    app.test().await?;
    let first = app.resolve::<Arc<usize>>("B").await?;
    let second = app.resolve::<Arc<usize>>("B").await?;
    let a = app.resolve::<usize>("A").await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&*first, &a));
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_mutual_dependency_is_circular() -> anyhow::Result<()> {
    for entry in ["A", "B"] {
        let mut app = Application::new();
        let a = Definition::module("A", |_| Ok(()));
        let b = Definition::module("B", |_| Ok(()));
        app.inject(&a, ["B"])?.inject(&b, ["A"])?;
        // 注册顺序决定从哪一侧开始解析
        if entry == "A" {
            app.module("A", a)?.module("B", b)?;
        } else {
            app.module("B", b)?.module("A", a)?;
        }

        let err = app.test().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
        assert!(err.to_string().contains("->"));
    }
    Ok(())
}

#[test]
fn test_register_tree_skips_dotfiles() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("a.json"), r#"{"factory": "plain"}"#)?;
    fs::write(dir.path().join("b.json"), r#"{"factory": "plain"}"#)?;
    fs::write(dir.path().join(".eslintrc.json"), r#"{"factory": "plain"}"#)?;

    let plain = Definition::resource("plain", |_| Ok(PlainResource("/plain".to_string())));
    let mut app = ApplicationBuilder::new()
        .with_definition("plain", plain)?
        .build()?;

    assert_eq!(app.register_tree(RegistrationKind::Resource, dir.path())?, 2);
    assert_eq!(
        app.registered(RegistrationKind::Resource),
        vec!["a.json", "b.json"]
    );

    let err = app
        .register_tree(RegistrationKind::Resource, dir.path().join("a.json"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalValue);
    Ok(())
}

#[test]
fn test_duplicate_key_rejected() -> anyhow::Result<()> {
    let mut app = Application::new();
    app.module("x", Definition::module("x", |_| Ok(1u8)))?;

    let err = app
        .module("x", Definition::module("x", |_| Ok(2u8)))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::DuplicateEntry);

    // 不同类型的命名空间互不冲突
    app.resource(
        "x",
        Definition::resource("x", |_| Ok(PlainResource("/x".to_string()))),
    )?;
    Ok(())
}

fn journaled_app(journal: &Journal) -> anyhow::Result<Application> {
    let mut app = Application::new();
    for key in ["m1", "m2"] {
        let journal = journal.clone();
        app.module(
            key,
            Definition::module(key, move |_| {
                record(&journal, format!("module:{key}"));
                Ok(())
            }),
        )?;
    }
    let resource_journal = journal.clone();
    app.resource(
        "r1",
        Definition::resource("r1", move |_| {
            record(&resource_journal, "resource:r1".to_string());
            Ok(PlainResource("/r1".to_string()))
        }),
    )?;
    let route_journal = journal.clone();
    app.route(
        "t1",
        Definition::routes("t1", move |_| {
            record(&route_journal, "route:t1".to_string());
            Ok(NoRoutes)
        }),
    )?;
    Ok(app)
}

#[tokio::test]
async fn test_test_mode_builds_modules_only() -> anyhow::Result<()> {
    let journal: Journal = Arc::default();
    let mut app = journaled_app(&journal)?;

    app.test().await?;
    assert_eq!(*journal.lock().unwrap(), vec!["module:m1", "module:m2"]);
    Ok(())
}

#[tokio::test]
async fn test_full_start_builds_each_kind_once_in_order() -> anyhow::Result<()> {
    let journal: Journal = Arc::default();
    let mut app = journaled_app(&journal)?;
    let mut web = NullWeb::default();

    app.start(&mut web).await?;
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["module:m1", "module:m2", "resource:r1", "route:t1"]
    );
    assert!(web.listened);
    Ok(())
}
