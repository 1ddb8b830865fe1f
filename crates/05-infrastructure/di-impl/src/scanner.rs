//! 目录扫描与定义清单加载

use di_abstractions::{Definition, DefinitionLoader, LoadedDefinition, ScanOptions};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use trellis_common::{ApplicationError, ApplicationResult};
use walkdir::{DirEntry, WalkDir};

/// 扫描发现的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// 相对扫描根目录的注册键，使用 `/` 分隔
    pub key: String,
    pub path: PathBuf,
}

/// 扫描并加载完成的定义
#[derive(Debug, Clone)]
pub struct ScannedDefinition {
    pub key: String,
    pub loaded: LoadedDefinition,
}

/// 目录扫描器
pub struct DirectoryScanner {
    loader: Arc<dyn DefinitionLoader>,
    options: ScanOptions,
}

impl DirectoryScanner {
    pub fn new(loader: Arc<dyn DefinitionLoader>) -> Self {
        Self {
            loader,
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn loader(&self) -> &dyn DefinitionLoader {
        self.loader.as_ref()
    }

    /// 递归枚举可加载的文件，按注册键的字典序排列
    pub fn discover(&self, base: &Path) -> ApplicationResult<Vec<DiscoveredFile>> {
        if !base.exists() {
            return Err(ApplicationError::illegal_value(format!(
                "扫描路径不存在: {}",
                base.display()
            )));
        }
        if !base.is_dir() {
            return Err(ApplicationError::illegal_value(format!(
                "扫描路径不是目录: {}",
                base.display()
            )));
        }

        let mut walker = WalkDir::new(base)
            .follow_links(self.options.follow_links)
            .min_depth(1);
        if let Some(depth) = self.options.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.options.include_hidden;
        let mut files = Vec::new();
        for entry in walker
            .into_iter()
            .filter_entry(|entry| include_hidden || !is_hidden(entry))
        {
            let entry = entry.map_err(|e| {
                ApplicationError::illegal_value(format!("遍历目录失败: {e}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !self.loader.supports(entry.path()) {
                debug!("跳过无法识别的文件: {}", entry.path().display());
                continue;
            }
            files.push(DiscoveredFile {
                key: relative_key(base, entry.path())?,
                path: entry.path().to_path_buf(),
            });
        }

        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    /// 枚举并加载全部定义
    pub fn scan(&self, base: &Path) -> ApplicationResult<Vec<ScannedDefinition>> {
        let files = self.discover(base)?;
        info!(
            "扫描目录 {}，发现 {} 个定义 (加载器: {})",
            base.display(),
            files.len(),
            self.loader.name()
        );
        files
            .into_iter()
            .map(|file| {
                let loaded = self.loader.load(&file.path)?;
                Ok(ScannedDefinition {
                    key: file.key,
                    loaded,
                })
            })
            .collect()
    }
}

/// 根目录本身不参与隐藏判断，临时目录名常以 `.` 开头
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn relative_key(base: &Path, path: &Path) -> ApplicationResult<String> {
    let relative = path.strip_prefix(base).map_err(|e| {
        ApplicationError::illegal_value(format!("无法计算相对路径 {}: {e}", path.display()))
    })?;
    let parts = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .map(|part| {
            part.to_str().ok_or_else(|| {
                ApplicationError::illegal_value(format!(
                    "文件名不是合法的 UTF-8: {}",
                    path.display()
                ))
            })
        })
        .collect::<ApplicationResult<Vec<&str>>>()?;
    Ok(parts.join("/"))
}

/// 可被清单引用的定义目录
#[derive(Debug, Default, Clone)]
pub struct DefinitionCatalog {
    entries: HashMap<String, Definition>,
}

impl DefinitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以名称登记定义，重复名称返回 DuplicateEntry
    pub fn insert(&mut self, name: impl Into<String>, definition: Definition) -> ApplicationResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ApplicationError::duplicate_entry("factory", name));
        }
        self.entries.insert(name, definition);
        Ok(())
    }

    pub fn with(mut self, name: impl Into<String>, definition: Definition) -> ApplicationResult<Self> {
        self.insert(name, definition)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.entries.get(name)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    factory: String,
    #[serde(default)]
    inject: Option<Value>,
}

/// 定义清单加载器
///
/// 清单是 TOML 或 JSON 文件，`factory` 指向目录中的定义，`inject` 声明依赖。
/// 每个文件得到一份独立标识的定义副本。
pub struct ManifestLoader {
    catalog: Arc<DefinitionCatalog>,
}

impl ManifestLoader {
    pub fn new(catalog: Arc<DefinitionCatalog>) -> Self {
        Self { catalog }
    }

    fn parse(path: &Path, content: &str) -> ApplicationResult<Manifest> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        let parsed: Result<Manifest, String> = match extension.as_deref() {
            Some("toml") => toml::from_str(content).map_err(|e| e.to_string()),
            Some("json") => serde_json::from_str(content).map_err(|e| e.to_string()),
            _ => Err("不支持的清单格式".to_string()),
        };
        parsed.map_err(|message| {
            ApplicationError::illegal_value(format!("清单解析失败 {}: {message}", path.display()))
        })
    }
}

impl DefinitionLoader for ManifestLoader {
    fn name(&self) -> &str {
        "manifest"
    }

    fn extensions(&self) -> &[&str] {
        &["toml", "json"]
    }

    fn load(&self, path: &Path) -> ApplicationResult<LoadedDefinition> {
        let content = fs::read_to_string(path).map_err(|e| {
            ApplicationError::illegal_value(format!("读取清单失败 {}: {e}", path.display()))
        })?;
        let manifest = Self::parse(path, &content)?;
        let definition = self.catalog.get(&manifest.factory).ok_or_else(|| {
            ApplicationError::not_found(format!(
                "清单 {} 引用了未登记的定义: {}",
                path.display(),
                manifest.factory
            ))
        })?;

        let loaded = LoadedDefinition::new(definition.fork());
        Ok(match manifest.inject {
            Some(inject) => loaded.with_inject(inject),
            None => loaded,
        })
    }
}
