//! 分层参数来源
//!
//! 后添加的层覆盖先添加的层。参数名中的 `_` 统一映射为空格，
//! 因此环境变量 `APP_LOG_LEVEL` 与文件中的 `"log level"` 指向同一个参数。

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config_abstractions::ParameterSource;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use trellis_common::{ConfigError, ConfigResult};

#[derive(Debug, Clone)]
enum Layer {
    File { path: PathBuf, format: FileFormat },
    Environment { prefix: String },
}

/// 分层参数来源
#[derive(Debug, Clone)]
pub struct LayeredParameterSource {
    name: String,
    layers: Vec<Layer>,
}

impl LayeredParameterSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
        }
    }

    /// 添加 TOML 文件层，文件不存在时返回 FileNotFound
    pub fn add_toml(self, path: impl AsRef<Path>) -> ConfigResult<Self> {
        self.add_file(path.as_ref(), FileFormat::Toml)
    }

    /// 添加 JSON 文件层
    pub fn add_json(self, path: impl AsRef<Path>) -> ConfigResult<Self> {
        self.add_file(path.as_ref(), FileFormat::Json)
    }

    /// 添加环境变量层，只读取带 `prefix_` 前缀的变量
    pub fn add_env(mut self, prefix: impl Into<String>) -> Self {
        self.layers.push(Layer::Environment {
            prefix: prefix.into(),
        });
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn add_file(mut self, path: &Path, format: FileFormat) -> ConfigResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        self.layers.push(Layer::File {
            path: path.to_path_buf(),
            format,
        });
        Ok(self)
    }

    fn builder(&self) -> ConfigBuilder<DefaultState> {
        self.layers
            .iter()
            .fold(Config::builder(), |builder, layer| match layer {
                Layer::File { path, format } => {
                    builder.add_source(File::from(path.as_path()).format(*format))
                }
                Layer::Environment { prefix } => {
                    builder.add_source(Environment::with_prefix(prefix))
                }
            })
    }
}

impl ParameterSource for LayeredParameterSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> ConfigResult<BTreeMap<String, Value>> {
        debug!("加载参数来源 {} ({} 层)", self.name, self.layers.len());

        let settings = self.builder().build().map_err(|e| {
            error!("参数来源 {} 构建失败: {}", self.name, e);
            ConfigError::ParseError {
                message: e.to_string(),
            }
        })?;
        let values: HashMap<String, Value> =
            settings
                .try_deserialize()
                .map_err(|e| ConfigError::TypeConversionError {
                    message: e.to_string(),
                })?;

        Ok(values
            .into_iter()
            .map(|(key, value)| (parameter_name(&key), value))
            .collect())
    }
}

fn parameter_name(key: &str) -> String {
    key.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_later_layers_override_earlier() {
        let dir = TempDir::new().unwrap();
        let toml_path = dir.path().join("app.toml");
        fs::write(&toml_path, "\"log level\" = \"info\"\nport = 8080\n").unwrap();
        let json_path = dir.path().join("local.json");
        fs::write(&json_path, r#"{"port": 9090, "db_url": "memory"}"#).unwrap();

        let source = LayeredParameterSource::new("app")
            .add_toml(&toml_path)
            .unwrap()
            .add_json(&json_path)
            .unwrap();
        let values = source.load().unwrap();

        assert_eq!(values.get("log level"), Some(&json!("info")));
        assert_eq!(values.get("port"), Some(&json!(9090)));
        assert_eq!(values.get("db url"), Some(&json!("memory")));
    }

    #[test]
    fn test_environment_layer() {
        std::env::set_var("TRELLISLAYERTEST_LOG_LEVEL", "warn");
        let source = LayeredParameterSource::new("env").add_env("TRELLISLAYERTEST");
        let values = source.load().unwrap();
        std::env::remove_var("TRELLISLAYERTEST_LOG_LEVEL");

        assert_eq!(values.get("log level"), Some(&json!("warn")));
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = TempDir::new().unwrap();
        let err = LayeredParameterSource::new("app")
            .add_toml(dir.path().join("missing.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_malformed_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "port = ").unwrap();

        let source = LayeredParameterSource::new("broken").add_toml(&path).unwrap();
        assert!(matches!(
            source.load().unwrap_err(),
            ConfigError::ParseError { .. }
        ));
    }
}
