//! 外部库目录
//!
//! 每个库在首次解析时加载一次，此后在同一应用实例内复用。

use di_abstractions::{is_builtin_name, LibraryProvider};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use trellis_common::{ApplicationError, ApplicationResult, Instance};

/// 外部库目录
#[derive(Default)]
pub struct LibraryCatalog {
    providers: HashMap<String, Arc<dyn LibraryProvider>>,
    loaded: HashMap<String, Instance>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记库提供者，重复名称返回 DuplicateEntry
    pub fn provide<P>(&mut self, name: impl Into<String>, provider: P) -> ApplicationResult<()>
    where
        P: LibraryProvider + 'static,
    {
        let name = name.into();
        if name.is_empty() || is_builtin_name(&name) {
            return Err(ApplicationError::illegal_value(format!(
                "外部库名不能为空或以内置前缀开头: '{name}'"
            )));
        }
        if self.providers.contains_key(&name) {
            return Err(ApplicationError::duplicate_entry("library", name));
        }
        self.providers.insert(name, Arc::new(provider));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// 加载库，未登记时返回 `None`
    pub fn load(&mut self, name: &str) -> ApplicationResult<Option<Instance>> {
        if let Some(instance) = self.loaded.get(name) {
            return Ok(Some(instance.clone()));
        }
        let Some(provider) = self.providers.get(name) else {
            return Ok(None);
        };

        debug!("加载外部库: {}", name);
        let instance = provider.load(name)?;
        self.loaded.insert(name.to_string(), instance.clone());
        Ok(Some(instance))
    }
}

impl fmt::Debug for LibraryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryCatalog")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("loaded", &self.loaded.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trellis_common::ErrorKind;

    #[test]
    fn test_library_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();

        let mut catalog = LibraryCatalog::new();
        catalog
            .provide("moment", move |_: &str| -> ApplicationResult<Instance> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("moment".to_string()))
            })
            .unwrap();

        let first = catalog.load("moment").unwrap().unwrap();
        let second = catalog.load("moment").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(catalog.load("lodash").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_library_rejected() {
        let mut catalog = LibraryCatalog::new();
        let provider = |_: &str| -> ApplicationResult<Instance> { Ok(Arc::new(1u8)) };
        catalog.provide("a", provider).unwrap();
        let err = catalog.provide("a", provider).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEntry);
    }

    #[test]
    fn test_reserved_library_name_rejected() {
        let mut catalog = LibraryCatalog::new();
        let provider = |_: &str| -> ApplicationResult<Instance> { Ok(Arc::new(1u8)) };
        let err = catalog.provide("$cache", provider).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalValue);
        assert!(!catalog.contains("$cache"));
    }
}
