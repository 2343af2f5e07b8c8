use crate::domain::module::{ImportOutcome, Module, ModuleBuilder};
use crate::domain::ports::ModuleSource;
use crate::utils::error::{RealzError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

/// 模組初始化函式：在第一次匯入時執行，登記模組內的類別
pub type ModuleInitializer = Arc<dyn Fn(&mut ModuleBuilder<'_>) -> Result<()> + Send + Sync>;

/// Registry of importable modules.
///
/// A module is registered with an initializer and initialized lazily on its
/// first import. Initialized modules are cached, so every import of the same
/// path returns the same `Module` and the initializer runs once. A failed
/// initialization is not cached and is reported on every import.
#[derive(Default)]
pub struct ModuleRegistry {
    initializers: HashMap<String, ModuleInitializer>,
    loaded: Mutex<HashMap<String, Arc<Module>>>,
    loading: Mutex<HashSet<(String, ThreadId)>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登記模組；同名模組會被覆蓋
    pub fn register<F>(&mut self, path: &str, initializer: F) -> &mut Self
    where
        F: Fn(&mut ModuleBuilder<'_>) -> Result<()> + Send + Sync + 'static,
    {
        if self
            .initializers
            .insert(path.to_string(), Arc::new(initializer))
            .is_some()
        {
            tracing::warn!("Module '{}' registered twice, keeping the last one", path);
        }
        self
    }

    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.initializers.keys().map(String::as_str)
    }

    /// 已初始化的模組數量
    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().map(|loaded| loaded.len()).unwrap_or(0)
    }

    fn cached(&self, path: &str) -> Option<Arc<Module>> {
        self.loaded.lock().ok()?.get(path).cloned()
    }

    fn initialize(&self, path: &str, initializer: &ModuleInitializer) -> ImportOutcome {
        let key = (path.to_string(), thread::current().id());

        // 同一執行緒重複進入同一個模組即為循環匯入
        let entered = match self.loading.lock() {
            Ok(mut loading) => loading.insert(key.clone()),
            Err(_) => false,
        };
        if !entered {
            return ImportOutcome::FailedDuringLoad(RealzError::ModuleLoadError {
                module: path.to_string(),
                source: Box::new(RealzError::ImproperlyConfigured {
                    message: format!("circular import of '{}'", path),
                }),
            });
        }

        tracing::debug!("Initializing module '{}'", path);
        let mut builder = ModuleBuilder::new(path, self);
        let result = initializer(&mut builder);

        if let Ok(mut loading) = self.loading.lock() {
            loading.remove(&key);
        }

        match result {
            Ok(()) => {
                let module = Arc::new(builder.build());
                match self.loaded.lock() {
                    // 並行初始化時保留第一個存入的模組
                    Ok(mut loaded) => ImportOutcome::Found(Arc::clone(
                        loaded.entry(path.to_string()).or_insert(module),
                    )),
                    Err(_) => ImportOutcome::Found(module),
                }
            }
            Err(err) => {
                tracing::debug!("Module '{}' failed during load: {}", path, err);
                ImportOutcome::FailedDuringLoad(RealzError::ModuleLoadError {
                    module: path.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }
}

impl ModuleSource for ModuleRegistry {
    fn contains(&self, path: &str) -> bool {
        self.initializers.contains_key(path)
    }

    fn import_module(&self, path: &str) -> ImportOutcome {
        if let Some(module) = self.cached(path) {
            return ImportOutcome::Found(module);
        }

        match self.initializers.get(path) {
            Some(initializer) => {
                let initializer = Arc::clone(initializer);
                self.initialize(path, &initializer)
            }
            None => ImportOutcome::NotFound,
        }
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut paths: Vec<&str> = self.module_paths().collect();
        paths.sort_unstable();
        f.debug_struct("ModuleRegistry")
            .field("modules", &paths)
            .finish()
    }
}
