use crate::domain::model::ModuleLabel;
use crate::domain::module::{ClassRef, Module};
use crate::domain::ports::{AppRegistry, ClassLoader, ModuleSource};
use crate::utils::error::{RealzError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_MODULE_PREFIX: &str = "realzhub.apps";
pub const DEFAULT_CLASS_LOADER: &str = "default";

/// 預設的類別解析策略
///
/// Looks the class up in the base package (`{prefix}.{label}`) and, when the
/// app registered for the label's first segment lives outside the prefix, in
/// the local package as well. Classes from the local package win.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassLoader;

impl ClassLoader for DefaultClassLoader {
    fn load(
        &self,
        modules: &dyn ModuleSource,
        apps: &dyn AppRegistry,
        module_label: &str,
        classnames: &[&str],
        module_prefix: &str,
    ) -> Result<Vec<ClassRef>> {
        let label = ModuleLabel::parse(module_label)?;

        // 先從 realzhub 套件匯入，例如 realzhub.apps.users.forms
        let base_path = format!("{}.{}", module_prefix, label);
        let base_module = modules.import_module(&base_path).into_result()?;

        // 例如 realzhub.apps.users 或 myproject.users，取決於 installed_apps
        let app_name = find_registered_app_name(apps, &label)?;
        let local_module = if app_name.starts_with(&format!("{}.", module_prefix)) {
            None
        } else {
            let local_path = app_name
                .split('.')
                .chain(label.submodule_segments())
                .collect::<Vec<_>>()
                .join(".");
            tracing::debug!("Looking for local override module '{}'", local_path);
            modules.import_module(&local_path).into_result()?
        };

        if base_module.is_none() && local_module.is_none() {
            return Err(RealzError::ModuleResolutionError {
                label: label.to_string(),
            });
        }

        pluck_classes(&[local_module, base_module], classnames)
    }
}

/// 依序在模組中尋找每個類別，第一個有此類別的模組勝出
pub fn pluck_classes(modules: &[Option<Arc<Module>>], classnames: &[&str]) -> Result<Vec<ClassRef>> {
    classnames
        .iter()
        .map(|classname| {
            modules
                .iter()
                .flatten()
                .find_map(|module| module.get(classname).cloned())
                .ok_or_else(|| RealzError::ClassNotFoundError {
                    class_name: classname.to_string(),
                    searched: modules
                        .iter()
                        .flatten()
                        .map(|module| module.name().to_string())
                        .collect(),
                })
        })
        .collect()
}

fn find_registered_app_name(apps: &dyn AppRegistry, label: &ModuleLabel) -> Result<String> {
    let app_label = label.app_label();
    match apps.get_app_config(app_label) {
        None => Err(RealzError::AppNotFoundError {
            label: label.to_string(),
            reason: "an app".to_string(),
        }),
        Some(entry) if !entry.core => Err(RealzError::AppNotFoundError {
            label: label.to_string(),
            reason: "a realzhub app".to_string(),
        }),
        Some(entry) => Ok(entry.name),
    }
}

/// 以名稱登記的類別解析策略 (對應設定中的 dynamic_class_loader)
#[derive(Clone)]
pub struct ClassLoaderRegistry {
    loaders: HashMap<String, Arc<dyn ClassLoader>>,
}

impl ClassLoaderRegistry {
    pub fn new() -> Self {
        let mut loaders: HashMap<String, Arc<dyn ClassLoader>> = HashMap::new();
        loaders.insert(DEFAULT_CLASS_LOADER.to_string(), Arc::new(DefaultClassLoader));
        Self { loaders }
    }

    pub fn register<L: ClassLoader + 'static>(&mut self, name: &str, loader: L) -> &mut Self {
        self.loaders.insert(name.to_string(), Arc::new(loader));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ClassLoader>> {
        self.loaders
            .get(name)
            .cloned()
            .ok_or_else(|| RealzError::UnknownClassLoader {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }
}

impl Default for ClassLoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves classes by module label using the configured strategy.
///
/// The strategy is picked once when the loader is built and reused for every
/// lookup.
#[derive(Clone)]
pub struct Loader {
    modules: Arc<dyn ModuleSource>,
    apps: Arc<dyn AppRegistry>,
    strategy: Arc<dyn ClassLoader>,
    module_prefix: String,
}

impl Loader {
    pub fn new(
        modules: Arc<dyn ModuleSource>,
        apps: Arc<dyn AppRegistry>,
        strategy: Arc<dyn ClassLoader>,
    ) -> Self {
        Self {
            modules,
            apps,
            strategy,
            module_prefix: DEFAULT_MODULE_PREFIX.to_string(),
        }
    }

    pub fn with_module_prefix(mut self, module_prefix: &str) -> Self {
        self.module_prefix = module_prefix.to_string();
        self
    }

    pub fn module_prefix(&self) -> &str {
        &self.module_prefix
    }

    pub fn modules(&self) -> &dyn ModuleSource {
        self.modules.as_ref()
    }

    /// 取得單一類別
    pub fn get_class(&self, module_label: &str, classname: &str) -> Result<ClassRef> {
        let mut classes = self.get_classes(module_label, &[classname])?;
        // get_classes 保證數量與要求的名稱相同
        classes.pop().ok_or_else(|| RealzError::ClassNotFoundError {
            class_name: classname.to_string(),
            searched: vec![module_label.to_string()],
        })
    }

    /// 取得單一類別並轉型
    pub fn get_class_as<T: Any + Send + Sync>(
        &self,
        module_label: &str,
        classname: &str,
    ) -> Result<Arc<T>> {
        self.get_class(module_label, classname)?.downcast::<T>()
    }

    pub fn get_classes(&self, module_label: &str, classnames: &[&str]) -> Result<Vec<ClassRef>> {
        let prefix = self.module_prefix.clone();
        self.get_classes_with_prefix(module_label, classnames, &prefix)
    }

    pub fn get_classes_with_prefix(
        &self,
        module_label: &str,
        classnames: &[&str],
        module_prefix: &str,
    ) -> Result<Vec<ClassRef>> {
        let classes = self.strategy.load(
            self.modules.as_ref(),
            self.apps.as_ref(),
            module_label,
            classnames,
            module_prefix,
        )?;

        // 自訂策略可能少回傳類別，回報第一個缺少的名稱
        if classes.len() != classnames.len() {
            let missing = classnames
                .iter()
                .find(|name| !classes.iter().any(|class| class.name() == **name))
                .or_else(|| classnames.last())
                .copied()
                .unwrap_or_default();
            return Err(RealzError::ClassNotFoundError {
                class_name: missing.to_string(),
                searched: vec![module_label.to_string()],
            });
        }

        for class in &classes {
            tracing::debug!(
                "Resolved {}:{} from '{}'",
                module_label,
                class.name(),
                class.module()
            );
        }
        Ok(classes)
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("module_prefix", &self.module_prefix)
            .finish_non_exhaustive()
    }
}
