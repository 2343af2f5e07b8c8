use crate::domain::model::AppRegistryEntry;
use crate::domain::module::{ClassRef, ImportOutcome};
use crate::utils::error::Result;

/// 模組來源：以路徑匯入已登記的模組
pub trait ModuleSource: Send + Sync {
    /// 是否有此模組 (不執行初始化)
    fn contains(&self, path: &str) -> bool;

    fn import_module(&self, path: &str) -> ImportOutcome;
}

/// 外部的 app registry (唯讀)
pub trait AppRegistry: Send + Sync {
    fn get_app_config(&self, label: &str) -> Option<AppRegistryEntry>;
}

/// 類別解析策略，可透過設定替換
pub trait ClassLoader: Send + Sync {
    fn load(
        &self,
        modules: &dyn ModuleSource,
        apps: &dyn AppRegistry,
        module_label: &str,
        classnames: &[&str],
        module_prefix: &str,
    ) -> Result<Vec<ClassRef>>;
}
