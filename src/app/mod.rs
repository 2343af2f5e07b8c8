pub mod site;
pub mod users;

use crate::app::site::RealzHub;
use crate::app::users::admin::UserAdmin;
use crate::app::users::UsersConfig;
use crate::config::Settings;
use crate::core::application::Application;
use crate::core::loading::{ClassLoaderRegistry, Loader};
use crate::core::modules::ModuleRegistry;
use crate::core::registry::InstalledApps;
use crate::core::urls::{find_by_name, reverse, Request, Response, UrlPattern};
use crate::domain::model::PermissionSpec;
use crate::domain::module::ModuleBuilder;
use crate::domain::ports::ClassLoader;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 組裝專案：設定、基礎模組、本地覆寫模組與類別解析策略
pub struct ProjectBuilder {
    settings: Settings,
    modules: ModuleRegistry,
    class_loaders: ClassLoaderRegistry,
}

impl ProjectBuilder {
    pub fn new(settings: Settings) -> Self {
        let mut modules = ModuleRegistry::new();
        users::register_modules(&mut modules);

        Self {
            settings,
            modules,
            class_loaders: ClassLoaderRegistry::new(),
        }
    }

    /// 登記本地模組 (例如 myproject.users.views) 以覆寫基礎類別
    pub fn module<F>(mut self, path: &str, initializer: F) -> Self
    where
        F: Fn(&mut ModuleBuilder<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.modules.register(path, initializer);
        self
    }

    pub fn class_loader<L: ClassLoader + 'static>(mut self, name: &str, loader: L) -> Self {
        self.class_loaders.register(name, loader);
        self
    }

    pub fn build(self) -> Result<Project> {
        self.settings.validate()?;

        let apps = InstalledApps::from_entries(self.settings.installed_apps.iter().cloned())?;
        let strategy = self
            .class_loaders
            .resolve(&self.settings.dynamic_class_loader)?;
        let loader = Loader::new(Arc::new(self.modules), Arc::new(apps), strategy)
            .with_module_prefix(&self.settings.module_prefix);

        let users_app = UsersConfig::new(&self.settings)?;
        let mut site = RealzHub::new(&self.settings, users_app)?;
        site.ready(&loader)?;

        let admin = UserAdmin::new(&loader)?;
        let urlpatterns = site.urls()?.patterns;

        tracing::info!(
            "Project ready with {} top-level URL patterns (class loader: {})",
            urlpatterns.len(),
            self.settings.dynamic_class_loader
        );

        Ok(Project {
            settings: self.settings,
            loader,
            site,
            admin,
            urlpatterns,
        })
    }
}

/// 一條 URL 的摘要 (供 CLI 顯示)
#[derive(Debug, Clone, PartialEq)]
pub struct UrlSummary {
    pub name: Option<String>,
    pub route: String,
    /// Guards wrapping the view, innermost first. Every one must pass.
    pub permissions: Vec<PermissionSpec>,
}

pub struct Project {
    settings: Settings,
    loader: Loader,
    site: RealzHub,
    admin: UserAdmin,
    urlpatterns: Vec<UrlPattern>,
}

impl Project {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn site(&self) -> &RealzHub {
        &self.site
    }

    pub fn admin(&self) -> &UserAdmin {
        &self.admin
    }

    pub fn urlpatterns(&self) -> &[UrlPattern] {
        &self.urlpatterns
    }

    /// 以 URL 名稱 (例如 `users:detail`) 呼叫對應的視圖
    pub fn dispatch(&self, name: &str, request: &Request) -> Result<Response> {
        let resolved = find_by_name(&self.urlpatterns, name)?;
        tracing::debug!("Dispatching {} ({})", resolved.name, resolved.route);
        (resolved.endpoint.callback)(request)
    }

    pub fn reverse(&self, name: &str, kwargs: &BTreeMap<String, String>) -> Result<String> {
        reverse(&self.urlpatterns, name, kwargs)
    }

    /// 每條 URL 以及實際包住它的所有存取檢查 (各 app 的檢查都會列出)
    pub fn describe_urls(&self) -> Vec<UrlSummary> {
        let mut summaries = Vec::new();
        for pattern in &self.urlpatterns {
            pattern.walk(&[], "/", &mut |name, route, endpoint| {
                summaries.push(UrlSummary {
                    name,
                    route,
                    permissions: endpoint.guards.clone(),
                });
            });
        }
        summaries
    }
}
