pub mod admin;
pub mod forms;
pub mod views;

use crate::config::Settings;
use crate::core::application::{AppConfig, Application};
use crate::core::loading::Loader;
use crate::core::modules::ModuleRegistry;
use crate::core::urls::{path, UrlPattern, ViewFn};
use crate::core::views::ViewClass;
use crate::domain::model::PermissionSpec;
use crate::utils::error::{RealzError, Result};

pub const LABEL: &str = "users";

/// 登記 users app 的基礎模組
pub fn register_modules(registry: &mut ModuleRegistry) {
    views::register(registry);
    forms::register(registry);
}

struct UserViews {
    redirect: ViewFn,
    update: ViewFn,
    detail: ViewFn,
}

/// Users app. Every view requires a logged-in principal unless the settings
/// override its permissions.
pub struct UsersConfig {
    config: AppConfig,
    views: Option<UserViews>,
}

impl UsersConfig {
    pub fn new(settings: &Settings) -> Result<Self> {
        let name = settings
            .installed_app(LABEL)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| format!("{}.{}", settings.module_prefix, LABEL));

        // 預設所有視圖都需要登入，設定檔可覆寫
        let login_required = PermissionSpec::all(["is_authenticated"]);
        let builder = AppConfig::builder(&name, LABEL)
            .verbose_name("Users")
            .permission("redirect", login_required.clone())
            .permission("update", login_required.clone())
            .permission("detail", login_required);

        Ok(Self {
            config: settings.configure_app(LABEL, builder).build()?,
            views: None,
        })
    }
}

impl Application for UsersConfig {
    fn app_config(&self) -> &AppConfig {
        &self.config
    }

    fn ready(&mut self, loader: &Loader) -> Result<()> {
        let view = |classname: &str| -> Result<ViewFn> {
            Ok(loader
                .get_class_as::<ViewClass>("users.views", classname)?
                .as_view())
        };

        self.views = Some(UserViews {
            redirect: view("UserRedirectView")?,
            update: view("UserUpdateView")?,
            detail: view("UserDetailView")?,
        });
        tracing::debug!("Users app ready");
        Ok(())
    }

    fn get_urls(&self) -> Result<Vec<UrlPattern>> {
        let views = self
            .views
            .as_ref()
            .ok_or_else(|| RealzError::ImproperlyConfigured {
                message: "users app is not ready".to_string(),
            })?;

        Ok(vec![
            path("~redirect/", views.redirect.clone(), "redirect"),
            path("~update/", views.update.clone(), "update"),
            path("<str:username>/", views.detail.clone(), "detail"),
        ])
    }
}
