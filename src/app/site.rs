use crate::app::users::UsersConfig;
use crate::config::Settings;
use crate::core::application::{AppConfig, Application};
use crate::core::loading::Loader;
use crate::core::urls::{include, path, UrlPattern};
use crate::core::views::template_view;
use crate::utils::error::Result;

pub const LABEL: &str = "realzhub";

/// 站台根設定：掛載 users app 與靜態頁面
pub struct RealzHub {
    config: AppConfig,
    users_app: UsersConfig,
}

impl RealzHub {
    pub fn new(settings: &Settings, users_app: UsersConfig) -> Result<Self> {
        let config = settings.app_config_builder(LABEL, LABEL).build()?;
        Ok(Self { config, users_app })
    }

    pub fn users_app(&self) -> &UsersConfig {
        &self.users_app
    }
}

impl Application for RealzHub {
    fn app_config(&self) -> &AppConfig {
        &self.config
    }

    fn ready(&mut self, loader: &Loader) -> Result<()> {
        self.users_app.ready(loader)
    }

    fn get_urls(&self) -> Result<Vec<UrlPattern>> {
        Ok(vec![
            include("users/", self.users_app.urls()?),
            path("", template_view("pages/home.html"), "home"),
            path("about/", template_view("pages/about.html"), "about"),
        ])
    }
}
