use crate::core::application::{AppConfig, AppConfigBuilder, DEFAULT_LOGIN_URL};
use crate::core::loading::{DEFAULT_CLASS_LOADER, DEFAULT_MODULE_PREFIX};
use crate::domain::model::{AppRegistryEntry, PermissionSpec};
use crate::utils::error::{RealzError, Result};
use crate::utils::validation::{
    validate_dotted_path, validate_login_url, validate_non_empty_string, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// 專案設定 (對應 TOML 設定檔)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// 類別解析策略名稱
    #[serde(default = "default_class_loader")]
    pub dynamic_class_loader: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_module_prefix")]
    pub module_prefix: String,
    #[serde(default = "default_installed_apps")]
    pub installed_apps: Vec<AppRegistryEntry>,
    /// 各 app 的設定，以 label 為鍵
    #[serde(default)]
    pub apps: HashMap<String, AppOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppOptions {
    pub namespace: Option<String>,
    pub login_url: Option<String>,
    #[serde(default)]
    pub permissions_map: HashMap<String, PermissionSpec>,
    pub default_permissions: Option<PermissionSpec>,
    /// 其他自訂選項，會以 kwargs 傳給 AppConfig
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_json::Value>,
}

fn default_class_loader() -> String {
    DEFAULT_CLASS_LOADER.to_string()
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_module_prefix() -> String {
    DEFAULT_MODULE_PREFIX.to_string()
}

fn default_installed_apps() -> Vec<AppRegistryEntry> {
    vec![
        AppRegistryEntry {
            label: "realzhub".to_string(),
            name: "realzhub".to_string(),
            core: true,
        },
        AppRegistryEntry {
            label: "users".to_string(),
            name: format!("{}.users", DEFAULT_MODULE_PREFIX),
            core: true,
        },
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dynamic_class_loader: default_class_loader(),
            login_url: default_login_url(),
            module_prefix: default_module_prefix(),
            installed_apps: default_installed_apps(),
            apps: HashMap::new(),
        }
    }
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RealzError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RealzError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LOGIN_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RealzError::ImproperlyConfigured {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn installed_app(&self, label: &str) -> Option<&AppRegistryEntry> {
        self.installed_apps.iter().find(|entry| entry.label == label)
    }

    /// 建立 AppConfig builder，並套用此 app 在設定檔中的選項
    pub fn app_config_builder(&self, name: &str, label: &str) -> AppConfigBuilder {
        self.configure_app(label, AppConfig::builder(name, label))
    }

    /// 在既有的 builder 上套用全站登入頁與設定檔選項 (設定檔優先)
    pub fn configure_app(&self, label: &str, builder: AppConfigBuilder) -> AppConfigBuilder {
        let builder = builder.default_login_url(&self.login_url);
        match self.apps.get(label) {
            Some(options) => options.apply(builder),
            None => builder,
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("dynamic_class_loader", &self.dynamic_class_loader)?;
        validate_dotted_path("module_prefix", &self.module_prefix)?;
        validate_login_url("login_url", &self.login_url)?;

        for (index, entry) in self.installed_apps.iter().enumerate() {
            validate_dotted_path(&format!("installed_apps[{}].name", index), &entry.name)?;
            if entry.label.contains('.') {
                return Err(RealzError::InvalidConfigValueError {
                    field: format!("installed_apps[{}].label", index),
                    value: entry.label.clone(),
                    reason: "App labels cannot contain '.'".to_string(),
                });
            }
            validate_dotted_path(&format!("installed_apps[{}].label", index), &entry.label)?;
        }

        for (label, options) in &self.apps {
            if self.installed_app(label).is_none() {
                return Err(RealzError::ConfigValidationError {
                    field: format!("apps.{}", label),
                    message: format!("'{}' is not in installed_apps", label),
                });
            }
            if let Some(login_url) = &options.login_url {
                validate_login_url(&format!("apps.{}.login_url", label), login_url)?;
            }
        }

        Ok(())
    }
}

impl AppOptions {
    pub fn apply(&self, mut builder: AppConfigBuilder) -> AppConfigBuilder {
        builder = builder.namespace(self.namespace.as_deref());
        if let Some(login_url) = &self.login_url {
            builder = builder.login_url(login_url);
        }
        for (view_name, spec) in &self.permissions_map {
            builder = builder.permission(view_name, spec.clone());
        }
        if let Some(spec) = &self.default_permissions {
            builder = builder.default_permissions(spec.clone());
        }
        builder.kwargs(self.options.clone())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.dynamic_class_loader, "default");
        assert_eq!(settings.login_url, "/accounts/login/");
        assert_eq!(settings.module_prefix, "realzhub.apps");
        assert_eq!(
            settings.installed_app("users").map(|e| e.name.as_str()),
            Some("realzhub.apps.users")
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_app_options() {
        let toml_content = r#"
login_url = "/login/"

[[installed_apps]]
label = "users"
name = "myproject.users"

[apps.users]
namespace = "people"
default_permissions = ["is_staff"]
page_size = 25

[apps.users.permissions_map]
detail = [["is_staff"], ["users.view_user"]]
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert!(settings.installed_apps[0].core);
        assert!(settings.validate().is_ok());

        let config = settings
            .app_config_builder("myproject.users", "users")
            .build()
            .unwrap();
        assert_eq!(config.namespace(), Some("people"));
        assert_eq!(config.login_url(), "/login/");
        assert_eq!(config.extra("page_size"), Some(&serde_json::json!(25)));
        assert!(matches!(
            config.get_permissions(Some("detail")),
            Some(PermissionSpec::Any(groups)) if groups.len() == 2
        ));
        assert_eq!(
            config.get_permissions(Some("update")),
            Some(&PermissionSpec::all(["is_staff"]))
        );
    }

    #[test]
    fn test_reserved_option_rejected() {
        let toml_content = r#"
[apps.users]
verbose_name = "People"
"#;
        let settings = Settings::from_toml_str(toml_content).unwrap();
        let result = settings
            .app_config_builder("realzhub.apps.users", "users")
            .build();
        assert!(matches!(
            result,
            Err(RealzError::ConfigurationConflictError { ref keys }) if keys == &["verbose_name".to_string()]
        ));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REALZHUB_TEST_LOGIN_URL", "/sso/login/");

        let settings =
            Settings::from_toml_str(r#"login_url = "${REALZHUB_TEST_LOGIN_URL}""#).unwrap();
        assert_eq!(settings.login_url, "/sso/login/");

        std::env::remove_var("REALZHUB_TEST_LOGIN_URL");
    }

    #[test]
    fn test_validation_errors() {
        let unknown_app = Settings::from_toml_str(
            r#"
[apps.dashboard]
namespace = "dashboard"
"#,
        )
        .unwrap();
        assert!(matches!(
            unknown_app.validate(),
            Err(RealzError::ConfigValidationError { .. })
        ));

        let bad_login = Settings::from_toml_str(r#"login_url = "login""#).unwrap();
        assert!(bad_login.validate().is_err());

        let bad_label = Settings::from_toml_str(
            r#"
[[installed_apps]]
label = "users.extra"
name = "myproject.users"
"#,
        )
        .unwrap();
        assert!(bad_label.validate().is_err());
    }

    #[test]
    fn test_settings_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"dynamic_class_loader = \"default\"\nmodule_prefix = \"realzhub.apps\"\n")
            .unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.dynamic_class_loader, "default");
    }
}
