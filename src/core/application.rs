use crate::core::loading::Loader;
use crate::core::urls::{IncludedUrls, UrlPattern};
use crate::core::views::decorators::{permissions_required, PermissionsRequired};
use crate::domain::model::PermissionSpec;
use crate::utils::error::{RealzError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_LOGIN_URL: &str = "/accounts/login/";

/// AppConfig 本身的屬性名稱，不可作為自訂選項
pub const RESERVED_APP_CONFIG_ATTRS: [&str; 8] = [
    "name",
    "module",
    "apps",
    "label",
    "verbose_name",
    "path",
    "models_module",
    "models",
];

/// Base app configuration.
///
/// Besides the app identity it carries the URL instance namespace, the login
/// redirect target and the permission map used to protect the app's views.
/// `permissions_map` maps view names to a [`PermissionSpec`]; views missing
/// from the map fall back to `default_permissions`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    name: String,
    label: String,
    verbose_name: String,
    namespace: Option<String>,
    login_url: Option<String>,
    default_login_url: String,
    permissions_map: HashMap<String, PermissionSpec>,
    default_permissions: Option<PermissionSpec>,
    extra: BTreeMap<String, Value>,
}

impl AppConfig {
    pub fn builder(name: &str, label: &str) -> AppConfigBuilder {
        AppConfigBuilder {
            name: name.to_string(),
            label: label.to_string(),
            verbose_name: None,
            namespace: None,
            login_url: None,
            default_login_url: DEFAULT_LOGIN_URL.to_string(),
            permissions_map: HashMap::new(),
            default_permissions: None,
            kwargs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn verbose_name(&self) -> &str {
        &self.verbose_name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// 此 app 的登入頁；未設定時使用全站設定
    pub fn login_url(&self) -> &str {
        self.login_url.as_deref().unwrap_or(&self.default_login_url)
    }

    pub fn permissions_map(&self) -> &HashMap<String, PermissionSpec> {
        &self.permissions_map
    }

    pub fn default_permissions(&self) -> Option<&PermissionSpec> {
        self.default_permissions.as_ref()
    }

    /// 透過 kwargs 設定的其他屬性
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Permissions for a URL name such as `users:index`; the namespace part
    /// is ignored.
    pub fn get_permissions(&self, url: Option<&str>) -> Option<&PermissionSpec> {
        let view_name = url.map(|url| url.rsplit(':').next().unwrap_or(url));
        view_name
            .and_then(|name| self.permissions_map.get(name))
            .or(self.default_permissions.as_ref())
    }

    /// 依 URL 名稱決定視圖要套用的存取檢查；不需權限時回傳 `None`
    pub fn get_url_decorator(&self, name: Option<&str>) -> Option<PermissionsRequired> {
        let permissions = self.get_permissions(name)?;
        if permissions.is_empty() {
            return None;
        }
        Some(permissions_required(permissions.clone(), self.login_url()).for_view(name))
    }

    /// Wraps the views of `urlpatterns` (nested includes too) with the access
    /// guard their URL name calls for.
    pub fn post_process_urls(&self, urlpatterns: Vec<UrlPattern>) -> Vec<UrlPattern> {
        urlpatterns
            .into_iter()
            .map(|pattern| match pattern {
                UrlPattern::Resolver(mut resolver) => {
                    resolver.url_patterns = self.post_process_urls(resolver.url_patterns);
                    UrlPattern::Resolver(resolver)
                }
                UrlPattern::Endpoint(mut endpoint) => {
                    if let Some(decorator) = self.get_url_decorator(endpoint.name.as_deref()) {
                        tracing::debug!(
                            "Protecting {}:{} with {}",
                            self.label,
                            endpoint.name.as_deref().unwrap_or("<unnamed>"),
                            decorator.permissions()
                        );
                        endpoint.callback = decorator.decorate(endpoint.callback);
                        endpoint.guards.push(decorator.permissions().clone());
                    }
                    UrlPattern::Endpoint(endpoint)
                }
            })
            .collect()
    }
}

pub struct AppConfigBuilder {
    name: String,
    label: String,
    verbose_name: Option<String>,
    namespace: Option<String>,
    login_url: Option<String>,
    default_login_url: String,
    permissions_map: HashMap<String, PermissionSpec>,
    default_permissions: Option<PermissionSpec>,
    kwargs: Vec<(String, Value)>,
}

impl AppConfigBuilder {
    pub fn verbose_name(mut self, verbose_name: &str) -> Self {
        self.verbose_name = Some(verbose_name.to_string());
        self
    }

    pub fn namespace(mut self, namespace: Option<&str>) -> Self {
        if let Some(namespace) = namespace {
            self.namespace = Some(namespace.to_string());
        }
        self
    }

    pub fn login_url(mut self, login_url: &str) -> Self {
        self.login_url = Some(login_url.to_string());
        self
    }

    /// 全站預設登入頁 (settings.login_url)
    pub fn default_login_url(mut self, login_url: &str) -> Self {
        self.default_login_url = login_url.to_string();
        self
    }

    pub fn permission(mut self, view_name: &str, spec: PermissionSpec) -> Self {
        self.permissions_map.insert(view_name.to_string(), spec);
        self
    }

    pub fn default_permissions(mut self, spec: PermissionSpec) -> Self {
        self.default_permissions = Some(spec);
        self
    }

    pub fn kwarg(mut self, key: &str, value: Value) -> Self {
        self.kwargs.push((key.to_string(), value));
        self
    }

    pub fn kwargs<I>(mut self, kwargs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.kwargs.extend(kwargs);
        self
    }

    pub fn build(self) -> Result<AppConfig> {
        let clashing: BTreeSet<&str> = self
            .kwargs
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| RESERVED_APP_CONFIG_ATTRS.contains(key))
            .collect();
        if !clashing.is_empty() {
            return Err(RealzError::ConfigurationConflictError {
                keys: clashing.into_iter().map(str::to_string).collect(),
            });
        }

        let mut config = AppConfig {
            verbose_name: self.verbose_name.unwrap_or_else(|| self.label.clone()),
            name: self.name,
            label: self.label,
            namespace: self.namespace,
            login_url: self.login_url,
            default_login_url: self.default_login_url,
            permissions_map: self.permissions_map,
            default_permissions: self.default_permissions,
            extra: BTreeMap::new(),
        };

        // kwargs 依序設定為屬性
        for (key, value) in self.kwargs {
            match key.as_str() {
                "namespace" => config.namespace = Some(expect_string(&key, value)?),
                "login_url" => config.login_url = Some(expect_string(&key, value)?),
                "permissions_map" => {
                    let map: HashMap<String, PermissionSpec> = serde_json::from_value(value)?;
                    config.permissions_map.extend(map);
                }
                "default_permissions" => {
                    config.default_permissions = serde_json::from_value(value)?;
                }
                _ => {
                    config.extra.insert(key, value);
                }
            }
        }

        Ok(config)
    }
}

fn expect_string(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RealzError::InvalidConfigValueError {
            field: key.to_string(),
            value: other.to_string(),
            reason: "Expected a string".to_string(),
        }),
    }
}

/// An installed app: its configuration plus the URLs it serves.
pub trait Application: Send + Sync {
    fn app_config(&self) -> &AppConfig;

    /// 在所有 app 登記完成後呼叫，用來解析視圖等類別
    fn ready(&mut self, _loader: &Loader) -> Result<()> {
        Ok(())
    }

    fn get_urls(&self) -> Result<Vec<UrlPattern>> {
        Ok(Vec::new())
    }

    /// URL patterns (already protected) with the app label and instance namespace.
    fn urls(&self) -> Result<IncludedUrls> {
        let config = self.app_config();
        let patterns = config.post_process_urls(self.get_urls()?);
        Ok(IncludedUrls {
            patterns,
            app_name: config.label().to_string(),
            namespace: config.namespace().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::urls::{include, path, view_fn, Request, Response, ViewFn};
    use crate::domain::principal::{AnonymousUser, User};
    use serde_json::json;
    use std::sync::Arc;

    fn ok_view() -> ViewFn {
        view_fn(|_| Ok(Response::render("ok.html")))
    }

    fn call(pattern: &UrlPattern, request: &Request) -> Result<Response> {
        match pattern {
            UrlPattern::Endpoint(endpoint) => (endpoint.callback)(request),
            UrlPattern::Resolver(_) => panic!("not an endpoint"),
        }
    }

    #[test]
    fn test_reserved_kwargs_rejected() {
        let result = AppConfig::builder("realzhub.apps.users", "users")
            .kwarg("label", json!("x"))
            .kwarg("path", json!("/tmp"))
            .kwarg("color", json!("blue"))
            .build();

        match result {
            Err(RealzError::ConfigurationConflictError { keys }) => {
                assert_eq!(keys, vec!["label".to_string(), "path".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_kwargs_set_attributes() {
        let config = AppConfig::builder("realzhub.apps.users", "users")
            .kwarg("namespace", json!("people"))
            .kwarg("permissions_map", json!({"detail": ["is_staff"]}))
            .kwarg("default_permissions", json!([["is_staff"], ["users.view_user"]]))
            .kwarg("page_size", json!(20))
            .build()
            .unwrap();

        assert_eq!(config.namespace(), Some("people"));
        assert_eq!(config.verbose_name(), "users");
        assert_eq!(
            config.get_permissions(Some("detail")),
            Some(&PermissionSpec::all(["is_staff"]))
        );
        assert!(matches!(
            config.get_permissions(Some("update")),
            Some(PermissionSpec::Any(_))
        ));
        assert_eq!(config.extra("page_size"), Some(&json!(20)));
        assert_eq!(config.login_url(), DEFAULT_LOGIN_URL);
    }

    #[test]
    fn test_namespaced_lookup() {
        let config = AppConfig::builder("realzhub.apps.users", "users")
            .permission("detail", PermissionSpec::all(["is_staff"]))
            .build()
            .unwrap();

        assert!(config.get_permissions(Some("users:detail")).is_some());
        assert!(config.get_permissions(Some("users:update")).is_none());
        assert!(config.get_permissions(None).is_none());
    }

    #[test]
    fn test_nested_namespace_uses_last_segment() {
        let config = AppConfig::builder("realzhub.apps.users", "users")
            .permission("detail", PermissionSpec::all(["is_staff"]))
            .permission("users", PermissionSpec::all(["is_superuser"]))
            .build()
            .unwrap();

        // site:users:detail 只看最後一段 detail
        assert_eq!(
            config.get_permissions(Some("site:users:detail")),
            Some(&PermissionSpec::all(["is_staff"]))
        );
    }

    #[test]
    fn test_post_process_records_guards() {
        let config = AppConfig::builder("realzhub.apps.users", "users")
            .permission("update", PermissionSpec::all(["is_staff"]))
            .build()
            .unwrap();
        let outer = AppConfig::builder("realzhub", "realzhub")
            .default_permissions(PermissionSpec::all(["is_active"]))
            .build()
            .unwrap();

        let patterns = outer.post_process_urls(config.post_process_urls(vec![
            path("~update/", ok_view(), "update"),
            path("<str:username>/", ok_view(), "detail"),
        ]));

        let guards: Vec<Vec<PermissionSpec>> = patterns
            .iter()
            .map(|pattern| match pattern {
                UrlPattern::Endpoint(endpoint) => endpoint.guards.clone(),
                UrlPattern::Resolver(_) => panic!("not an endpoint"),
            })
            .collect();
        assert_eq!(
            guards,
            vec![
                vec![
                    PermissionSpec::all(["is_staff"]),
                    PermissionSpec::all(["is_active"])
                ],
                vec![PermissionSpec::all(["is_active"])],
            ]
        );
    }

    #[test]
    fn test_post_process_wraps_named_views() {
        let config = AppConfig::builder("realzhub.apps.users", "users")
            .login_url("/login/")
            .permission("update", PermissionSpec::all(["is_staff"]))
            .permission("detail", PermissionSpec::All(vec![]))
            .build()
            .unwrap();

        let nested = IncludedUrls {
            patterns: vec![path("~update/", ok_view(), "update")],
            app_name: "inner".to_string(),
            namespace: None,
        };
        let patterns = config.post_process_urls(vec![
            path("~update/", ok_view(), "update"),
            path("<str:username>/", ok_view(), "detail"),
            include("inner/", nested),
        ]);

        let anon = Request::new("/users/~update/", Arc::new(AnonymousUser));
        let redirected = call(&patterns[0], &anon).unwrap();
        assert_eq!(
            redirected.location.as_deref(),
            Some("/login/?next=%2Fusers%2F%7Eupdate%2F")
        );

        // 空的權限列表不包裝
        assert_eq!(call(&patterns[1], &anon).unwrap().status, 200);

        let member = Request::new("/users/inner/~update/", Arc::new(User::new("m")));
        match &patterns[2] {
            UrlPattern::Resolver(resolver) => assert!(matches!(
                call(&resolver.url_patterns[0], &member),
                Err(RealzError::AccessDenied { .. })
            )),
            UrlPattern::Endpoint(_) => panic!("expected include"),
        }
    }

    #[test]
    fn test_default_permissions_apply_to_unlisted_views() {
        let config = AppConfig::builder("realzhub.apps.dashboard", "dashboard")
            .default_permissions(PermissionSpec::all(["is_staff"]))
            .permission("login", PermissionSpec::All(vec![]))
            .build()
            .unwrap();

        assert!(config.get_url_decorator(Some("index")).is_some());
        assert!(config.get_url_decorator(Some("login")).is_none());
    }
}
