use crate::domain::model::PermissionSpec;
use crate::domain::principal::Principal;
use crate::utils::error::{RealzError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

static ROUTE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:(\w+):)?(\w+)>").expect("valid regex"));

/// 視圖函式
pub type ViewFn = Arc<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

pub fn view_fn<F>(f: F) -> ViewFn
where
    F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub struct Request {
    pub path: String,
    pub user: Arc<dyn Principal>,
    pub kwargs: BTreeMap<String, String>,
}

impl Request {
    pub fn new(path: &str, user: Arc<dyn Principal>) -> Self {
        Self {
            path: path.to_string(),
            user,
            kwargs: BTreeMap::new(),
        }
    }

    pub fn with_kwarg(mut self, key: &str, value: &str) -> Self {
        self.kwargs.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("path", &self.path)
            .field("user", &self.user.get_username())
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub template: Option<String>,
    pub location: Option<String>,
    pub context: Map<String, Value>,
}

impl Response {
    /// 以模板渲染的回應 (200)
    pub fn render(template: &str) -> Self {
        Self {
            status: 200,
            template: Some(template.to_string()),
            location: None,
            context: Map::new(),
        }
    }

    /// 302 跳轉
    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            template: None,
            location: Some(location.to_string()),
            context: Map::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// 末端路由：route + 名稱 + 視圖
#[derive(Clone)]
pub struct UrlEndpoint {
    pub route: String,
    pub name: Option<String>,
    pub callback: ViewFn,
    /// 已包在 callback 外的存取檢查，由內而外
    pub guards: Vec<PermissionSpec>,
}

/// Namespace container holding nested patterns (an `include`).
#[derive(Clone)]
pub struct UrlResolver {
    pub route: String,
    pub app_name: Option<String>,
    pub namespace: Option<String>,
    pub url_patterns: Vec<UrlPattern>,
}

#[derive(Clone)]
pub enum UrlPattern {
    Endpoint(UrlEndpoint),
    Resolver(UrlResolver),
}

impl UrlPattern {
    pub fn route(&self) -> &str {
        match self {
            UrlPattern::Endpoint(endpoint) => &endpoint.route,
            UrlPattern::Resolver(resolver) => &resolver.route,
        }
    }

    /// 依序走訪所有末端路由，回傳完整名稱 (含 namespace) 與完整路徑
    pub fn walk<'a, F>(&'a self, namespaces: &[&'a str], route_prefix: &str, visit: &mut F)
    where
        F: FnMut(Option<String>, String, &'a UrlEndpoint),
    {
        match self {
            UrlPattern::Endpoint(endpoint) => {
                let full_name = endpoint.name.as_ref().map(|name| {
                    let mut parts: Vec<&str> = namespaces.to_vec();
                    parts.push(name);
                    parts.join(":")
                });
                visit(full_name, format!("{}{}", route_prefix, endpoint.route), endpoint);
            }
            UrlPattern::Resolver(resolver) => {
                let mut nested = namespaces.to_vec();
                if let Some(namespace) = resolver.namespace.as_deref() {
                    nested.push(namespace);
                }
                let prefix = format!("{}{}", route_prefix, resolver.route);
                for pattern in &resolver.url_patterns {
                    pattern.walk(&nested, &prefix, visit);
                }
            }
        }
    }
}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Endpoint(endpoint) => f
                .debug_struct("UrlPattern")
                .field("route", &endpoint.route)
                .field("name", &endpoint.name)
                .finish_non_exhaustive(),
            UrlPattern::Resolver(resolver) => f
                .debug_struct("UrlResolver")
                .field("route", &resolver.route)
                .field("namespace", &resolver.namespace)
                .field("url_patterns", &resolver.url_patterns)
                .finish(),
        }
    }
}

/// 一個 app 的 URL 設定：patterns + application namespace + instance namespace
#[derive(Debug, Clone)]
pub struct IncludedUrls {
    pub patterns: Vec<UrlPattern>,
    pub app_name: String,
    pub namespace: Option<String>,
}

pub fn path(route: &str, view: ViewFn, name: &str) -> UrlPattern {
    UrlPattern::Endpoint(UrlEndpoint {
        route: route.to_string(),
        name: Some(name.to_string()),
        callback: view,
        guards: Vec::new(),
    })
}

pub fn unnamed_path(route: &str, view: ViewFn) -> UrlPattern {
    UrlPattern::Endpoint(UrlEndpoint {
        route: route.to_string(),
        name: None,
        callback: view,
        guards: Vec::new(),
    })
}

/// 掛載另一個 app 的 URL；未指定 instance namespace 時沿用 app_name
pub fn include(route: &str, urls: IncludedUrls) -> UrlPattern {
    let namespace = urls.namespace.unwrap_or_else(|| urls.app_name.clone());
    UrlPattern::Resolver(UrlResolver {
        route: route.to_string(),
        app_name: Some(urls.app_name),
        namespace: Some(namespace),
        url_patterns: urls.patterns,
    })
}

/// 依完整名稱 (例如 `users:detail`) 找到的路由
#[derive(Clone)]
pub struct ResolvedName<'a> {
    pub name: String,
    pub route: String,
    pub endpoint: &'a UrlEndpoint,
}

pub fn find_by_name<'a>(patterns: &'a [UrlPattern], name: &str) -> Result<ResolvedName<'a>> {
    let mut found = None;
    for pattern in patterns {
        pattern.walk(&[], "/", &mut |full_name, route, endpoint| {
            if found.is_none() && full_name.as_deref() == Some(name) {
                found = Some(ResolvedName {
                    name: name.to_string(),
                    route,
                    endpoint,
                });
            }
        });
    }
    found.ok_or_else(|| RealzError::NoReverseMatch {
        name: name.to_string(),
    })
}

/// 以名稱與參數組出路徑，例如 `users:detail` + username=alice → `/users/alice/`
pub fn reverse(patterns: &[UrlPattern], name: &str, kwargs: &BTreeMap<String, String>) -> Result<String> {
    let resolved = find_by_name(patterns, name)?;
    let mut missing = None;
    let path = ROUTE_PARAM.replace_all(&resolved.route, |caps: &regex::Captures| {
        let key = &caps[2];
        match kwargs.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(key) => Err(RealzError::NoReverseMatch {
            name: format!("{} (missing argument '{}')", name, key),
        }),
        None => Ok(path.into_owned()),
    }
}
