use crate::core::urls::{view_fn, Request, Response, ViewFn};
use crate::domain::model::PermissionSpec;
use crate::domain::principal::Principal;
use crate::utils::error::RealzError;
use url::form_urlencoded;

pub const REDIRECT_FIELD_NAME: &str = "next";
pub const LOGIN_FORBIDDEN_TEMPLATE: &str = "login_forbidden.html";

/// Evaluates a permission spec against a principal.
///
/// Each token is either a formal permission (`app.codename`, contains a
/// dot) or the name of a boolean attribute on the principal
/// (`is_staff`, `is_superuser`). A flat list must pass as a whole; for a
/// list of lists any one group passing is enough.
///
/// - `["is_anonymous"]` only lets anonymous principals through.
/// - `[["is_staff"], ["partner.dashboard_access"]]` admits staff and anyone
///   holding the dashboard permission.
pub fn check_permissions(user: &dyn Principal, permissions: Option<&PermissionSpec>) -> bool {
    match permissions {
        None => true,
        Some(spec) if spec.is_empty() => true,
        Some(PermissionSpec::All(perms)) => check_one_permission_list(user, perms),
        Some(PermissionSpec::Any(groups)) => groups
            .iter()
            .any(|perms| check_one_permission_list(user, perms)),
    }
}

fn check_one_permission_list(user: &dyn Principal, perms: &[String]) -> bool {
    let (regular_permissions, mut conditions): (Vec<&str>, Vec<&str>) = perms
        .iter()
        .map(String::as_str)
        .partition(|perm| perm.contains('.'));

    // 沒有檢查 is_anonymous 時一律要求 is_active
    if !conditions.is_empty()
        && !conditions.contains(&"is_anonymous")
        && !conditions.contains(&"is_active")
    {
        conditions.push("is_active");
    }

    let passes_conditions = conditions.iter().all(|condition| {
        user.attribute(condition).unwrap_or_else(|| {
            tracing::warn!(
                "Principal '{}' has no attribute '{}', treating it as false",
                user.get_username(),
                condition
            );
            false
        })
    });

    passes_conditions && user.has_perms(&regular_permissions)
}

/// 存取檢查的三種結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Pass,
    /// 已登入但權限不足
    Deny,
    /// 未登入，導向登入頁
    Redirect,
}

/// Access guard produced by [`permissions_required`].
///
/// An anonymous principal failing the check is redirected to the login page;
/// an authenticated one gets `AccessDenied`, the same split as a 403 versus a
/// login redirect.
#[derive(Debug, Clone)]
pub struct PermissionsRequired {
    permissions: PermissionSpec,
    login_url: String,
    view_name: Option<String>,
}

pub fn permissions_required(permissions: PermissionSpec, login_url: &str) -> PermissionsRequired {
    PermissionsRequired {
        permissions,
        login_url: login_url.to_string(),
        view_name: None,
    }
}

impl PermissionsRequired {
    pub fn for_view(mut self, view_name: Option<&str>) -> Self {
        self.view_name = view_name.map(str::to_string);
        self
    }

    pub fn permissions(&self) -> &PermissionSpec {
        &self.permissions
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn test(&self, user: &dyn Principal) -> AccessOutcome {
        if check_permissions(user, Some(&self.permissions)) {
            AccessOutcome::Pass
        } else if user.is_authenticated() {
            AccessOutcome::Deny
        } else {
            AccessOutcome::Redirect
        }
    }

    /// 以存取檢查包裝視圖
    pub fn decorate(&self, view: ViewFn) -> ViewFn {
        let guard = self.clone();
        view_fn(move |request: &Request| match guard.test(request.user.as_ref()) {
            AccessOutcome::Pass => view(request),
            AccessOutcome::Deny => {
                tracing::info!(
                    "Denied '{}' access to {}",
                    request.user.get_username(),
                    request.path
                );
                Err(RealzError::AccessDenied {
                    view: guard.view_name.clone(),
                })
            }
            AccessOutcome::Redirect => {
                tracing::debug!("Redirecting anonymous request for {} to login", request.path);
                Ok(redirect_to_login(
                    &request.path,
                    &guard.login_url,
                    REDIRECT_FIELD_NAME,
                ))
            }
        })
    }
}

/// 導向登入頁，並以 query string 帶上原本的路徑
pub fn redirect_to_login(next: &str, login_url: &str, redirect_field_name: &str) -> Response {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(redirect_field_name, next)
        .finish();
    let separator = if login_url.contains('?') { '&' } else { '?' };
    Response::redirect(&format!("{}{}{}", login_url, separator, query))
}

/// Only lets anonymous principals reach the view; authenticated principals
/// get `template_name` rendered with `status`.
pub fn login_forbidden(view: ViewFn, template_name: &str, status: u16) -> ViewFn {
    let template_name = template_name.to_string();
    view_fn(move |request: &Request| {
        if !request.user.is_authenticated() {
            return view(request);
        }
        Ok(Response::render(&template_name).with_status(status))
    })
}
