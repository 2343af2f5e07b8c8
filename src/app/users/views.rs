use crate::core::modules::ModuleRegistry;
use crate::core::urls::{Request, Response};
use crate::core::views::ViewClass;
use crate::utils::error::Result;
use serde_json::json;

pub const MODULE: &str = "realzhub.apps.users.views";

pub fn register(registry: &mut ModuleRegistry) {
    registry.register(MODULE, |module| {
        module
            .class(
                "UserRedirectView",
                ViewClass::new("UserRedirectView", user_redirect_view),
            )
            .class(
                "UserUpdateView",
                ViewClass::new("UserUpdateView", user_update_view),
            )
            .class(
                "UserDetailView",
                ViewClass::new("UserDetailView", user_detail_view),
            );
        Ok(())
    });
}

/// 導向目前使用者的個人頁面
fn user_redirect_view(request: &Request) -> Result<Response> {
    Ok(Response::redirect(&format!(
        "/users/{}/",
        request.user.get_username()
    )))
}

fn user_update_view(request: &Request) -> Result<Response> {
    Ok(Response::render("users/user_form.html")
        .with_context("username", json!(request.user.get_username())))
}

fn user_detail_view(request: &Request) -> Result<Response> {
    let username = request.kwargs.get("username").cloned().unwrap_or_default();
    Ok(Response::render("users/user_detail.html").with_context("username", json!(username)))
}
