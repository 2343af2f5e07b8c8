use realzhub::core::urls::{view_fn, Request, Response, ViewFn};
use realzhub::core::views::decorators::login_forbidden;
use realzhub::domain::model::PermissionSpec;
use realzhub::domain::principal::Attribute;
use realzhub::{
    check_permissions, permissions_required, AccessOutcome, AnonymousUser, Principal, RealzError,
    User,
};
use serde_json::json;
use std::sync::Arc;

fn dashboard_view() -> ViewFn {
    view_fn(|_| Ok(Response::render("dashboard/index.html")))
}

fn staff_or_dashboard_access() -> PermissionSpec {
    PermissionSpec::any([vec!["is_staff"], vec!["catalogue.dashboard_access"]])
}

#[test]
fn test_empty_spec_admits_everyone() {
    let principals: Vec<Box<dyn Principal>> = vec![
        Box::new(AnonymousUser),
        Box::new(User::new("alice")),
        Box::new(User::new("bob").active(false)),
    ];

    for principal in &principals {
        assert!(check_permissions(principal.as_ref(), None));
        assert!(check_permissions(
            principal.as_ref(),
            Some(&PermissionSpec::all(Vec::<String>::new()))
        ));
    }
}

#[test]
fn test_attribute_token() {
    let spec = PermissionSpec::all(["is_staff"]);

    assert!(!check_permissions(&User::new("alice"), Some(&spec)));
    assert!(check_permissions(&User::new("alice").staff(true), Some(&spec)));
    // is_active 會被自動加入
    assert!(!check_permissions(
        &User::new("alice").staff(true).active(false),
        Some(&spec)
    ));
}

#[test]
fn test_or_of_groups() {
    let spec = staff_or_dashboard_access();

    let staff = User::new("staff").staff(true);
    let partner = User::new("partner").with_permission("catalogue.dashboard_access");
    let customer = User::new("customer");

    assert!(check_permissions(&staff, Some(&spec)));
    assert!(check_permissions(&partner, Some(&spec)));
    assert!(!check_permissions(&customer, Some(&spec)));
    assert!(!check_permissions(&AnonymousUser, Some(&spec)));
}

#[test]
fn test_mixed_group_requires_every_token() {
    let spec = PermissionSpec::all(["is_staff", "catalogue.change_product"]);

    assert!(!check_permissions(&User::new("a").staff(true), Some(&spec)));
    assert!(!check_permissions(
        &User::new("b").with_permission("catalogue.change_product"),
        Some(&spec)
    ));
    assert!(check_permissions(
        &User::new("c")
            .staff(true)
            .with_permission("catalogue.change_product"),
        Some(&spec)
    ));
}

#[test]
fn test_is_anonymous_token() {
    let spec = PermissionSpec::all(["is_anonymous"]);

    assert!(check_permissions(&AnonymousUser, Some(&spec)));
    assert!(!check_permissions(&User::new("alice"), Some(&spec)));
}

#[test]
fn test_custom_attributes() {
    let partner = User::new("partner")
        .with_attribute("is_partner", Attribute::Value(json!(true)))
        .with_attribute(
            "has_vip_name",
            Attribute::method(|user| user.get_username().starts_with("vip")),
        );

    assert!(check_permissions(
        &partner,
        Some(&PermissionSpec::all(["is_partner"]))
    ));
    assert!(!check_permissions(
        &partner,
        Some(&PermissionSpec::all(["has_vip_name"]))
    ));
    // 未登記的屬性視為 false
    assert!(!check_permissions(
        &partner,
        Some(&PermissionSpec::all(["is_reseller"]))
    ));
}

#[test]
fn test_guard_outcomes() {
    let guard = permissions_required(staff_or_dashboard_access(), "/accounts/login/");

    assert_eq!(guard.test(&User::new("staff").staff(true)), AccessOutcome::Pass);
    assert_eq!(guard.test(&User::new("customer")), AccessOutcome::Deny);
    assert_eq!(guard.test(&AnonymousUser), AccessOutcome::Redirect);
}

#[test]
fn test_decorated_view_denies_authenticated_user() {
    let view = permissions_required(PermissionSpec::all(["is_staff"]), "/accounts/login/")
        .for_view(Some("dashboard:index"))
        .decorate(dashboard_view());

    let request = Request::new("/dashboard/", Arc::new(User::new("customer")));
    match view(&request) {
        Err(RealzError::AccessDenied { view }) => {
            assert_eq!(view.as_deref(), Some("dashboard:index"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_decorated_view_redirects_anonymous_user() {
    let view = permissions_required(PermissionSpec::all(["is_staff"]), "/accounts/login/")
        .decorate(dashboard_view());

    let response = view(&Request::new("/dashboard/orders/", Arc::new(AnonymousUser))).unwrap();
    assert_eq!(response.status, 302);
    assert_eq!(
        response.location.as_deref(),
        Some("/accounts/login/?next=%2Fdashboard%2Forders%2F")
    );
}

#[test]
fn test_decorated_view_passes_through() {
    let view = permissions_required(PermissionSpec::all(["is_staff"]), "/accounts/login/")
        .decorate(dashboard_view());

    let response = view(&Request::new(
        "/dashboard/",
        Arc::new(User::new("staff").staff(true)),
    ))
    .unwrap();
    assert_eq!(response.template.as_deref(), Some("dashboard/index.html"));
}

#[test]
fn test_login_forbidden() {
    let view = login_forbidden(
        view_fn(|_| Ok(Response::render("account/login.html"))),
        "login_forbidden.html",
        403,
    );

    let anonymous = view(&Request::new("/accounts/login/", Arc::new(AnonymousUser))).unwrap();
    assert_eq!(anonymous.template.as_deref(), Some("account/login.html"));

    let logged_in = view(&Request::new("/accounts/login/", Arc::new(User::new("alice")))).unwrap();
    assert_eq!(logged_in.status, 403);
    assert_eq!(logged_in.template.as_deref(), Some("login_forbidden.html"));
}
