use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// 被檢查權限的使用者介面
pub trait Principal: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn is_anonymous(&self) -> bool {
        !self.is_authenticated()
    }

    fn is_active(&self) -> bool;

    fn get_username(&self) -> &str;

    /// 是否同時擁有全部的正式權限 (`app.codename`)
    fn has_perms(&self, perms: &[&str]) -> bool;

    /// 透過屬性表查詢裸權限 token；未登記的屬性回傳 `None`
    fn attribute(&self, name: &str) -> Option<bool>;
}

/// 使用者自訂屬性：值或是方法
#[derive(Clone)]
pub enum Attribute {
    Value(Value),
    Method(Arc<dyn Fn(&User) -> bool + Send + Sync>),
}

impl Attribute {
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&User) -> bool + Send + Sync + 'static,
    {
        Attribute::Method(Arc::new(f))
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Attribute::Method(_) => f.write_str("Method(..)"),
        }
    }
}

/// Truthiness of a JSON value: null, false, zero, empty string and empty
/// containers are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    permissions: BTreeSet<String>,
    attributes: HashMap<String, Attribute>,
}

impl User {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            permissions: BTreeSet::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    pub fn superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_permission(mut self, perm: &str) -> Self {
        self.permissions.insert(perm.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}

impl Principal for User {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn get_username(&self) -> &str {
        &self.username
    }

    fn has_perms(&self, perms: &[&str]) -> bool {
        // 啟用中的超級使用者擁有所有權限
        if self.is_active && self.is_superuser {
            return true;
        }
        perms
            .iter()
            .all(|perm| self.is_active && self.permissions.contains(*perm))
    }

    fn attribute(&self, name: &str) -> Option<bool> {
        match name {
            "is_active" => Some(self.is_active),
            "is_staff" => Some(self.is_staff),
            "is_superuser" => Some(self.is_superuser),
            "is_authenticated" => Some(true),
            "is_anonymous" => Some(false),
            _ => self.attributes.get(name).map(|attribute| match attribute {
                Attribute::Value(value) => truthy(value),
                Attribute::Method(method) => method(self),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousUser;

impl Principal for AnonymousUser {
    fn is_authenticated(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }

    fn get_username(&self) -> &str {
        ""
    }

    fn has_perms(&self, perms: &[&str]) -> bool {
        perms.is_empty()
    }

    fn attribute(&self, name: &str) -> Option<bool> {
        match name {
            "is_active" | "is_staff" | "is_superuser" | "is_authenticated" => Some(false),
            "is_anonymous" => Some(true),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!(1.5)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!({"k": 1})));
    }

    #[test]
    fn test_user_attribute_table() {
        let user = User::new("alice")
            .with_attribute("is_editor", Attribute::Value(json!(true)))
            .with_attribute("has_feeds", Attribute::Value(json!([])))
            .with_attribute(
                "is_named",
                Attribute::method(|user: &User| !user.name.is_empty()),
            );

        assert_eq!(user.attribute("is_editor"), Some(true));
        assert_eq!(user.attribute("has_feeds"), Some(false));
        assert_eq!(user.attribute("is_named"), Some(false));
        assert_eq!(user.attribute("unknown"), None);
        assert_eq!(user.attribute("is_anonymous"), Some(false));
    }

    #[test]
    fn test_has_perms() {
        let user = User::new("bob").with_permission("users.view_user");
        assert!(user.has_perms(&["users.view_user"]));
        assert!(!user.has_perms(&["users.view_user", "users.change_user"]));
        assert!(user.has_perms(&[]));

        let inactive = user.clone().active(false);
        assert!(!inactive.has_perms(&["users.view_user"]));

        let root = User::new("root").superuser(true);
        assert!(root.has_perms(&["anything.at_all"]));
    }

    #[test]
    fn test_anonymous_user() {
        let anon = AnonymousUser;
        assert!(anon.is_anonymous());
        assert!(!anon.has_perms(&["users.view_user"]));
        assert_eq!(anon.attribute("is_anonymous"), Some(true));
        assert_eq!(anon.attribute("is_active"), Some(false));
    }
}
