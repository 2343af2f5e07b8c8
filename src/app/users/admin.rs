use crate::app::users::forms::FormClass;
use crate::core::loading::Loader;
use crate::utils::error::{RealzError, Result};
use std::sync::Arc;

/// (標題, 欄位)
pub type Fieldset = (Option<String>, Vec<String>);

fn fieldset(title: Option<&str>, fields: &[&str]) -> Fieldset {
    (
        title.map(str::to_string),
        fields.iter().map(|f| f.to_string()).collect(),
    )
}

/// 預設的 auth 使用者管理欄位
pub fn auth_user_fieldsets() -> Vec<Fieldset> {
    vec![
        fieldset(None, &["username", "password"]),
        fieldset(Some("Personal info"), &["first_name", "last_name", "email"]),
        fieldset(
            Some("Permissions"),
            &[
                "is_active",
                "is_staff",
                "is_superuser",
                "groups",
                "user_permissions",
            ],
        ),
        fieldset(Some("Important dates"), &["last_login", "date_joined"]),
    ]
}

/// Admin descriptor for the user model. The forms are resolved through the
/// loader so a local project can swap them.
#[derive(Debug, Clone)]
pub struct UserAdmin {
    pub form: Arc<FormClass>,
    pub add_form: Arc<FormClass>,
    pub fieldsets: Vec<Fieldset>,
    pub list_display: Vec<String>,
    pub search_fields: Vec<String>,
}

impl UserAdmin {
    pub fn new(loader: &Loader) -> Result<Self> {
        let classes = loader.get_classes("users.forms", &["UserChangeForm", "UserCreationForm"])?;
        let [form, add_form] = classes.as_slice() else {
            return Err(RealzError::ClassNotFoundError {
                class_name: "UserCreationForm".to_string(),
                searched: vec!["users.forms".to_string()],
            });
        };
        let form = form.downcast::<FormClass>()?;
        let add_form = add_form.downcast::<FormClass>()?;

        let mut fieldsets = vec![fieldset(Some("User"), &["name"])];
        fieldsets.extend(auth_user_fieldsets());

        Ok(Self {
            form,
            add_form,
            fieldsets,
            list_display: vec![
                "username".to_string(),
                "name".to_string(),
                "is_superuser".to_string(),
            ],
            search_fields: vec!["name".to_string()],
        })
    }
}
