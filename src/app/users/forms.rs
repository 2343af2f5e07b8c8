use crate::core::modules::ModuleRegistry;

pub const MODULE: &str = "realzhub.apps.users.forms";

/// 表單類別：對應的 model 與欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormClass {
    pub name: String,
    pub model: String,
    pub fields: Vec<String>,
    pub error_messages: Vec<(String, String)>,
}

impl FormClass {
    pub fn new(name: &str, model: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            error_messages: Vec::new(),
        }
    }

    pub fn with_error_message(mut self, code: &str, message: &str) -> Self {
        self.error_messages
            .push((code.to_string(), message.to_string()));
        self
    }
}

pub fn register(registry: &mut ModuleRegistry) {
    registry.register(MODULE, |module| {
        module
            .class(
                "UserChangeForm",
                FormClass::new("UserChangeForm", "users.User", &["username", "name", "email"]),
            )
            .class(
                "UserCreationForm",
                FormClass::new(
                    "UserCreationForm",
                    "users.User",
                    &["username", "password1", "password2"],
                )
                .with_error_message("duplicate_username", "This username has already been taken."),
            );
        Ok(())
    });
}
