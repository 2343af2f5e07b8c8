use thiserror::Error;

#[derive(Error, Debug)]
pub enum RealzError {
    #[error("Importing from top-level modules is not supported: '{label}'")]
    InvalidModuleLabel { label: String },

    #[error(
        "The module with label '{label}' could not be imported. This either means that it \
         indeed does not exist, or you might have a problem with a circular import"
    )]
    ModuleResolutionError { label: String },

    #[error("No class '{class_name}' found in {}", searched.join(", "))]
    ClassNotFoundError {
        class_name: String,
        searched: Vec<String>,
    },

    #[error("Couldn't find {reason} to import {label} from")]
    AppNotFoundError { label: String, reason: String },

    #[error(
        "Passed in kwargs can't be named the same as properties of AppConfig; clashing: {}",
        keys.join(", ")
    )]
    ConfigurationConflictError { keys: Vec<String> },

    #[error("Module '{module}' raised while being initialized: {source}")]
    ModuleLoadError {
        module: String,
        #[source]
        source: Box<RealzError>,
    },

    #[error("Class '{class_name}' is not a {expected}")]
    ClassTypeMismatch {
        class_name: String,
        expected: &'static str,
    },

    #[error("Unknown dynamic class loader: '{name}'")]
    UnknownClassLoader { name: String },

    #[error("Access denied{}", view.as_ref().map(|v| format!(" to '{}'", v)).unwrap_or_default())]
    AccessDenied { view: Option<String> },

    #[error("No URL pattern named '{name}'")]
    NoReverseMatch { name: String },

    #[error("Improperly configured: {message}")]
    ImproperlyConfigured { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤類別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    Configuration,
    Access,
    System,
}

/// 錯誤嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RealzError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RealzError::InvalidModuleLabel { .. }
            | RealzError::ModuleResolutionError { .. }
            | RealzError::ClassNotFoundError { .. }
            | RealzError::AppNotFoundError { .. }
            | RealzError::ModuleLoadError { .. }
            | RealzError::ClassTypeMismatch { .. }
            | RealzError::NoReverseMatch { .. } => ErrorCategory::Resolution,
            RealzError::ConfigurationConflictError { .. }
            | RealzError::UnknownClassLoader { .. }
            | RealzError::ImproperlyConfigured { .. }
            | RealzError::ConfigValidationError { .. }
            | RealzError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            RealzError::AccessDenied { .. } => ErrorCategory::Access,
            RealzError::IoError(_) | RealzError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 單一請求被拒，不影響其他請求
            ErrorCategory::Access => ErrorSeverity::Low,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Resolution => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 提供修復建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RealzError::InvalidModuleLabel { .. } => {
                "Use a dotted module label such as 'users.views'"
            }
            RealzError::ModuleResolutionError { .. } => {
                "Register the module in the base package or in the local app package"
            }
            RealzError::ClassNotFoundError { .. } => {
                "Check the class name and that the module initializer registers it"
            }
            RealzError::AppNotFoundError { .. } => {
                "Add the app to [[installed_apps]] with core = true"
            }
            RealzError::ConfigurationConflictError { .. } => {
                "Rename the option so it doesn't shadow an AppConfig property"
            }
            RealzError::UnknownClassLoader { .. } => {
                "Set dynamic_class_loader to a registered loader name (e.g. 'default')"
            }
            RealzError::AccessDenied { .. } => "Log in with an account holding the permission",
            RealzError::ConfigValidationError { .. }
            | RealzError::InvalidConfigValueError { .. }
            | RealzError::ImproperlyConfigured { .. } => "Review the settings file",
            _ => "See the logs for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, RealzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_not_found_lists_searched_modules() {
        let err = RealzError::ClassNotFoundError {
            class_name: "Missing".to_string(),
            searched: vec![
                "myproject.users.forms".to_string(),
                "realzhub.apps.users.forms".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "No class 'Missing' found in myproject.users.forms, realzhub.apps.users.forms"
        );
    }

    #[test]
    fn test_access_denied_is_low_severity() {
        let err = RealzError::AccessDenied {
            view: Some("detail".to_string()),
        };
        assert_eq!(err.category(), ErrorCategory::Access);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.to_string(), "Access denied to 'detail'");
    }

    #[test]
    fn test_conflict_names_keys() {
        let err = RealzError::ConfigurationConflictError {
            keys: vec!["label".to_string(), "path".to_string()],
        };
        assert!(err.to_string().ends_with("clashing: label, path"));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
