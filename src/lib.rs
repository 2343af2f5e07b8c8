pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::app::{Project, ProjectBuilder};
pub use crate::config::Settings;
pub use crate::core::application::{AppConfig, Application};
pub use crate::core::loading::Loader;
pub use crate::core::views::decorators::{check_permissions, permissions_required, AccessOutcome};
pub use crate::domain::principal::{AnonymousUser, Principal, User};
pub use crate::utils::error::{RealzError, Result};
