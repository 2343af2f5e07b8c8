pub mod application;
pub mod loading;
pub mod modules;
pub mod registry;
pub mod urls;
pub mod views;

pub use crate::domain::model::{AppRegistryEntry, ModuleLabel, PermissionSpec};
pub use crate::domain::module::{ClassRef, ImportOutcome, Module, ModuleBuilder};
pub use crate::domain::ports::{AppRegistry, ClassLoader, ModuleSource};
pub use crate::utils::error::Result;
