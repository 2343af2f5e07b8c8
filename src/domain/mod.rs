// Domain layer: core models and ports (interfaces). No framework wiring here.

pub mod content;
pub mod model;
pub mod module;
pub mod ports;
pub mod principal;
