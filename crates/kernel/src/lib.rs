//! Core building blocks for the shelf service: layered settings, the module
//! trait, and the module registry.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
