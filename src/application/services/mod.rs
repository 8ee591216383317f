//! Application services - Registry, instance directory and dispatch

pub mod bbc_dispatcher;
pub mod instance_directory;
pub mod plugin_registry;

pub use bbc_dispatcher::{route, BbcDispatcher, Route};
pub use instance_directory::InstanceDirectory;
pub use plugin_registry::{PluginHandle, PluginRegistry};
