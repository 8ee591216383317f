//! Module loaders

pub mod manifest;

pub use manifest::{ManifestModuleLoader, PluginFactory, PluginManifest};
