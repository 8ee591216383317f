//! Plugin model: the adapter handle, its lifecycle, and the loader seam

use crate::domain::bbc::{BbcError, BbcService};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle state of a plugin inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
    Unloaded,
    Loaded,
    Started,
    Stopped,
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginState::Unloaded => write!(f, "unloaded"),
            PluginState::Loaded => write!(f, "loaded"),
            PluginState::Started => write!(f, "started"),
            PluginState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Plugin lifecycle hook failure
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct PluginError(pub String);

/// Loaded adapter code for one product.
///
/// The registry owns the handle; `create_service` is the instance factory the
/// directory calls once per domain.
pub trait BbcPlugin: Send + Sync {
    fn product(&self) -> &str;

    fn on_start(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_stop(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn create_service(&self, domain: &str) -> Result<Box<dyn BbcService>, BbcError>;
}

/// Loader failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("failed to read plugin repository {path}: {reason}")]
    Repository { path: PathBuf, reason: String },

    #[error("failed to read plugin artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("invalid plugin manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("no plugin factory named '{factory}' for {path}")]
    UnknownFactory { path: PathBuf, factory: String },

    #[error("plugin at {path} declares product '{declared}' but built '{actual}'")]
    ProductMismatch {
        path: PathBuf,
        declared: String,
        actual: String,
    },
}

/// Turns packaged artifacts into callable plugins.
///
/// Implementations may link plugins statically, open shared libraries or
/// proxy to a sandbox process; the registry only relies on this contract.
pub trait ModuleLoader: Send + Sync {
    /// List candidate artifact locations under `repository`
    fn discover(&self, repository: &Path) -> Result<Vec<PathBuf>, LoadError>;

    fn load(&self, location: &Path) -> Result<Arc<dyn BbcPlugin>, LoadError>;

    /// Release whatever `load` acquired for `plugin`
    fn unload(&self, _plugin: &Arc<dyn BbcPlugin>) {}
}
