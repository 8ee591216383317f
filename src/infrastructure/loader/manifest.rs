//! Manifest-driven module loader
//!
//! Plugins are linked into the binary and registered under a factory name. A
//! plugin artifact is a TOML manifest that picks a factory and names the
//! product it serves:
//!
//! ```toml
//! product = "chainA"
//! factory = "simulator"
//! version = "0.1.0"
//!
//! [settings]
//! initial_height = 100
//! ```
//!
//! An artifact is either a `*.toml` file or a directory holding `plugin.toml`.

use crate::domain::plugin::{BbcPlugin, LoadError, ModuleLoader};
use crate::infrastructure::adapters::simulator::{
    SimulatorPlugin, SimulatorSettings, SIMULATOR_FACTORY,
};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

const MANIFEST_FILE: &str = "plugin.toml";
const PRODUCT_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$";

/// Parsed plugin manifest
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PluginManifest {
    #[validate(length(min = 1, max = 64))]
    pub product: String,

    #[validate(length(min = 1))]
    pub factory: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Factory-specific settings
    #[serde(default)]
    pub settings: toml::Table,
}

impl PluginManifest {
    /// Deserialize the `[settings]` table into a factory's settings type
    pub fn settings_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        toml::Value::Table(self.settings.clone())
            .try_into::<T>()
            .map_err(|e| e.to_string())
    }
}

/// Builds a plugin from its manifest
pub type PluginFactory =
    Arc<dyn Fn(&PluginManifest) -> Result<Arc<dyn BbcPlugin>, String> + Send + Sync>;

/// Loader over a table of statically registered plugin factories
pub struct ManifestModuleLoader {
    factories: HashMap<String, PluginFactory>,
}

impl ManifestModuleLoader {
    /// Loader with no factories
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Loader with the factories shipped in this crate
    pub fn with_builtin_factories() -> Self {
        let mut loader = Self::empty();
        loader.register(SIMULATOR_FACTORY, |manifest| {
            let settings: SimulatorSettings = manifest.settings_as()?;
            let plugin: Arc<dyn BbcPlugin> =
                Arc::new(SimulatorPlugin::new(manifest.product.clone(), settings));
            Ok(plugin)
        });
        loader
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&PluginManifest) -> Result<Arc<dyn BbcPlugin>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    pub fn factory_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read and validate the manifest behind `location`
    pub fn read_manifest(&self, location: &Path) -> Result<PluginManifest, LoadError> {
        let file = if location.is_dir() {
            location.join(MANIFEST_FILE)
        } else {
            location.to_path_buf()
        };

        let raw = std::fs::read_to_string(&file).map_err(|e| LoadError::Artifact {
            path: location.to_path_buf(),
            reason: e.to_string(),
        })?;

        let manifest: PluginManifest = toml::from_str(&raw).map_err(|e| LoadError::Manifest {
            path: location.to_path_buf(),
            reason: e.to_string(),
        })?;

        manifest.validate().map_err(|e| LoadError::Manifest {
            path: location.to_path_buf(),
            reason: e.to_string(),
        })?;
        validate_product(location, &manifest.product)?;

        Ok(manifest)
    }
}

impl Default for ManifestModuleLoader {
    fn default() -> Self {
        Self::with_builtin_factories()
    }
}

fn validate_product(location: &Path, product: &str) -> Result<(), LoadError> {
    let valid = match Regex::new(PRODUCT_PATTERN) {
        Ok(re) => re.is_match(product),
        Err(e) => {
            return Err(LoadError::Manifest {
                path: location.to_path_buf(),
                reason: format!("product pattern: {}", e),
            })
        }
    };

    if valid {
        Ok(())
    } else {
        Err(LoadError::Manifest {
            path: location.to_path_buf(),
            reason: format!("invalid product identifier '{}'", product),
        })
    }
}

fn is_artifact(path: &Path) -> bool {
    if path.is_dir() {
        path.join(MANIFEST_FILE).is_file()
    } else {
        path.extension().is_some_and(|ext| ext == "toml")
    }
}

impl ModuleLoader for ManifestModuleLoader {
    fn discover(&self, repository: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let entries = std::fs::read_dir(repository).map_err(|e| LoadError::Repository {
            path: repository.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut artifacts: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_artifact(path))
            .collect();
        artifacts.sort();

        debug!(repository = %repository.display(), count = artifacts.len(), "Discovered plugin artifacts");
        Ok(artifacts)
    }

    fn load(&self, location: &Path) -> Result<Arc<dyn BbcPlugin>, LoadError> {
        let manifest = self.read_manifest(location)?;

        let factory = self
            .factories
            .get(&manifest.factory)
            .ok_or_else(|| LoadError::UnknownFactory {
                path: location.to_path_buf(),
                factory: manifest.factory.clone(),
            })?;

        let plugin = factory(&manifest).map_err(|reason| LoadError::Artifact {
            path: location.to_path_buf(),
            reason,
        })?;

        if plugin.product() != manifest.product {
            return Err(LoadError::ProductMismatch {
                path: location.to_path_buf(),
                declared: manifest.product,
                actual: plugin.product().to_string(),
            });
        }

        debug!(
            product = %manifest.product,
            factory = %manifest.factory,
            version = manifest.version.as_deref().unwrap_or("-"),
            "Plugin manifest loaded"
        );
        Ok(plugin)
    }
}
