//! Adapter registry: loaded plugins keyed by product, with their lifecycle
//!
//! Every transition runs under the write lock, so readers never observe a
//! half-started or half-replaced plugin. Lookups used for dispatch only count
//! STARTED plugins.

use crate::domain::plugin::{BbcPlugin, ModuleLoader, PluginState};
use crate::shared::blocking::run_blocking;
use crate::shared::error::RegistryError;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct AdapterEntry {
    location: PathBuf,
    state: PluginState,
    /// Changes on every load or reload, never on stop or start
    incarnation: u64,
    plugin: Arc<dyn BbcPlugin>,
}

type PluginTable = HashMap<String, AdapterEntry>;

/// A started plugin together with the incarnation it belongs to.
///
/// Holds no lock. Work derived from the plugin is committed through
/// [`PluginRegistry::if_current`], which refuses it once a reload has
/// replaced the incarnation.
#[derive(Clone)]
pub struct PluginHandle {
    plugin: Arc<dyn BbcPlugin>,
    incarnation: u64,
}

impl PluginHandle {
    pub fn plugin(&self) -> &Arc<dyn BbcPlugin> {
        &self.plugin
    }

    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }
}

/// Registry of loaded adapters
pub struct PluginRegistry {
    repository: PathBuf,
    loader: Arc<dyn ModuleLoader>,
    plugins: Arc<RwLock<PluginTable>>,
    next_incarnation: AtomicU64,
}

impl PluginRegistry {
    pub fn new(repository: impl Into<PathBuf>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            repository: repository.into(),
            loader,
            plugins: Arc::new(RwLock::new(HashMap::new())),
            next_incarnation: AtomicU64::new(1),
        }
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Load every artifact found in the repository.
    ///
    /// Best effort: good artifacts are registered even when others fail, and
    /// the failures are reported together. Artifacts already registered from
    /// the same location are skipped.
    pub async fn load_plugins(&self) -> Result<Vec<String>, RegistryError> {
        let loader = self.loader.clone();
        let repository = self.repository.clone();
        let locations = run_blocking(move || loader.discover(&repository))
            .await
            .map_err(RegistryError::Load)??;

        let mut plugins = self.plugins.write().await;
        let mut loaded = Vec::new();
        let mut failures = Vec::new();

        for location in locations {
            if plugins.values().any(|e| same_location(&e.location, &location)) {
                debug!(location = %location.display(), "Plugin artifact already loaded");
                continue;
            }

            match self.load_into(&mut plugins, &location).await {
                Ok(product) => loaded.push(product),
                Err(e) => {
                    warn!(location = %location.display(), error = %e, "Failed to load plugin");
                    failures.push(e.to_string());
                }
            }
        }

        info!(loaded = loaded.len(), failed = failures.len(), "Plugin repository scanned");
        if failures.is_empty() {
            Ok(loaded)
        } else {
            Err(RegistryError::Load(failures.join("; ")))
        }
    }

    /// Start every LOADED plugin
    pub async fn start_plugins(&self) -> Result<Vec<String>, RegistryError> {
        let mut plugins = self.plugins.write().await;
        let mut started = Vec::new();
        let mut failures = Vec::new();

        for (product, entry) in plugins.iter_mut() {
            if entry.state != PluginState::Loaded {
                continue;
            }
            match start_entry(entry).await {
                Ok(()) => started.push(product.clone()),
                Err(reason) => {
                    warn!(product = %product, error = %reason, "Failed to start plugin");
                    failures.push(format!("{}: {}", product, reason));
                }
            }
        }

        if failures.is_empty() {
            Ok(started)
        } else {
            Err(RegistryError::Start(failures.join("; ")))
        }
    }

    /// Load the artifact at `path`; returns its product
    pub async fn load_plugin(&self, path: &Path) -> Result<String, RegistryError> {
        let mut plugins = self.plugins.write().await;
        self.load_into(&mut plugins, path).await
    }

    /// Start the plugin that was loaded from `path`
    pub async fn start_plugin(&self, path: &Path) -> Result<String, RegistryError> {
        let mut plugins = self.plugins.write().await;
        let (product, entry) = plugins
            .iter_mut()
            .find(|(_, e)| same_location(&e.location, path))
            .ok_or_else(|| {
                RegistryError::Start(format!("no plugin loaded from {}", path.display()))
            })?;

        if entry.state != PluginState::Loaded {
            return Err(RegistryError::InvalidState {
                product: product.clone(),
                state: entry.state,
                operation: "start",
            });
        }

        start_entry(entry)
            .await
            .map_err(|reason| RegistryError::Start(format!("{}: {}", product, reason)))?;
        info!(product = %product, "Plugin started");
        Ok(product.clone())
    }

    /// STARTED -> STOPPED; existing instances are left alone
    pub async fn stop_plugin(&self, product: &str) -> Result<(), RegistryError> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins
            .get_mut(product)
            .ok_or_else(|| RegistryError::NotFound(product.to_string()))?;

        if entry.state != PluginState::Started {
            return Err(RegistryError::InvalidState {
                product: product.to_string(),
                state: entry.state,
                operation: "stop",
            });
        }

        let plugin = entry.plugin.clone();
        run_blocking(move || plugin.on_stop())
            .await
            .map_err(|panic| RegistryError::Stop(format!("{}: {}", product, panic)))?
            .map_err(|e| RegistryError::Stop(format!("{}: {}", product, e)))?;

        entry.state = PluginState::Stopped;
        info!(product = %product, "Plugin stopped");
        Ok(())
    }

    /// STOPPED -> STARTED
    pub async fn start_plugin_from_stop(&self, product: &str) -> Result<(), RegistryError> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins
            .get_mut(product)
            .ok_or_else(|| RegistryError::NotFound(product.to_string()))?;

        if entry.state != PluginState::Stopped {
            return Err(RegistryError::InvalidState {
                product: product.to_string(),
                state: entry.state,
                operation: "start from stop",
            });
        }

        start_entry(entry)
            .await
            .map_err(|reason| RegistryError::StartFromStop(format!("{}: {}", product, reason)))?;
        info!(product = %product, "Plugin restarted from stop");
        Ok(())
    }

    /// Replace `product` with a fresh load from its current location, or from
    /// `new_path` when given, and start it.
    ///
    /// The swap is one step under the write lock. If the new plugin cannot be
    /// loaded or started the old one stays registered in its prior state.
    /// `on_replaced` runs after the swap, still under the lock, so no lookup
    /// can pair the new plugin with state that belonged to the old one.
    pub async fn reload_plugin<F>(
        &self,
        product: &str,
        new_path: Option<&Path>,
        on_replaced: F,
    ) -> Result<(), RegistryError>
    where
        F: FnOnce(&str),
    {
        let mut plugins = self.plugins.write().await;
        let location = {
            let entry = plugins
                .get(product)
                .ok_or_else(|| RegistryError::NotFound(product.to_string()))?;
            new_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| entry.location.clone())
        };

        let fresh = self
            .load_artifact(&location)
            .await
            .map_err(|e| RegistryError::Reload(format!("{}: {}", product, e)))?;

        if fresh.product() != product {
            let actual = fresh.product().to_string();
            self.loader.unload(&fresh);
            return Err(RegistryError::Reload(format!(
                "artifact {} provides '{}' instead of '{}'",
                location.display(),
                actual,
                product
            )));
        }

        let mut entry = AdapterEntry {
            location,
            state: PluginState::Loaded,
            incarnation: self.next_incarnation.fetch_add(1, Ordering::Relaxed),
            plugin: fresh,
        };
        if let Err(reason) = start_entry(&mut entry).await {
            self.loader.unload(&entry.plugin);
            return Err(RegistryError::Reload(format!("{}: {}", product, reason)));
        }

        if let Some(old) = plugins.insert(product.to_string(), entry) {
            if old.state == PluginState::Started {
                let plugin = old.plugin.clone();
                match run_blocking(move || plugin.on_stop()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(product = %product, error = %e, "Old plugin failed to stop during reload"),
                    Err(panic) => warn!(product = %product, error = %panic, "Old plugin panicked during reload"),
                }
            }
            self.loader.unload(&old.plugin);
        }

        on_replaced(product);
        info!(product = %product, "Plugin reloaded");
        Ok(())
    }

    /// Started plugin for `product`
    pub async fn get(&self, product: &str) -> Option<Arc<dyn BbcPlugin>> {
        let plugins = self.plugins.read().await;
        plugins
            .get(product)
            .filter(|e| e.state == PluginState::Started)
            .map(|e| e.plugin.clone())
    }

    /// Whether `product` is loaded and started
    pub async fn has(&self, product: &str) -> bool {
        let plugins = self.plugins.read().await;
        plugins
            .get(product)
            .is_some_and(|e| e.state == PluginState::Started)
    }

    /// Products that can currently serve requests, sorted
    pub async fn products(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        let mut products: Vec<String> = plugins
            .iter()
            .filter(|(_, e)| e.state == PluginState::Started)
            .map(|(p, _)| p.clone())
            .collect();
        products.sort();
        products
    }

    pub async fn state(&self, product: &str) -> PluginState {
        let plugins = self.plugins.read().await;
        plugins
            .get(product)
            .map(|e| e.state)
            .unwrap_or(PluginState::Unloaded)
    }

    /// State of every registered product
    pub async fn states(&self) -> BTreeMap<String, PluginState> {
        let plugins = self.plugins.read().await;
        plugins.iter().map(|(p, e)| (p.clone(), e.state)).collect()
    }

    /// The started plugin for `product` and its current incarnation
    pub async fn handle(&self, product: &str) -> Option<PluginHandle> {
        let plugins = self.plugins.read().await;
        plugins
            .get(product)
            .filter(|e| e.state == PluginState::Started)
            .map(|e| PluginHandle {
                plugin: e.plugin.clone(),
                incarnation: e.incarnation,
            })
    }

    /// Run `commit` only if `product` is still the given incarnation.
    ///
    /// `commit` runs under the read lock, so it cannot interleave with a
    /// reload and whatever it publishes is seen by the reload's eviction.
    /// It must not block.
    pub async fn if_current<R>(
        &self,
        product: &str,
        incarnation: u64,
        commit: impl FnOnce() -> R,
    ) -> Option<R> {
        let plugins = self.plugins.read().await;
        plugins
            .get(product)
            .filter(|e| e.incarnation == incarnation)
            .map(|_| commit())
    }

    async fn load_artifact(&self, location: &Path) -> Result<Arc<dyn BbcPlugin>, RegistryError> {
        let loader = self.loader.clone();
        let path = location.to_path_buf();
        let plugin = run_blocking(move || loader.load(&path))
            .await
            .map_err(RegistryError::Load)??;
        Ok(plugin)
    }

    async fn load_into(
        &self,
        plugins: &mut PluginTable,
        location: &Path,
    ) -> Result<String, RegistryError> {
        let plugin = self.load_artifact(location).await?;
        let product = plugin.product().to_string();

        if plugins.contains_key(&product) {
            self.loader.unload(&plugin);
            return Err(RegistryError::Duplicate(product));
        }

        plugins.insert(
            product.clone(),
            AdapterEntry {
                location: location.to_path_buf(),
                state: PluginState::Loaded,
                incarnation: self.next_incarnation.fetch_add(1, Ordering::Relaxed),
                plugin,
            },
        );
        info!(product = %product, location = %location.display(), "Plugin loaded");
        Ok(product)
    }
}

/// Run the start hook; the entry only becomes STARTED when it succeeds
async fn start_entry(entry: &mut AdapterEntry) -> Result<(), String> {
    let plugin = entry.plugin.clone();
    run_blocking(move || plugin.on_start())
        .await?
        .map_err(|e| e.to_string())?;
    entry.state = PluginState::Started;
    Ok(())
}

fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::{MockLoader, PluginSpec};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn create_test_registry(loader: Arc<MockLoader>) -> PluginRegistry {
        PluginRegistry::new("/repo", loader)
    }

    #[tokio::test]
    async fn test_load_then_start_transitions() {
        let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
        let registry = create_test_registry(loader);

        assert_eq!(registry.state("chainA").await, PluginState::Unloaded);
        let product = registry.load_plugin(Path::new("/repo/a")).await.unwrap();
        assert_eq!(product, "chainA");
        assert_eq!(registry.state("chainA").await, PluginState::Loaded);
        assert!(!registry.has("chainA").await);

        registry.start_plugin(Path::new("/repo/a")).await.unwrap();
        assert_eq!(registry.state("chainA").await, PluginState::Started);
        assert!(registry.has("chainA").await);
        assert_eq!(registry.products().await, vec!["chainA".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_product_is_rejected() {
        let loader = Arc::new(
            MockLoader::new()
                .with_artifact("/repo/a", PluginSpec::new("chainA"))
                .with_artifact("/other/a2", PluginSpec::new("chainA")),
        );
        let registry = create_test_registry(loader.clone());

        registry.load_plugin(Path::new("/repo/a")).await.unwrap();
        let err = registry.load_plugin(Path::new("/other/a2")).await.unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("chainA".to_string()));
        assert_eq!(loader.unloads(), 1);
    }

    #[tokio::test]
    async fn test_load_plugins_is_best_effort() {
        let loader = Arc::new(
            MockLoader::new()
                .with_artifact("/repo/a", PluginSpec::new("chainA"))
                .with_artifact("/repo/b", PluginSpec::new("chainB"))
                .with_broken_artifact("/repo/broken"),
        );
        let registry = create_test_registry(loader);

        let err = registry.load_plugins().await.unwrap_err();
        assert!(matches!(err, RegistryError::Load(ref m) if m.contains("/repo/broken")));
        assert_eq!(registry.state("chainA").await, PluginState::Loaded);
        assert_eq!(registry.state("chainB").await, PluginState::Loaded);

        // second scan skips what is already registered
        let err = registry.load_plugins().await.unwrap_err();
        assert!(!err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn test_start_plugins_keeps_failed_plugin_loaded() {
        let loader = Arc::new(
            MockLoader::new()
                .with_artifact("/repo/a", PluginSpec::new("chainA"))
                .with_artifact("/repo/b", PluginSpec::new("chainB").failing_start()),
        );
        let registry = create_test_registry(loader);
        registry.load_plugins().await.unwrap();

        let err = registry.start_plugins().await.unwrap_err();
        assert!(matches!(err, RegistryError::Start(ref m) if m.contains("chainB")));
        assert_eq!(registry.state("chainA").await, PluginState::Started);
        assert_eq!(registry.state("chainB").await, PluginState::Loaded);
    }

    #[tokio::test]
    async fn test_start_plugin_requires_loaded_location() {
        let loader = Arc::new(MockLoader::new());
        let registry = create_test_registry(loader);
        let err = registry.start_plugin(Path::new("/repo/missing")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Start(_)));
    }

    #[tokio::test]
    async fn test_stop_and_start_from_stop() {
        let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
        let registry = create_test_registry(loader);
        registry.load_plugins().await.unwrap();
        registry.start_plugins().await.unwrap();

        registry.stop_plugin("chainA").await.unwrap();
        assert_eq!(registry.state("chainA").await, PluginState::Stopped);
        assert!(!registry.has("chainA").await);
        assert!(registry.get("chainA").await.is_none());
        assert!(registry.products().await.is_empty());

        let err = registry.stop_plugin("chainA").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidState { state: PluginState::Stopped, .. }));

        registry.start_plugin_from_stop("chainA").await.unwrap();
        assert!(registry.has("chainA").await);

        let err = registry.start_plugin_from_stop("chainA").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidState { state: PluginState::Started, .. }));
    }

    #[tokio::test]
    async fn test_failing_stop_leaves_plugin_started() {
        let loader = Arc::new(
            MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA").failing_stop()),
        );
        let registry = create_test_registry(loader);
        registry.load_plugins().await.unwrap();
        registry.start_plugins().await.unwrap();

        let err = registry.stop_plugin("chainA").await.unwrap_err();
        assert!(matches!(err, RegistryError::Stop(_)));
        assert_eq!(registry.state("chainA").await, PluginState::Started);
    }

    #[tokio::test]
    async fn test_stop_unknown_product() {
        let registry = create_test_registry(Arc::new(MockLoader::new()));
        let err = registry.stop_plugin("nope").await.unwrap_err();
        assert_eq!(err, RegistryError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_reload_swaps_incarnation_and_notifies() {
        let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
        let registry = create_test_registry(loader.clone());
        registry.load_plugins().await.unwrap();
        registry.start_plugins().await.unwrap();
        let before = registry.get("chainA").await.unwrap();

        let notified = AtomicBool::new(false);
        registry
            .reload_plugin("chainA", None, |product| {
                assert_eq!(product, "chainA");
                notified.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();

        let after = registry.get("chainA").await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(notified.load(Ordering::SeqCst));
        assert_eq!(registry.state("chainA").await, PluginState::Started);
        assert_eq!(loader.unloads(), 1);
    }

    #[tokio::test]
    async fn test_reload_in_new_path() {
        let loader = Arc::new(
            MockLoader::new()
                .with_artifact("/repo/a", PluginSpec::new("chainA"))
                .with_artifact("/next/a", PluginSpec::new("chainA")),
        );
        let registry = create_test_registry(loader);
        registry.load_plugin(Path::new("/repo/a")).await.unwrap();

        registry
            .reload_plugin("chainA", Some(Path::new("/next/a")), |_| {})
            .await
            .unwrap();
        assert_eq!(registry.state("chainA").await, PluginState::Started);

        // the entry now lives at the new location
        let err = registry.start_plugin(Path::new("/repo/a")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Start(_)));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_old_plugin() {
        let loader = Arc::new(
            MockLoader::new()
                .with_artifact("/repo/a", PluginSpec::new("chainA"))
                .with_artifact("/next/b", PluginSpec::new("chainB"))
                .with_artifact("/next/bad", PluginSpec::new("chainA").failing_start()),
        );
        let registry = create_test_registry(loader);
        registry.load_plugin(Path::new("/repo/a")).await.unwrap();
        registry.start_plugin(Path::new("/repo/a")).await.unwrap();
        let before = registry.get("chainA").await.unwrap();

        let err = registry
            .reload_plugin("chainA", Some(Path::new("/next/b")), |_| panic!("must not run"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Reload(ref m) if m.contains("chainB")));

        let err = registry
            .reload_plugin("chainA", Some(Path::new("/next/bad")), |_| panic!("must not run"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Reload(_)));

        let err = registry
            .reload_plugin("chainA", Some(Path::new("/next/missing")), |_| panic!("must not run"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Reload(_)));

        let after = registry.get("chainA").await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_reload_unknown_product() {
        let registry = create_test_registry(Arc::new(MockLoader::new()));
        let err = registry.reload_plugin("nope", None, |_| {}).await.unwrap_err();
        assert_eq!(err, RegistryError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_handle_only_for_started_plugins() {
        let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
        let registry = create_test_registry(loader);
        registry.load_plugins().await.unwrap();
        assert!(registry.handle("chainA").await.is_none());

        registry.start_plugins().await.unwrap();
        let handle = registry.handle("chainA").await.unwrap();
        assert_eq!(handle.plugin().product(), "chainA");

        let states = registry.states().await;
        assert_eq!(states.get("chainA"), Some(&PluginState::Started));
    }

    #[tokio::test]
    async fn test_incarnation_survives_stop_but_not_reload() {
        let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
        let registry = create_test_registry(loader);
        registry.load_plugins().await.unwrap();
        registry.start_plugins().await.unwrap();
        let first = registry.handle("chainA").await.unwrap().incarnation();

        registry.stop_plugin("chainA").await.unwrap();
        assert_eq!(registry.if_current("chainA", first, || 7).await, Some(7));
        registry.start_plugin_from_stop("chainA").await.unwrap();
        assert_eq!(registry.handle("chainA").await.unwrap().incarnation(), first);

        registry.reload_plugin("chainA", None, |_| {}).await.unwrap();
        let second = registry.handle("chainA").await.unwrap().incarnation();
        assert_ne!(first, second);
        assert_eq!(registry.if_current("chainA", first, || 7).await, None);
        assert_eq!(registry.if_current("chainA", second, || 7).await, Some(7));
        assert_eq!(registry.if_current("chainB", second, || 7).await, None);
    }

    #[tokio::test]
    async fn test_transitions_not_blocked_by_outstanding_handle() {
        let loader = Arc::new(MockLoader::new().with_artifact("/repo/a", PluginSpec::new("chainA")));
        let registry = create_test_registry(loader);
        registry.load_plugins().await.unwrap();
        registry.start_plugins().await.unwrap();

        let _handle = registry.handle("chainA").await.unwrap();
        let stopped = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            registry.stop_plugin("chainA"),
        )
        .await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }
}
