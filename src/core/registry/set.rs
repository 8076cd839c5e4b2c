use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::traits::{PluginRegistry, ServerRegistry};
use crate::core::error::{MimError, MimResult};
use crate::core::model::{PluginAsset, PluginIdentity, PluginVersion, Server, VersionPattern};

/// Registries of one kind, keyed by lowercase name and kept in
/// registration order. Adding a registry under an existing name replaces it
/// in place.
pub struct RegistrySet<T: ?Sized> {
    entries: Vec<(String, Arc<T>)>,
}

impl<T: ?Sized> Default for RegistrySet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> RegistrySet<T> {
    pub fn insert(&mut self, name: &str, registry: Arc<T>) {
        let key = name.to_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = registry,
            None => self.entries.push((key, registry)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<T>> {
        let key = name.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, registry)| registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter().map(|(_, registry)| registry)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type ServerRegistries = RegistrySet<dyn ServerRegistry>;
pub type PluginRegistries = RegistrySet<dyn PluginRegistry>;

impl RegistrySet<dyn ServerRegistry> {
    pub fn add<R: ServerRegistry + 'static>(&mut self, registry: R) {
        let name = registry.info().name.clone();
        self.insert(&name, Arc::new(registry));
    }

    /// Query every server registry for `selector` and concatenate the
    /// results in registration order.
    pub async fn search_all(&self, selector: &str) -> MimResult<Vec<Server>> {
        let pattern = VersionPattern::parse(selector)?;
        let mut results = Vec::new();
        for registry in self.iter() {
            if let Some(found) = registry.search(&pattern).await? {
                debug!(
                    "{} matched {} servers for {}",
                    registry.info().name,
                    found.len(),
                    selector
                );
                results.extend(found);
            }
        }
        Ok(results)
    }
}

impl RegistrySet<dyn PluginRegistry> {
    pub fn add<R: PluginRegistry + 'static>(&mut self, registry: R) {
        let name = registry.info().name.clone();
        self.insert(&name, Arc::new(registry));
    }

    /// Query every plugin registry for `plugin` and concatenate the
    /// non-`None` results in registration order.
    pub async fn search_all(
        &self,
        plugin: &Arc<PluginIdentity>,
        servers: &ServerRegistries,
    ) -> MimResult<Vec<PluginVersion>> {
        let mut results = Vec::new();
        for registry in self.iter() {
            match registry.search(plugin, servers).await? {
                Some(found) => {
                    debug!(
                        "{} returned {} versions for {}",
                        registry.info().name,
                        found.len(),
                        plugin
                    );
                    results.extend(found);
                }
                None => debug!("{} cannot search for {}", registry.info().name, plugin),
            }
        }
        Ok(results)
    }
}

/// The explicit registry-of-registries handed to the resolver and the
/// installer. Built once at startup with every adapter that should take part
/// in fan-out searches.
#[derive(Default)]
pub struct Registries {
    pub servers: ServerRegistries,
    pub plugins: PluginRegistries,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_server<R: ServerRegistry + 'static>(&mut self, registry: R) -> &mut Self {
        self.servers.add(registry);
        self
    }

    pub fn add_plugin<R: PluginRegistry + 'static>(&mut self, registry: R) -> &mut Self {
        self.plugins.add(registry);
        self
    }

    pub async fn search_servers(&self, selector: &str) -> MimResult<Vec<Server>> {
        self.servers.search_all(selector).await
    }

    pub async fn search_plugins(&self, plugin: &Arc<PluginIdentity>) -> MimResult<Vec<PluginVersion>> {
        self.plugins.search_all(plugin, &self.servers).await
    }

    pub fn plugin_registry(&self, name: &str) -> MimResult<&Arc<dyn PluginRegistry>> {
        self.plugins
            .get(name)
            .ok_or_else(|| MimError::UnknownRegistry(name.to_string()))
    }

    pub fn server_registry(&self, name: &str) -> MimResult<&Arc<dyn ServerRegistry>> {
        self.servers
            .get(name)
            .ok_or_else(|| MimError::UnknownRegistry(name.to_string()))
    }

    // ── Dispatch to the owning registry ─────────────────

    pub async fn install_asset(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf> {
        self.plugin_registry(asset.registry())?
            .install(asset, destination)
            .await
    }

    pub async fn uninstall_asset(
        &self,
        asset: &PluginAsset,
        destination: &Path,
    ) -> MimResult<Option<PathBuf>> {
        self.plugin_registry(asset.registry())?
            .uninstall(asset, destination)
            .await
    }

    pub async fn install_server(&self, server: &Server, destination: &Path) -> MimResult<PathBuf> {
        self.server_registry(&server.registry)?
            .install(server, destination)
            .await
    }

    pub async fn uninstall_server(
        &self,
        server: &Server,
        destination: &Path,
    ) -> MimResult<Option<PathBuf>> {
        self.server_registry(&server.registry)?
            .uninstall(server, destination)
            .await
    }

    /// Every build known to the registry that owns `server`.
    pub async fn known_servers(&self, server: &Server) -> MimResult<&[Server]> {
        self.server_registry(&server.registry)?.list().await
    }
}
