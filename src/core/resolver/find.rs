use std::sync::Arc;

use tracing::debug;

use crate::core::error::{MimError, MimResult};
use crate::core::model::{Plugin, PluginVersion, Server};
use crate::core::registry::Registries;

/// Which plugin versions to look for.
#[derive(Debug, Clone, Default)]
pub struct VersionQuery {
    pub name: Option<String>,
    pub id: Option<String>,
    /// Keep only versions that run on this loader (case-insensitive).
    pub loader: Option<String>,
    /// Minecraft version selector, wildcards allowed (`1.21.x`).
    pub server: Option<String>,
}

impl VersionQuery {
    pub fn new(name: Option<String>, id: Option<String>) -> Self {
        Self {
            name,
            id,
            ..Self::default()
        }
    }

    pub fn loader(mut self, loader: Option<String>) -> Self {
        self.loader = loader;
        self
    }

    pub fn server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }
}

/// Every version of the queried plugin across all plugin registries,
/// narrowed by loader and by Minecraft version. Versions without
/// compatibility information pass both filters.
pub async fn find_versions(
    registries: &Registries,
    query: &VersionQuery,
) -> MimResult<Vec<Arc<PluginVersion>>> {
    if query.name.is_none() && query.id.is_none() {
        return Err(MimError::Validation("name or id must be provided".into()));
    }

    let plugin = Plugin::new(query.name.clone(), query.id.clone());
    let found = plugin.versions(registries).await?;

    let servers = match &query.server {
        Some(selector) => Some(registries.search_servers(selector).await?),
        None => None,
    };

    let versions = filter_versions(found, query.loader.as_deref(), servers.as_deref());
    debug!(
        "{} of {} versions of {} passed the filters",
        versions.len(),
        found.len(),
        plugin.identity()
    );
    Ok(versions)
}

/// Apply the loader and server filters of [`find_versions`] to an already
/// fetched version list.
pub fn filter_versions(
    versions: &[Arc<PluginVersion>],
    loader: Option<&str>,
    servers: Option<&[Server]>,
) -> Vec<Arc<PluginVersion>> {
    versions
        .iter()
        .filter(|v| loader.map_or(true, |loader| v.supports_loader(loader)))
        .filter(|v| servers.map_or(true, |servers| v.is_compatible_with_any(servers)))
        .cloned()
        .collect()
}
