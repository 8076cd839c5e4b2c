use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::error::{MimError, MimResult};
use crate::core::manifest::{InstallManifest, PluginEntry};
use crate::core::model::{Plugin, PluginVersion, Server};
use crate::core::registry::Registries;
use crate::core::resolver::{filter_versions, sort_versions_desc, AssetFilter};

/// One manifest entry resolved to a concrete version.
#[derive(Debug)]
pub struct PlannedPlugin {
    pub entry: PluginEntry,
    pub selected: Arc<PluginVersion>,
    /// Every version any registry reports for the plugin, unfiltered. Used to
    /// recognise whatever version is already installed.
    pub known: Vec<Arc<PluginVersion>>,
    pub filter: AssetFilter,
}

/// The server and plugin versions chosen for a manifest.
#[derive(Debug)]
pub struct InstallPlan {
    pub server: Server,
    pub plugins: Vec<PlannedPlugin>,
    /// No server satisfied both pinned and unpinned plugins; the choice only
    /// honours the unpinned ones.
    pub at_risk: bool,
}

/// Candidates for one entry after every filter has been applied.
struct Candidates {
    entry: PluginEntry,
    versions: Vec<Arc<PluginVersion>>,
    known: Vec<Arc<PluginVersion>>,
    filter: AssetFilter,
}

impl Candidates {
    /// Keep only `servers` that at least one candidate runs on. Unconstrained
    /// candidates keep every server.
    fn narrow(&self, servers: &mut Vec<Server>) {
        servers.retain(|server| self.versions.iter().any(|v| v.is_compatible_with(server)));
    }
}

/// Pick one server and one version per plugin satisfying the manifest.
///
/// Nothing is downloaded; the registries are only searched. Fails on the
/// first entry that cannot be resolved.
pub async fn plan_install(
    registries: &Registries,
    manifest: &InstallManifest,
) -> MimResult<InstallPlan> {
    let selector = manifest.version.as_str();
    let loader = manifest.loader.as_str();

    let matching_servers = registries.search_servers(selector).await?;
    let servers: Vec<Server> = matching_servers
        .iter()
        .filter(|server| server.is_loader(loader))
        .cloned()
        .collect();
    if servers.is_empty() {
        return Err(MimError::NotFound(format!(
            "No matching server found for version {} and loader {}",
            selector, loader
        )));
    }

    let mut resolved = Vec::with_capacity(manifest.plugins.len());
    let mut pinned_servers = servers.clone();
    let mut unpinned_servers = servers;

    for entry in &manifest.plugins {
        let candidates = resolve_entry(registries, entry, loader, &matching_servers).await?;
        if entry.is_pinned() {
            candidates.narrow(&mut pinned_servers);
        } else {
            candidates.narrow(&mut unpinned_servers);
        }
        resolved.push(candidates);
    }

    let (mut chosen_set, at_risk) = if pinned_servers.is_empty() {
        (unpinned_servers, true)
    } else {
        let both: Vec<Server> = pinned_servers
            .into_iter()
            .filter(|s| unpinned_servers.contains(s))
            .collect();
        if both.is_empty() {
            (unpinned_servers, true)
        } else {
            (both, false)
        }
    };
    if at_risk {
        warn!(
            "No server version {} with loader {} is compatible with all plugins. Continuing at risk",
            selector, loader
        );
    }

    sort_versions_desc(&mut chosen_set, |s| s.server_version.as_str());
    let server = chosen_set.into_iter().next().ok_or_else(|| {
        MimError::NotFound(format!(
            "No server version {} with loader {} found compatible with all plugins. \
             Specify plugin versions manually to override.",
            selector, loader
        ))
    })?;
    info!("Selected server {}", server);

    let plugins = resolved
        .into_iter()
        .map(|candidates| select_version(candidates, &server))
        .collect::<MimResult<Vec<_>>>()?;

    Ok(InstallPlan {
        server,
        plugins,
        at_risk,
    })
}

async fn resolve_entry(
    registries: &Registries,
    entry: &PluginEntry,
    loader: &str,
    matching_servers: &[Server],
) -> MimResult<Candidates> {
    let plugin = Plugin::new(Some(entry.name.clone()), entry.id.clone());
    let known = plugin.versions(registries).await?.to_vec();

    let mut versions = filter_versions(&known, Some(loader), Some(matching_servers));
    if let Some(pin) = &entry.version {
        versions.retain(|v| v.version() == pin);
    }
    if versions.is_empty() {
        return Err(MimError::NotFound(format!(
            "No versions found for {}",
            plugin.identity()
        )));
    }

    let filter = AssetFilter::new(&entry.assets)?;
    if !filter.is_empty() {
        let mut providing = Vec::with_capacity(versions.len());
        for version in versions {
            if filter.matches_all(version.assets(registries).await?) {
                providing.push(version);
            }
        }
        versions = providing;

        if versions.is_empty() {
            return Err(MimError::NotFound(format!(
                "No versions found providing required assets for {}{}",
                entry.name,
                entry.version.as_deref().map(|v| format!(" {}", v)).unwrap_or_default()
            )));
        }
    }

    debug!("{} candidate versions for {}", versions.len(), entry.name);
    Ok(Candidates {
        entry: entry.clone(),
        versions,
        known,
        filter,
    })
}

fn select_version(candidates: Candidates, server: &Server) -> MimResult<PlannedPlugin> {
    let Candidates {
        entry,
        mut versions,
        known,
        filter,
    } = candidates;

    let selected = if entry.is_pinned() {
        // Several registries may publish the same pinned version.
        versions
            .iter()
            .find(|v| v.is_compatible_with(server))
            .or_else(|| versions.first())
            .cloned()
    } else {
        versions.retain(|v| v.is_compatible_with(server));
        sort_versions_desc(&mut versions, |v| v.version());
        versions.into_iter().next()
    };

    let selected = selected.ok_or_else(|| {
        MimError::NotFound(format!(
            "No version of {} is compatible with {}",
            entry.name, server
        ))
    })?;
    debug!("Selected {} from {}", selected.label(), selected.registry());

    Ok(PlannedPlugin {
        entry,
        selected,
        known,
        filter,
    })
}
