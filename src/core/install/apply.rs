use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::plan::{InstallPlan, PlannedPlugin};
use super::report::{Action, InstallReport, PluginOutcome, ServerOutcome};
use crate::core::error::{MimError, MimResult};
use crate::core::model::{PluginVersion, Server};
use crate::core::registry::Registries;

pub const PLUGIN_DIR: &str = "plugins";

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Reinstall even when the selection is already present.
    pub force: bool,
    /// Resolve and compare only; touch nothing on disk.
    pub dry_run: bool,
}

async fn exists(path: &Path) -> MimResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| MimError::io(path, e))
}

/// Servers from the registry owning `server` whose jar is present in
/// `destination`.
pub async fn installed_servers(
    registries: &Registries,
    server: &Server,
    destination: &Path,
) -> MimResult<Vec<Server>> {
    let mut found: Vec<Server> = Vec::new();
    for known in registries.known_servers(server).await? {
        if !found.contains(known) && exists(&destination.join(known.asset())).await? {
            found.push(known.clone());
        }
    }
    Ok(found)
}

/// Versions among `versions` with at least one asset present in
/// `plugin_dir`.
pub async fn installed_plugin_versions(
    registries: &Registries,
    versions: &[Arc<PluginVersion>],
    plugin_dir: &Path,
) -> MimResult<Vec<Arc<PluginVersion>>> {
    let mut found = Vec::new();
    for version in versions {
        for asset in version.assets(registries).await? {
            if exists(&plugin_dir.join(&asset.filename)).await? {
                found.push(Arc::clone(version));
                break;
            }
        }
    }
    Ok(found)
}

/// Bring `destination` in line with `plan`.
///
/// A selection is left alone when it is the only thing detected and `force`
/// is off. Otherwise it is installed first and every other detected
/// installation is removed afterwards.
pub async fn apply_plan(
    registries: &Registries,
    plan: &InstallPlan,
    destination: &Path,
    options: InstallOptions,
) -> MimResult<InstallReport> {
    if !options.dry_run {
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| MimError::io(destination, e))?;
    }

    let server = apply_server(registries, &plan.server, destination, options).await?;

    let plugin_dir = destination.join(PLUGIN_DIR);
    if !options.dry_run {
        tokio::fs::create_dir_all(&plugin_dir)
            .await
            .map_err(|e| MimError::io(&plugin_dir, e))?;
    }

    let mut plugins = Vec::with_capacity(plan.plugins.len());
    for planned in &plan.plugins {
        plugins.push(apply_plugin(registries, planned, &plugin_dir, options).await?);
    }

    Ok(InstallReport { server, plugins })
}

fn decide(target_detected: bool, others_detected: bool, options: InstallOptions) -> Action {
    if target_detected && !others_detected && !options.force {
        Action::UpToDate
    } else if options.dry_run {
        Action::WouldInstall
    } else {
        Action::Installed
    }
}

async fn apply_server(
    registries: &Registries,
    server: &Server,
    destination: &Path,
    options: InstallOptions,
) -> MimResult<ServerOutcome> {
    let detected = installed_servers(registries, server, destination).await?;
    let target_detected = detected.contains(server);
    let previous: Vec<Server> = detected.into_iter().filter(|s| s != server).collect();
    let action = decide(target_detected, !previous.is_empty(), options);

    let mut installed = Vec::new();
    let mut removed = Vec::new();
    if action == Action::Installed {
        let path = registries
            .install_server(server, destination)
            .await
            .map_err(|e| match e {
                MimError::Install { .. } | MimError::NotFound(_) => e,
                other => MimError::install(format!("server {}", server), other),
            })?;
        info!("Installed {}", path.display());
        installed.push(path);

        for old in &previous {
            let old_path = destination.join(old.asset());
            if installed.contains(&old_path) {
                continue;
            }
            let gone = registries
                .uninstall_server(old, destination)
                .await?
                .ok_or_else(|| MimError::Uninstall(old_path.clone()))?;
            debug!("Removed {}", gone.display());
            removed.push(gone);
        }
    }

    Ok(ServerOutcome {
        server: server.clone(),
        previous,
        action,
        installed,
        removed,
    })
}

async fn apply_plugin(
    registries: &Registries,
    planned: &PlannedPlugin,
    plugin_dir: &Path,
    options: InstallOptions,
) -> MimResult<PluginOutcome> {
    let selected = &planned.selected;
    let detected = installed_plugin_versions(registries, &planned.known, plugin_dir).await?;

    // Registries publishing the same version produce the same filenames.
    let target_detected = detected.iter().any(|v| v.version() == selected.version());
    let previous: Vec<Arc<PluginVersion>> = detected
        .into_iter()
        .filter(|v| v.version() != selected.version())
        .collect();
    let action = decide(target_detected, !previous.is_empty(), options);

    let mut installed: Vec<PathBuf> = Vec::new();
    let mut removed = Vec::new();
    if action == Action::Installed {
        let assets = selected.assets(registries).await?;
        for asset in planned.filter.select(assets) {
            let path = registries.install_asset(asset, plugin_dir).await?;
            info!("Installed {}", path.display());
            installed.push(path);
        }

        for old in &previous {
            for asset in old.assets(registries).await? {
                let path = plugin_dir.join(&asset.filename);
                if installed.contains(&path) || !exists(&path).await? {
                    continue;
                }
                let gone = registries
                    .uninstall_asset(asset, plugin_dir)
                    .await?
                    .ok_or_else(|| MimError::Uninstall(path.clone()))?;
                debug!("Removed {}", gone.display());
                removed.push(gone);
            }
        }
    }

    let mut previous_versions: Vec<String> = Vec::new();
    for old in &previous {
        if !previous_versions.iter().any(|v| v == old.version()) {
            previous_versions.push(old.version().to_string());
        }
    }

    Ok(PluginOutcome {
        plugin: selected.plugin().display_name().to_string(),
        version: selected.version().to_string(),
        registry: selected.registry().to_string(),
        previous: previous_versions,
        action,
        installed,
        removed,
    })
}
