use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::model::Server;

/// What happened to one selected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Already present and nothing else installed alongside it.
    UpToDate,
    Installed,
    /// Dry run: would have been installed.
    WouldInstall,
}

#[derive(Debug, Clone)]
pub struct ServerOutcome {
    pub server: Server,
    /// Servers detected in the destination before this run.
    pub previous: Vec<Server>,
    pub action: Action,
    pub installed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PluginOutcome {
    pub plugin: String,
    pub version: String,
    pub registry: String,
    /// Versions detected in the plugin directory before this run.
    pub previous: Vec<String>,
    pub action: Action,
    pub installed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub server: ServerOutcome,
    pub plugins: Vec<PluginOutcome>,
}

impl InstallReport {
    /// Number of files downloaded during this run.
    pub fn download_count(&self) -> usize {
        self.server.installed.len()
            + self.plugins.iter().map(|p| p.installed.len()).sum::<usize>()
    }

    /// Number of files removed during this run.
    pub fn removal_count(&self) -> usize {
        self.server.removed.len() + self.plugins.iter().map(|p| p.removed.len()).sum::<usize>()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn status(action: Action, previous: &[String]) -> String {
    match action {
        Action::UpToDate => " (Up to date)".to_string(),
        _ if !previous.is_empty() => format!(" (Updated from {})", previous.join(", ")),
        Action::WouldInstall => " (Would install)".to_string(),
        Action::Installed => String::new(),
    }
}

fn write_files(f: &mut fmt::Formatter<'_>, installed: &[PathBuf], removed: &[PathBuf]) -> fmt::Result {
    for path in installed {
        writeln!(f, "   Installed {}", file_name(path))?;
    }
    for path in removed {
        writeln!(f, "   Uninstalled {}", file_name(path))?;
    }
    Ok(())
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let server = &self.server;
        let previous_builds: Vec<String> = server
            .previous
            .iter()
            .map(|s| s.server_version.clone())
            .collect();
        let previous_games: Vec<String> = server
            .previous
            .iter()
            .map(|s| s.minecraft_version.clone())
            .collect();

        writeln!(f, "===== Server =====")?;
        writeln!(
            f,
            "{} Version: {}{}",
            server.server.name,
            server.server.server_version,
            status(server.action, &previous_builds)
        )?;
        writeln!(
            f,
            "Minecraft Version: {}{}",
            server.server.minecraft_version,
            status(server.action, &previous_games)
        )?;
        write_files(f, &server.installed, &server.removed)?;

        writeln!(f)?;
        writeln!(f, "===== Plugins =====")?;
        for plugin in &self.plugins {
            writeln!(
                f,
                "{} Version: {} [{}]{}",
                plugin.plugin,
                plugin.version,
                plugin.registry,
                status(plugin.action, &plugin.previous)
            )?;
            write_files(f, &plugin.installed, &plugin.removed)?;
        }
        Ok(())
    }
}
