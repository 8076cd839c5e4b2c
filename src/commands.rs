use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use crate::core::error::{MimError, MimResult};
use crate::core::install::{apply_plan, plan_install, InstallOptions};
use crate::core::manifest::load_manifest;
use crate::core::model::PluginVersion;
use crate::core::registry::Registries;
use crate::core::resolver::{find_versions, AssetFilter, VersionQuery};

/// Plugin selection shared by the query commands.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Plugin name
    #[arg(long, short)]
    pub name: Option<String>,
    /// Plugin id (GitHub owner/repo, Spiget resource id)
    #[arg(long, short)]
    pub id: Option<String>,
    /// Filter by loader (e.g. paper, spigot)
    #[arg(long, short)]
    pub loader: Option<String>,
    /// Filter by Minecraft server version (e.g. 1.16, 1.17.x)
    #[arg(long, short)]
    pub server: Option<String>,
}

impl QueryArgs {
    fn query(&self) -> VersionQuery {
        VersionQuery::new(self.name.clone(), self.id.clone())
            .loader(self.loader.clone())
            .server(self.server.clone())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AssetsArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Plugin version to inspect
    #[arg(long, short)]
    pub version: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Specific plugin version to download
    #[arg(long, short)]
    pub version: Option<String>,
    /// Asset filename regexes; only matching assets are downloaded
    #[arg(long, short, num_args = 1..)]
    pub asset: Vec<String>,
    /// Directory to save downloads (defaults to the current directory)
    #[arg(long, short)]
    pub destination: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// JSON or YAML manifest listing the server and plugins
    #[arg(long, short)]
    pub file: PathBuf,
    /// Server directory (defaults to the current directory)
    #[arg(long, short)]
    pub destination: Option<PathBuf>,
    /// Reinstall even when already up to date
    #[arg(long)]
    pub force: bool,
    /// Resolve and compare without downloading or removing anything
    #[arg(long = "dryrun")]
    pub dry_run: bool,
}

fn destination_or_cwd(destination: Option<&Path>) -> MimResult<PathBuf> {
    match destination {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().map_err(|e| MimError::io(".", e)),
    }
}

fn compatibility_label(version: &PluginVersion) -> String {
    match version.compatibility() {
        Some(servers) if !servers.is_empty() => servers
            .iter()
            .map(|s| s.minecraft_version.as_str())
            .collect::<Vec<_>>()
            .join(","),
        _ => "any".to_string(),
    }
}

fn matching_version(
    versions: Vec<Arc<PluginVersion>>,
    wanted: Option<&str>,
) -> Vec<Arc<PluginVersion>> {
    match wanted {
        Some(wanted) => versions.into_iter().filter(|v| v.version() == wanted).collect(),
        None => versions,
    }
}

pub async fn list_versions(
    registries: &Registries,
    args: &QueryArgs,
    out: &mut impl Write,
) -> MimResult<()> {
    let versions = find_versions(registries, &args.query()).await?;
    if versions.is_empty() {
        writeln!(out, "No versions found")?;
        return Ok(());
    }

    for version in &versions {
        writeln!(
            out,
            "{} {} (repo={}, compatibility={})",
            version.plugin().display_name(),
            version.version(),
            version.registry(),
            compatibility_label(version)
        )?;
    }
    Ok(())
}

pub async fn list_assets(
    registries: &Registries,
    args: &AssetsArgs,
    out: &mut impl Write,
) -> MimResult<()> {
    let versions = find_versions(registries, &args.query.query()).await?;
    if versions.is_empty() {
        writeln!(out, "No versions found")?;
        return Ok(());
    }

    let versions = matching_version(versions, args.version.as_deref());
    if versions.is_empty() {
        writeln!(out, "No matching versions")?;
        return Ok(());
    }

    for version in &versions {
        writeln!(out, "Assets for {}:", version.label())?;
        for asset in version.assets(registries).await? {
            writeln!(out, " - {}", asset.filename)?;
        }
    }
    Ok(())
}

/// Download every matching asset of every matching version. A failed asset
/// is reported and skipped.
pub async fn download(
    registries: &Registries,
    args: &DownloadArgs,
    out: &mut impl Write,
) -> MimResult<()> {
    let dest = destination_or_cwd(args.destination.as_deref())?;
    tokio::fs::create_dir_all(&dest)
        .await
        .map_err(|e| MimError::io(&dest, e))?;

    let versions = find_versions(registries, &args.query.query()).await?;
    if versions.is_empty() {
        writeln!(out, "No versions found")?;
        return Ok(());
    }

    let versions = matching_version(versions, args.version.as_deref());
    if versions.is_empty() {
        writeln!(out, "No matching versions")?;
        return Ok(());
    }

    let filter = match AssetFilter::new(&args.asset) {
        Ok(filter) => Some(filter),
        Err(e) => {
            writeln!(out, "Invalid regex in --asset: {}", e)?;
            None
        }
    };

    for version in &versions {
        writeln!(
            out,
            "Downloading version {} of {}...",
            version.version(),
            version.plugin().display_name()
        )?;

        let assets = match &filter {
            Some(filter) => filter.select(version.assets(registries).await?),
            None => Vec::new(),
        };
        if assets.is_empty() {
            writeln!(out, " No assets to download")?;
            continue;
        }

        for asset in assets {
            match registries.install_asset(asset, &dest).await {
                Ok(path) => {
                    writeln!(out, "  - downloaded {} -> {}", asset.filename, path.display())?
                }
                Err(e) => {
                    warn!("Download of {} failed: {}", asset.filename, e);
                    writeln!(out, "  - failed to download {}: {}", asset.filename, e)?
                }
            }
        }
    }
    Ok(())
}

pub async fn install(
    registries: &Registries,
    args: &InstallArgs,
    out: &mut impl Write,
) -> MimResult<()> {
    let dest = destination_or_cwd(args.destination.as_deref())?;
    let manifest = load_manifest(&args.file).await?;
    info!(
        "Installing {} plugins for {} {} into {}",
        manifest.plugins.len(),
        manifest.loader,
        manifest.version,
        dest.display()
    );

    let plan = plan_install(registries, &manifest).await?;
    let options = InstallOptions {
        force: args.force,
        dry_run: args.dry_run,
    };
    let report = apply_plan(registries, &plan, &dest, options).await?;

    write!(out, "{}", report)?;
    Ok(())
}
