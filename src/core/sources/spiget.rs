use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::download_asset;
use crate::core::downloader::Downloader;
use crate::core::error::{MimError, MimResult};
use crate::core::model::{PluginAsset, PluginIdentity, PluginVersion, Server};
use crate::core::registry::{ensure_owner, PluginRegistry, RegistryInfo, ServerRegistries};

pub const SPIGET_API: &str = "https://api.spiget.org/v2/";

/// Loaders a SpigotMC resource is assumed to run on.
const SPIGOT_LOADERS: [&str; 3] = ["bukkit", "spigot", "paper"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpigetResource {
    #[serde(default)]
    tested_versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpigetVersion {
    id: u64,
    name: String,
}

/// SpigotMC resources through the Spiget mirror. Requires the numeric
/// resource id; every version shares the resource's tested versions.
pub struct SpigetRegistry {
    info: RegistryInfo,
    downloader: Arc<Downloader>,
}

impl SpigetRegistry {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            info: RegistryInfo::new(
                "Spiget",
                "A repository for Spiget Minecraft plugins",
                SPIGET_API,
                "https://spiget.org/",
            ),
            downloader,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.info.api_url = api_url.into();
        self
    }

    async fn compatibility(
        &self,
        tested_versions: &[String],
        servers: &ServerRegistries,
    ) -> MimResult<Vec<Server>> {
        let mut compatible = Vec::new();
        for tested in tested_versions.iter().filter(|tv| !tv.trim().is_empty()) {
            let selector = widen_minor_version(tested);
            compatible.extend(
                servers
                    .search_all(&selector)
                    .await?
                    .into_iter()
                    .filter(|server| SPIGOT_LOADERS.contains(&server.name.to_lowercase().as_str())),
            );
        }
        Ok(compatible)
    }
}

/// `1.20` only names a minor line, so it becomes `1.20.x`.
fn widen_minor_version(tested: &str) -> String {
    if tested.split('.').count() == 2 {
        format!("{}.x", tested)
    } else {
        tested.to_string()
    }
}

fn asset_filename(plugin: &PluginIdentity, version: &str) -> String {
    match (&plugin.name, &plugin.id) {
        (Some(name), Some(id)) => format!("{}-{}-{}.jar", name, id, version),
        _ => format!("{}-{}.jar", plugin.display_name(), version),
    }
}

#[async_trait]
impl PluginRegistry for SpigetRegistry {
    fn info(&self) -> &RegistryInfo {
        &self.info
    }

    async fn search(
        &self,
        plugin: &Arc<PluginIdentity>,
        servers: &ServerRegistries,
    ) -> MimResult<Option<Vec<PluginVersion>>> {
        let Some(id) = plugin.id.as_deref() else {
            return Ok(None);
        };

        let resource_url = self.info.endpoint(&format!("resources/{}", id));
        let Some(resource) = self
            .downloader
            .fetch_json_if_available::<SpigetResource>(&self.info.name, &resource_url)
            .await?
        else {
            return Ok(None);
        };

        let compatibility = self.compatibility(&resource.tested_versions, servers).await?;

        let versions_url = self
            .info
            .endpoint(&format!("resources/{}/versions?size=50&sort=-id", id));
        let raw_versions: Vec<Value> = self
            .downloader
            .fetch_json(&self.info.name, &versions_url)
            .await?;

        let mut versions = Vec::with_capacity(raw_versions.len());
        for raw in raw_versions {
            let parsed: SpigetVersion = serde_json::from_value(raw.clone())?;
            versions.push(PluginVersion::new(
                Arc::clone(plugin),
                parsed.name,
                &self.info,
                Some(compatibility.clone()),
                raw,
            ));
        }
        Ok(Some(versions))
    }

    async fn list_assets(&self, version: &PluginVersion) -> MimResult<Vec<PluginAsset>> {
        let filename = asset_filename(version.plugin(), version.version());
        Ok(vec![PluginAsset::new(
            filename,
            version,
            version.metadata().clone(),
        )])
    }

    async fn install(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, asset.registry(), || asset.label())?;
        let resource_id = asset.plugin().id.as_deref().ok_or_else(|| {
            MimError::Validation(format!("{} has no Spiget resource id", asset.label()))
        })?;
        let release: SpigetVersion = serde_json::from_value(asset.metadata().clone())?;

        let url = self.info.endpoint(&format!(
            "resources/{}/download?release={}",
            resource_id, release.id
        ));
        download_asset(&self.downloader, &self.info, asset, &url, destination).await
    }
}
