use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::download_asset;
use crate::core::downloader::Downloader;
use crate::core::error::MimResult;
use crate::core::model::{
    normalize_asset_filename, PluginAsset, PluginIdentity, PluginVersion, Server,
};
use crate::core::registry::{ensure_owner, PluginRegistry, RegistryInfo, ServerRegistries};

pub const GEYSER_API: &str = "https://download.geysermc.org/v2/";

/// Every Geyser build targets the whole 1.x line; the loader decides which
/// servers it runs on.
const GEYSER_SERVER_RANGE: &str = "1.x.x";
const RELEASE_CHANNEL: &str = "default";

#[derive(Debug, Deserialize)]
struct GeyserProject {
    #[serde(default)]
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeyserBuilds {
    #[serde(default)]
    builds: Vec<GeyserBuild>,
}

#[derive(Debug, Deserialize)]
struct GeyserBuild {
    build: u64,
    channel: String,
    #[serde(default)]
    downloads: BTreeMap<String, GeyserDownload>,
}

#[derive(Debug, Deserialize)]
struct GeyserDownload {
    name: String,
}

/// What a Geyser version needs to be downloaded again.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeyserArtifact {
    project: String,
    version: String,
    loader: String,
    build: u64,
    file: String,
}

/// Whether a build for `loader` runs on `server`.
///
/// Spigot builds are also offered for Paper servers since Paper implements
/// the Spigot API. This aliasing is local to Geyser, not a general loader
/// equivalence.
fn runs_on(server: &Server, loader: &str) -> bool {
    let server_name = server.name.to_lowercase();
    server_name == loader || (server_name == "paper" && loader == "spigot")
}

/// GeyserMC projects (Geyser, Floodgate) from the GeyserMC download API.
pub struct GeyserRegistry {
    info: RegistryInfo,
    downloader: Arc<Downloader>,
}

impl GeyserRegistry {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            info: RegistryInfo::new(
                "Geyser",
                "A repository for GeyserMC Minecraft plugins",
                GEYSER_API,
                "https://geysermc.org/",
            ),
            downloader,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.info.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl PluginRegistry for GeyserRegistry {
    fn info(&self) -> &RegistryInfo {
        &self.info
    }

    async fn search(
        &self,
        plugin: &Arc<PluginIdentity>,
        servers: &ServerRegistries,
    ) -> MimResult<Option<Vec<PluginVersion>>> {
        let Some(name) = plugin.name.as_deref() else {
            return Ok(None);
        };
        let project = name.to_lowercase();

        let project_url = self.info.endpoint(&format!("projects/{}", project));
        let Some(listing) = self
            .downloader
            .fetch_json_optional::<GeyserProject>(&self.info.name, &project_url)
            .await?
        else {
            return Ok(Some(Vec::new()));
        };

        let mut known_servers: Option<Vec<Server>> = None;
        let mut versions = Vec::new();

        for project_version in listing.versions {
            let builds_url = self.info.endpoint(&format!(
                "projects/{}/versions/{}/builds",
                project, project_version
            ));
            let builds: GeyserBuilds = self
                .downloader
                .fetch_json(&self.info.name, &builds_url)
                .await?;

            for build in builds
                .builds
                .into_iter()
                .filter(|b| b.channel.eq_ignore_ascii_case(RELEASE_CHANNEL))
            {
                if known_servers.is_none() {
                    known_servers = Some(servers.search_all(GEYSER_SERVER_RANGE).await?);
                }
                let candidates = known_servers.as_deref().unwrap_or_default();

                for (loader, download) in build.downloads {
                    let loader = loader.to_lowercase();
                    let compatibility: Vec<Server> = candidates
                        .iter()
                        .filter(|server| runs_on(server, &loader))
                        .cloned()
                        .collect();
                    if compatibility.is_empty() {
                        continue;
                    }

                    let artifact = GeyserArtifact {
                        project: project.clone(),
                        version: project_version.clone(),
                        loader,
                        build: build.build,
                        file: download.name,
                    };
                    versions.push(PluginVersion::new(
                        Arc::clone(plugin),
                        format!("{}.{}", project_version, build.build),
                        &self.info,
                        Some(compatibility),
                        serde_json::to_value(&artifact)?,
                    ));
                }
            }
        }
        Ok(Some(versions))
    }

    async fn list_assets(&self, version: &PluginVersion) -> MimResult<Vec<PluginAsset>> {
        let artifact: GeyserArtifact = serde_json::from_value(version.metadata().clone())?;
        let filename = normalize_asset_filename(&artifact.file, version.version());
        Ok(vec![PluginAsset::new(
            filename,
            version,
            version.metadata().clone(),
        )])
    }

    async fn install(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, asset.registry(), || asset.label())?;
        let artifact: GeyserArtifact = serde_json::from_value(asset.metadata().clone())?;
        let url = self.info.endpoint(&format!(
            "projects/{}/versions/{}/builds/{}/downloads/{}",
            artifact.project, artifact.version, artifact.build, artifact.loader
        ));
        download_asset(&self.downloader, &self.info, asset, &url, destination).await
    }
}
