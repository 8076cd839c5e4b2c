use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::core::downloader::Downloader;
use crate::core::error::{MimError, MimResult};
use crate::core::model::Server;
use crate::core::registry::{ensure_owner, RegistryInfo, ServerRegistry};

pub const PAPER_API: &str = "https://fill.papermc.io/v3/";

const PAPER_PROJECT: &str = "paper";
const SERVER_DOWNLOAD_KEY: &str = "server:default";

#[derive(Debug, Deserialize)]
struct PaperProject {
    /// Minor line (`1.21`) → concrete Minecraft versions (`1.21.1`, `1.21`).
    #[serde(default)]
    versions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PaperBuild {
    id: u64,
    channel: String,
    #[serde(default)]
    downloads: HashMap<String, PaperDownload>,
}

#[derive(Debug, Deserialize)]
struct PaperDownload {
    url: String,
}

/// Build stability rank: STABLE > BETA > ALPHA > anything else.
fn channel_rank(channel: &str) -> u8 {
    match channel.to_ascii_uppercase().as_str() {
        "STABLE" => 3,
        "BETA" => 2,
        "ALPHA" => 1,
        _ => 0,
    }
}

/// Highest-ranked channel first, then the highest build number.
fn select_build(builds: &[PaperBuild]) -> Option<&PaperBuild> {
    builds
        .iter()
        .max_by_key(|build| (channel_rank(&build.channel), build.id))
}

/// PaperMC server builds from the Fill API. The server list is fetched once
/// per instance.
pub struct PaperRegistry {
    info: RegistryInfo,
    downloader: Arc<Downloader>,
    servers: OnceCell<Vec<Server>>,
}

impl PaperRegistry {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            info: RegistryInfo::new(
                "Paper",
                "A repository for PaperMC Minecraft servers",
                PAPER_API,
                "https://papermc.io/",
            ),
            downloader,
            servers: OnceCell::new(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.info.api_url = api_url.into();
        self
    }

    async fn fetch_servers(&self) -> MimResult<Vec<Server>> {
        let url = self.info.endpoint(&format!("projects/{}", PAPER_PROJECT));
        let project: PaperProject = self.downloader.fetch_json(&self.info.name, &url).await?;

        let servers: Vec<Server> = project
            .versions
            .into_values()
            .flatten()
            .map(|mc| Server::new("Paper", mc.clone(), mc, self.info.key()))
            .collect();

        info!("Loaded {} Paper server versions", servers.len());
        Ok(servers)
    }

    async fn download_build(&self, server: &Server, destination: &Path) -> MimResult<PathBuf> {
        let builds_url = self.info.endpoint(&format!(
            "projects/{}/versions/{}/builds",
            PAPER_PROJECT, server.minecraft_version
        ));
        let builds: Vec<PaperBuild> = self
            .downloader
            .fetch_json(&self.info.name, &builds_url)
            .await?;

        let build = select_build(&builds).ok_or_else(|| {
            MimError::NotFound(format!(
                "No Paper builds published for Minecraft {}",
                server.minecraft_version
            ))
        })?;
        let download = build.downloads.get(SERVER_DOWNLOAD_KEY).ok_or_else(|| {
            MimError::RegistryApi {
                registry: self.info.name.clone(),
                message: format!(
                    "build {} for {} has no '{}' download",
                    build.id, server.minecraft_version, SERVER_DOWNLOAD_KEY
                ),
            }
        })?;

        debug!(
            "Selected Paper {}-{} ({})",
            server.minecraft_version, build.id, build.channel
        );
        self.downloader
            .download_file(&download.url, &destination.join(server.asset()))
            .await
    }
}

#[async_trait]
impl ServerRegistry for PaperRegistry {
    fn info(&self) -> &RegistryInfo {
        &self.info
    }

    async fn list(&self) -> MimResult<&[Server]> {
        let servers = self
            .servers
            .get_or_try_init(|| self.fetch_servers())
            .await?;
        Ok(servers.as_slice())
    }

    async fn install(&self, server: &Server, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, &server.registry, || format!("Server {}", server))?;
        self.download_build(server, destination)
            .await
            .map_err(|e| match e {
                MimError::NotFound(_) => e,
                other => MimError::install(
                    format!("Paper server version {}", server.server_version),
                    other,
                ),
            })
    }
}
