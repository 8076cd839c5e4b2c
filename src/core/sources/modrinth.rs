use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::download_asset;
use crate::core::downloader::Downloader;
use crate::core::error::{MimError, MimResult};
use crate::core::model::{
    normalize_asset_filename, PluginAsset, PluginIdentity, PluginVersion, Server,
};
use crate::core::registry::{ensure_owner, PluginRegistry, RegistryInfo, ServerRegistries};

pub const MODRINTH_API: &str = "https://api.modrinth.com/v2/";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    project_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
}

#[derive(Debug, Deserialize)]
struct ModrinthVersion {
    version_number: String,
    #[serde(default)]
    version_type: Option<String>,
    #[serde(default)]
    game_versions: Vec<String>,
    #[serde(default)]
    loaders: Vec<String>,
    #[serde(default)]
    files: Vec<ModrinthFile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ModrinthFile {
    filename: String,
    url: String,
}

/// Modrinth projects looked up by title or slug. Only `release` versions are
/// offered, each tied to the servers its game versions and loaders name.
pub struct ModrinthRegistry {
    info: RegistryInfo,
    downloader: Arc<Downloader>,
}

impl ModrinthRegistry {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            info: RegistryInfo::new(
                "Modrinth",
                "A repository for Modrinth Minecraft plugins",
                MODRINTH_API,
                "https://modrinth.com/",
            ),
            downloader,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.info.api_url = api_url.into();
        self
    }

    async fn matching_projects(&self, name: &str) -> MimResult<Vec<String>> {
        let url = reqwest::Url::parse_with_params(&self.info.endpoint("search"), &[("query", name)])
            .map_err(|e| MimError::RegistryApi {
                registry: self.info.name.clone(),
                message: format!("invalid search URL: {}", e),
            })?;

        let response: SearchResponse = self
            .downloader
            .fetch_json(&self.info.name, url.as_str())
            .await?;

        Ok(response
            .hits
            .into_iter()
            .filter(|hit| hit.title.eq_ignore_ascii_case(name) || hit.slug.eq_ignore_ascii_case(name))
            .map(|hit| hit.project_id)
            .collect())
    }

    async fn compatibility(
        &self,
        version: &ModrinthVersion,
        servers: &ServerRegistries,
    ) -> MimResult<Vec<Server>> {
        let loaders: Vec<String> = version.loaders.iter().map(|l| l.to_lowercase()).collect();
        let mut compatible: Vec<Server> = Vec::new();

        for game_version in version.game_versions.iter().filter(|gv| !gv.trim().is_empty()) {
            for server in servers.search_all(game_version).await? {
                if loaders.contains(&server.name.to_lowercase()) && !compatible.contains(&server) {
                    compatible.push(server);
                }
            }
        }
        Ok(compatible)
    }
}

#[async_trait]
impl PluginRegistry for ModrinthRegistry {
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

        let mut versions = Vec::new();
        for project_id in self.matching_projects(name).await? {
            let url = self.info.endpoint(&format!("project/{}/version", project_id));
            let raw_versions: Vec<Value> = self.downloader.fetch_json(&self.info.name, &url).await?;

            for raw in raw_versions {
                let parsed: ModrinthVersion = serde_json::from_value(raw.clone())?;
                if parsed.version_type.as_deref() != Some("release") {
                    continue;
                }

                let compatibility = self.compatibility(&parsed, servers).await?;
                if compatibility.is_empty() {
                    debug!(
                        "Skipping Modrinth {} {}: no known compatible server",
                        name, parsed.version_number
                    );
                    continue;
                }

                versions.push(PluginVersion::new(
                    Arc::clone(plugin),
                    parsed.version_number,
                    &self.info,
                    Some(compatibility),
                    raw,
                ));
            }
        }
        Ok(Some(versions))
    }

    async fn list_assets(&self, version: &PluginVersion) -> MimResult<Vec<PluginAsset>> {
        let parsed: ModrinthVersion = serde_json::from_value(version.metadata().clone())?;

        parsed
            .files
            .into_iter()
            .map(|file| {
                let filename = normalize_asset_filename(&file.filename, version.version());
                let meta = serde_json::to_value(file)?;
                Ok::<_, MimError>(PluginAsset::new(filename, version, meta))
            })
            .collect()
    }

    async fn install(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, asset.registry(), || asset.label())?;
        let file: ModrinthFile = serde_json::from_value(asset.metadata().clone())?;
        download_asset(&self.downloader, &self.info, asset, &file.url, destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registries;
    use crate::core::testing::{paper_servers, FakeServerRegistry};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> ModrinthRegistry {
        ModrinthRegistry::new(Arc::new(Downloader::new(reqwest::Client::new())))
            .with_api_url(format!("{}/v2/", server.uri()))
    }

    fn servers() -> Registries {
        let mut registries = Registries::new();
        registries.add_server(FakeServerRegistry::new(
            "Paper",
            paper_servers(&["1.20.4", "1.21", "1.21.1"]),
        ));
        registries
    }

    async fn mount_worldedit(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v2/search"))
            .and(query_param("query", "WorldEdit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hits": [
                    { "project_id": "1u6JkXh5", "title": "WorldEdit", "slug": "worldedit" },
                    { "project_id": "other", "title": "WorldEditSUI", "slug": "worldeditsui" }
                ]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/project/1u6JkXh5/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "version_number": "7.3.9",
                    "version_type": "release",
                    "game_versions": ["1.21", "1.21.1"],
                    "loaders": ["bukkit", "paper"],
                    "files": [{
                        "filename": "worldedit-bukkit-7.3.9.jar",
                        "url": format!("{}/cdn/worldedit-bukkit-7.3.9.jar", server.uri())
                    }]
                },
                {
                    "version_number": "7.4.0-beta-01",
                    "version_type": "beta",
                    "game_versions": ["1.21.1"],
                    "loaders": ["paper"],
                    "files": []
                },
                {
                    "version_number": "7.3.9-fabric",
                    "version_type": "release",
                    "game_versions": ["1.21.1"],
                    "loaders": ["fabric"],
                    "files": []
                },
                {
                    "version_number": "7.2.0",
                    "version_type": "release",
                    "game_versions": ["1.20.4"],
                    "loaders": ["Paper"],
                    "files": [{
                        "filename": "worldedit.jar",
                        "url": format!("{}/cdn/worldedit.jar", server.uri())
                    }]
                }
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn search_keeps_releases_with_known_servers() {
        let server = MockServer::start().await;
        mount_worldedit(&server).await;
        let registries = servers();

        let plugin = Arc::new(PluginIdentity::new(Some("WorldEdit".into()), None));
        let versions = registry(&server)
            .search(&plugin, &registries.servers)
            .await
            .unwrap()
            .unwrap();

        let numbers: Vec<&str> = versions.iter().map(|v| v.version()).collect();
        assert_eq!(numbers, vec!["7.3.9", "7.2.0"]);

        let compat: Vec<&str> = versions[0]
            .compatibility()
            .unwrap()
            .iter()
            .map(|s| s.minecraft_version.as_str())
            .collect();
        assert_eq!(compat, vec!["1.21", "1.21.1"]);
    }

    #[tokio::test]
    async fn search_without_name_is_not_serviceable() {
        let server = MockServer::start().await;
        let plugin = Arc::new(PluginIdentity::new(None, Some("1u6JkXh5".into())));
        let result = registry(&server)
            .search(&plugin, &ServerRegistries::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn assets_normalize_filenames_and_download() {
        let server = MockServer::start().await;
        mount_worldedit(&server).await;
        Mock::given(method("GET"))
            .and(path("/cdn/worldedit.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"we".to_vec()))
            .mount(&server)
            .await;
        let registries = servers();
        let modrinth = registry(&server);

        let plugin = Arc::new(PluginIdentity::new(Some("WorldEdit".into()), None));
        let versions = modrinth
            .search(&plugin, &registries.servers)
            .await
            .unwrap()
            .unwrap();

        let current = modrinth.list_assets(&versions[0]).await.unwrap();
        assert_eq!(current[0].filename, "worldedit-bukkit-7.3.9.jar");

        let older = modrinth.list_assets(&versions[1]).await.unwrap();
        assert_eq!(older[0].filename, "worldedit-7.2.0.jar");

        let dir = tempfile::tempdir().unwrap();
        let installed = modrinth.install(&older[0], dir.path()).await.unwrap();
        assert_eq!(std::fs::read(installed).unwrap(), b"we");
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let plugin = Arc::new(PluginIdentity::new(Some("WorldEdit".into()), None));
        let err = registry(&server)
            .search(&plugin, &ServerRegistries::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MimError::RegistryApi { .. }));
    }
}
