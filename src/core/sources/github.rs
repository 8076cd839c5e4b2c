use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::download_asset;
use crate::core::downloader::Downloader;
use crate::core::error::{MimError, MimResult};
use crate::core::model::{normalize_asset_filename, PluginAsset, PluginIdentity, PluginVersion};
use crate::core::registry::{ensure_owner, PluginRegistry, RegistryInfo, ServerRegistries};

pub const GITHUB_API: &str = "https://api.github.com/repos/";

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

/// Releases of `owner/repo` projects. Requires the plugin id; releases carry
/// no compatibility information.
pub struct GithubRegistry {
    info: RegistryInfo,
    downloader: Arc<Downloader>,
}

impl GithubRegistry {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            info: RegistryInfo::new(
                "GitHub",
                "A repository for GitHub-hosted Minecraft plugins",
                GITHUB_API,
                "https://github.com",
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
impl PluginRegistry for GithubRegistry {
    fn info(&self) -> &RegistryInfo {
        &self.info
    }

    async fn search(
        &self,
        plugin: &Arc<PluginIdentity>,
        _servers: &ServerRegistries,
    ) -> MimResult<Option<Vec<PluginVersion>>> {
        let Some(repo) = plugin.id.as_deref() else {
            return Ok(None);
        };

        let url = self.info.endpoint(&format!("{}/releases", repo));
        let Some(releases) = self
            .downloader
            .fetch_json_if_available::<Vec<Value>>(&self.info.name, &url)
            .await?
        else {
            return Ok(None);
        };

        let mut versions = Vec::with_capacity(releases.len());
        for raw in releases {
            let release: GithubRelease = serde_json::from_value(raw.clone())?;
            versions.push(PluginVersion::new(
                Arc::clone(plugin),
                release.tag_name,
                &self.info,
                None,
                raw,
            ));
        }
        Ok(Some(versions))
    }

    async fn list_assets(&self, version: &PluginVersion) -> MimResult<Vec<PluginAsset>> {
        let release: GithubRelease = serde_json::from_value(version.metadata().clone())?;

        release
            .assets
            .into_iter()
            .map(|asset| {
                let filename = normalize_asset_filename(&asset.name, version.version());
                let meta = serde_json::to_value(asset)?;
                Ok::<_, MimError>(PluginAsset::new(filename, version, meta))
            })
            .collect()
    }

    async fn install(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, asset.registry(), || asset.label())?;
        let meta: GithubAsset = serde_json::from_value(asset.metadata().clone())?;
        download_asset(
            &self.downloader,
            &self.info,
            asset,
            &meta.browser_download_url,
            destination,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> GithubRegistry {
        GithubRegistry::new(Arc::new(Downloader::new(reqwest::Client::new())))
            .with_api_url(format!("{}/repos/", server.uri()))
    }

    fn plugin(id: Option<&str>) -> Arc<PluginIdentity> {
        Arc::new(PluginIdentity::new(
            Some("DeathChest".into()),
            id.map(str::to_string),
        ))
    }

    async fn mount_releases(server: &MockServer) {
        let body = serde_json::json!([
            {
                "tag_name": "2.2.0",
                "assets": [
                    {
                        "name": "DeathChest.jar",
                        "browser_download_url": format!("{}/download/DeathChest.jar", server.uri())
                    }
                ]
            },
            { "tag_name": "2.1.0", "assets": [] }
        ]);
        Mock::given(method("GET"))
            .and(path("/repos/DevCyntrix/death-chest/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn search_without_id_is_not_serviceable() {
        let server = MockServer::start().await;
        let result = registry(&server)
            .search(&plugin(None), &ServerRegistries::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn search_unknown_repo_is_not_serviceable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = registry(&server)
            .search(&plugin(Some("nobody/nothing")), &ServerRegistries::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn rate_limited_search_is_not_serviceable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/EngineHub/WorldEdit/releases"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = registry(&server)
            .search(&plugin(Some("EngineHub/WorldEdit")), &ServerRegistries::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn foreign_assets_are_neither_installed_nor_removed() {
        let server = MockServer::start().await;
        let modrinth = RegistryInfo::new("Modrinth", "", "", "");
        let version = PluginVersion::new(
            plugin(None),
            "7.3.9",
            &modrinth,
            None,
            serde_json::json!({}),
        );
        let asset = PluginAsset::new("DeathChest-7.3.9.jar", &version, serde_json::json!({}));
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(&asset.filename), b"kept").unwrap();
        let github = registry(&server);

        let err = github.install(&asset, dir.path()).await.unwrap_err();
        assert!(matches!(err, MimError::Ownership { .. }));

        let err = github.uninstall(&asset, dir.path()).await.unwrap_err();
        assert!(matches!(err, MimError::Ownership { .. }));
        assert!(dir.path().join(&asset.filename).exists());
    }

    #[tokio::test]
    async fn search_maps_releases_to_unconstrained_versions() {
        let server = MockServer::start().await;
        mount_releases(&server).await;

        let versions = registry(&server)
            .search(&plugin(Some("DevCyntrix/death-chest")), &ServerRegistries::default())
            .await
            .unwrap()
            .unwrap();

        let tags: Vec<&str> = versions.iter().map(|v| v.version()).collect();
        assert_eq!(tags, vec!["2.2.0", "2.1.0"]);
        assert!(versions.iter().all(|v| v.compatibility().is_none()));
        assert!(versions.iter().all(|v| v.registry() == "github"));
    }

    #[tokio::test]
    async fn assets_are_version_qualified_and_installable() {
        let server = MockServer::start().await;
        mount_releases(&server).await;
        Mock::given(method("GET"))
            .and(path("/download/DeathChest.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"chest".to_vec()))
            .mount(&server)
            .await;

        let github = registry(&server);
        let versions = github
            .search(&plugin(Some("DevCyntrix/death-chest")), &ServerRegistries::default())
            .await
            .unwrap()
            .unwrap();
        let assets = github.list_assets(&versions[0]).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].filename, "DeathChest-2.2.0.jar");

        let dir = tempfile::tempdir().unwrap();
        let installed = github.install(&assets[0], dir.path()).await.unwrap();
        assert_eq!(installed, dir.path().join("DeathChest-2.2.0.jar"));
        assert_eq!(std::fs::read(installed).unwrap(), b"chest");
    }

    #[tokio::test]
    async fn failed_download_is_wrapped_with_context() {
        let server = MockServer::start().await;
        mount_releases(&server).await;
        Mock::given(method("GET"))
            .and(path("/download/DeathChest.jar"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let github = registry(&server);
        let versions = github
            .search(&plugin(Some("DevCyntrix/death-chest")), &ServerRegistries::default())
            .await
            .unwrap()
            .unwrap();
        let assets = github.list_assets(&versions[0]).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = github.install(&assets[0], dir.path()).await.unwrap_err();
        assert!(matches!(err, MimError::Install { .. }));
        assert!(err.to_string().contains("DeathChest version 2.2.0"));
    }
}
