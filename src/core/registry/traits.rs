use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::set::ServerRegistries;
use crate::core::error::{MimError, MimResult};
use crate::core::model::{PluginAsset, PluginIdentity, PluginVersion, Server, VersionPattern};

/// Descriptive data every registry carries. Registries are keyed by the
/// lowercase form of `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInfo {
    pub name: String,
    pub description: String,
    pub api_url: String,
    pub homepage_url: String,
}

impl RegistryInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        api_url: impl Into<String>,
        homepage_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            api_url: api_url.into(),
            homepage_url: homepage_url.into(),
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// `api_url` joined with `path`, tolerating a missing trailing slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// A source of plugin releases (GitHub, Modrinth, Spiget, GeyserMC...).
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    fn info(&self) -> &RegistryInfo;

    /// All versions of `plugin` this registry knows about.
    ///
    /// `Ok(None)` means the registry cannot service this plugin at all
    /// (e.g. it needs an id and none was given); `Ok(Some(vec![]))` means
    /// it looked and found nothing. `servers` is used to turn upstream
    /// game-version tags into compatibility sets.
    async fn search(
        &self,
        plugin: &Arc<PluginIdentity>,
        servers: &ServerRegistries,
    ) -> MimResult<Option<Vec<PluginVersion>>>;

    /// Expand one version into its downloadable files.
    async fn list_assets(&self, version: &PluginVersion) -> MimResult<Vec<PluginAsset>>;

    /// Download `asset` to `destination/asset.filename`.
    async fn install(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf>;

    /// Remove `destination/asset.filename`.
    ///
    /// Returns the removed path, or `None` when the file is still present
    /// after the removal attempt. An already absent file counts as removed.
    async fn uninstall(&self, asset: &PluginAsset, destination: &Path) -> MimResult<Option<PathBuf>> {
        ensure_owner(self.info(), asset.registry(), || asset.label())?;
        remove_artifact(&destination.join(&asset.filename)).await
    }
}

/// A source of server builds (PaperMC).
#[async_trait]
pub trait ServerRegistry: Send + Sync {
    fn info(&self) -> &RegistryInfo;

    /// Every known server build. Implementations fetch once and cache.
    async fn list(&self) -> MimResult<&[Server]>;

    /// Servers whose Minecraft version matches `pattern`.
    async fn search(&self, pattern: &VersionPattern) -> MimResult<Option<Vec<Server>>> {
        let servers = self.list().await?;
        Ok(Some(
            servers
                .iter()
                .filter(|server| pattern.matches(&server.minecraft_version))
                .cloned()
                .collect(),
        ))
    }

    /// Download the best build of `server` to `destination/server.asset()`.
    async fn install(&self, server: &Server, destination: &Path) -> MimResult<PathBuf>;

    async fn uninstall(&self, server: &Server, destination: &Path) -> MimResult<Option<PathBuf>> {
        ensure_owner(self.info(), &server.registry, || format!("Server {}", server))?;
        remove_artifact(&destination.join(server.asset())).await
    }
}

/// Fail with an ownership error unless `owner_key` names `info`.
pub fn ensure_owner(
    info: &RegistryInfo,
    owner_key: &str,
    subject: impl FnOnce() -> String,
) -> MimResult<()> {
    if info.key() == owner_key.to_lowercase() {
        Ok(())
    } else {
        Err(MimError::Ownership {
            registry: info.name.clone(),
            subject: subject(),
        })
    }
}

async fn remove_artifact(path: &Path) -> MimResult<Option<PathBuf>> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| MimError::io(path, e))?
    {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!("Failed to remove {:?}: {}", path, e);
        }
    }

    let still_there = tokio::fs::try_exists(path)
        .await
        .map_err(|e| MimError::io(path, e))?;
    if still_there {
        Ok(None)
    } else {
        Ok(Some(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_lowercase_name() {
        let info = RegistryInfo::new("GitHub", "", "https://api.github.com/repos/", "");
        assert_eq!(info.key(), "github");
    }

    #[test]
    fn endpoint_joins_with_single_slash() {
        let with_slash = RegistryInfo::new("A", "", "https://api.test/v2/", "");
        let without_slash = RegistryInfo::new("A", "", "https://api.test/v2", "");
        assert_eq!(with_slash.endpoint("projects/x"), "https://api.test/v2/projects/x");
        assert_eq!(without_slash.endpoint("/projects/x"), "https://api.test/v2/projects/x");
    }

    #[test]
    fn ensure_owner_rejects_foreign_items() {
        let info = RegistryInfo::new("Modrinth", "", "", "");
        assert!(ensure_owner(&info, "modrinth", || "x".into()).is_ok());

        let err = ensure_owner(&info, "github", || "WorldEdit 7.3.9".into()).unwrap_err();
        assert!(matches!(err, MimError::Ownership { .. }));
        assert!(err.to_string().contains("WorldEdit 7.3.9"));
    }

    #[tokio::test]
    async fn remove_artifact_handles_present_and_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jar");
        std::fs::write(&path, b"x").unwrap();

        assert_eq!(remove_artifact(&path).await.unwrap(), Some(path.clone()));
        assert!(!path.exists());
        assert_eq!(remove_artifact(&path).await.unwrap(), Some(path));
    }
}
