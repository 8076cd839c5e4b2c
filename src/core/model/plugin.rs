use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;

use super::asset::PluginAsset;
use super::server::Server;
use crate::core::error::MimResult;
use crate::core::registry::{RegistryInfo, Registries};

/// What a user asked for: a plugin name, a registry-specific id, or both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginIdentity {
    pub name: Option<String>,
    /// Registry-specific identifier, e.g. `owner/repo` on GitHub or a
    /// numeric resource id on Spiget.
    pub id: Option<String>,
}

impl PluginIdentity {
    pub fn new(name: Option<String>, id: Option<String>) -> Self {
        Self { name, id }
    }

    /// Name when known, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

impl fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.id) {
            (Some(name), Some(id)) => write!(f, "{} (id={})", name, id),
            _ => f.write_str(self.display_name()),
        }
    }
}

/// A plugin together with its memoized version list.
///
/// The first call to [`versions`](Plugin::versions) fans out to every
/// registered plugin registry; later calls return the cached list.
#[derive(Debug)]
pub struct Plugin {
    identity: Arc<PluginIdentity>,
    versions: OnceCell<Vec<Arc<PluginVersion>>>,
}

impl Plugin {
    pub fn new(name: Option<String>, id: Option<String>) -> Self {
        Self {
            identity: Arc::new(PluginIdentity::new(name, id)),
            versions: OnceCell::new(),
        }
    }

    pub fn identity(&self) -> &Arc<PluginIdentity> {
        &self.identity
    }

    pub async fn versions(&self, registries: &Registries) -> MimResult<&[Arc<PluginVersion>]> {
        let versions = self
            .versions
            .get_or_try_init(|| async {
                let found = registries.search_plugins(&self.identity).await?;
                Ok::<_, crate::core::error::MimError>(found.into_iter().map(Arc::new).collect())
            })
            .await?;
        Ok(versions.as_slice())
    }
}

/// The part of a version shared with each of its assets.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseInfo {
    pub plugin: Arc<PluginIdentity>,
    pub version: String,
    /// Lowercase key of the owning plugin registry.
    pub registry: String,
    /// `None` means compatible with anything; an empty list means nothing.
    pub compatibility: Option<Vec<Server>>,
}

impl ReleaseInfo {
    pub fn is_compatible_with(&self, server: &Server) -> bool {
        match &self.compatibility {
            None => true,
            Some(servers) => servers.contains(server),
        }
    }

    pub fn is_compatible_with_any(&self, servers: &[Server]) -> bool {
        match &self.compatibility {
            None => true,
            Some(compatible) => compatible.iter().any(|s| servers.contains(s)),
        }
    }

    pub fn supports_loader(&self, loader: &str) -> bool {
        match &self.compatibility {
            None => true,
            Some(compatible) => compatible.iter().any(|s| s.is_loader(loader)),
        }
    }
}

/// One registry's release of a plugin.
#[derive(Debug)]
pub struct PluginVersion {
    release: Arc<ReleaseInfo>,
    metadata: Value,
    assets: OnceCell<Vec<PluginAsset>>,
}

impl PluginVersion {
    pub fn new(
        plugin: Arc<PluginIdentity>,
        version: impl Into<String>,
        registry: &RegistryInfo,
        compatibility: Option<Vec<Server>>,
        metadata: Value,
    ) -> Self {
        Self {
            release: Arc::new(ReleaseInfo {
                plugin,
                version: version.into(),
                registry: registry.key(),
                compatibility,
            }),
            metadata,
            assets: OnceCell::new(),
        }
    }

    pub fn release(&self) -> &Arc<ReleaseInfo> {
        &self.release
    }

    pub fn plugin(&self) -> &PluginIdentity {
        &self.release.plugin
    }

    pub fn version(&self) -> &str {
        &self.release.version
    }

    pub fn registry(&self) -> &str {
        &self.release.registry
    }

    pub fn compatibility(&self) -> Option<&[Server]> {
        self.release.compatibility.as_deref()
    }

    /// Raw upstream payload; only the owning adapter interprets it.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn is_compatible_with(&self, server: &Server) -> bool {
        self.release.is_compatible_with(server)
    }

    pub fn is_compatible_with_any(&self, servers: &[Server]) -> bool {
        self.release.is_compatible_with_any(servers)
    }

    pub fn supports_loader(&self, loader: &str) -> bool {
        self.release.supports_loader(loader)
    }

    /// Downloadable files of this version, listed once through the owning
    /// registry and cached for the lifetime of this value.
    pub async fn assets(&self, registries: &Registries) -> MimResult<&[PluginAsset]> {
        let assets = self
            .assets
            .get_or_try_init(|| async {
                let registry = registries.plugin_registry(self.registry())?;
                registry.list_assets(self).await
            })
            .await?;
        Ok(assets.as_slice())
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.plugin().display_name(), self.version())
    }
}

impl PartialEq for PluginVersion {
    fn eq(&self, other: &Self) -> bool {
        self.release == other.release && self.metadata == other.metadata
    }
}
