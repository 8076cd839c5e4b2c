//! In-memory registries for exercising the resolver and installer without
//! network access.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::core::error::{MimError, MimResult};
use crate::core::model::{
    normalize_asset_filename, PluginAsset, PluginIdentity, PluginVersion, Server,
};
use crate::core::registry::{
    ensure_owner, PluginRegistry, RegistryInfo, ServerRegistries, ServerRegistry,
};

#[derive(Debug, Default)]
pub struct CallLog {
    pub searches: AtomicUsize,
    pub asset_listings: AtomicUsize,
    installs: Mutex<Vec<String>>,
}

impl CallLog {
    fn record_install(&self, filename: &str) {
        self.installs
            .lock()
            .expect("call log poisoned")
            .push(filename.to_string());
    }

    pub fn installs(&self) -> Vec<String> {
        self.installs.lock().expect("call log poisoned").clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn listing_count(&self) -> usize {
        self.asset_listings.load(Ordering::SeqCst)
    }
}

pub fn paper_servers(minecraft_versions: &[&str]) -> Vec<Server> {
    minecraft_versions
        .iter()
        .map(|mc| Server::new("Paper", *mc, *mc, "paper"))
        .collect()
}

async fn write_artifact(path: &Path, contents: &str) -> MimResult<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MimError::io(parent, e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| MimError::io(path, e))?;
    Ok(path.to_path_buf())
}

// ── Servers ─────────────────────────────────────────────

pub struct FakeServerRegistry {
    info: RegistryInfo,
    servers: Vec<Server>,
    log: Arc<CallLog>,
}

impl FakeServerRegistry {
    pub fn new(name: &str, servers: Vec<Server>) -> Self {
        Self {
            info: RegistryInfo::new(name, "fake servers", "memory://servers/", ""),
            servers,
            log: Arc::default(),
        }
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl ServerRegistry for FakeServerRegistry {
    fn info(&self) -> &RegistryInfo {
        &self.info
    }

    async fn list(&self) -> MimResult<&[Server]> {
        Ok(&self.servers)
    }

    async fn install(&self, server: &Server, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, &server.registry, || server.to_string())?;
        self.log.record_install(&server.asset());
        write_artifact(&destination.join(server.asset()), &server.server_version).await
    }
}

// ── Plugins ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeRelease {
    pub name: String,
    pub version: String,
    pub compatibility: Option<Vec<Server>>,
    pub assets: Vec<String>,
}

impl FakeRelease {
    pub fn new(name: &str, version: &str, assets: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            compatibility: None,
            assets: assets.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn compatible_with(mut self, servers: Vec<Server>) -> Self {
        self.compatibility = Some(servers);
        self
    }
}

pub struct FakePluginRegistry {
    info: RegistryInfo,
    releases: Vec<FakeRelease>,
    requires_id: bool,
    log: Arc<CallLog>,
}

impl FakePluginRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            info: RegistryInfo::new(name, "fake plugins", "memory://plugins/", ""),
            releases: Vec::new(),
            requires_id: false,
            log: Arc::default(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.info.description = description.to_string();
        self
    }

    pub fn with_release(mut self, release: FakeRelease) -> Self {
        self.releases.push(release);
        self
    }

    pub fn requiring_id(mut self) -> Self {
        self.requires_id = true;
        self
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl PluginRegistry for FakePluginRegistry {
    fn info(&self) -> &RegistryInfo {
        &self.info
    }

    async fn search(
        &self,
        plugin: &Arc<PluginIdentity>,
        _servers: &ServerRegistries,
    ) -> MimResult<Option<Vec<PluginVersion>>> {
        self.log.searches.fetch_add(1, Ordering::SeqCst);
        if self.requires_id && plugin.id.is_none() {
            return Ok(None);
        }

        let wanted = plugin.display_name();
        let versions = self
            .releases
            .iter()
            .filter(|release| release.name.eq_ignore_ascii_case(wanted))
            .map(|release| {
                PluginVersion::new(
                    Arc::clone(plugin),
                    release.version.clone(),
                    &self.info,
                    release.compatibility.clone(),
                    json!({ "assets": release.assets }),
                )
            })
            .collect();
        Ok(Some(versions))
    }

    async fn list_assets(&self, version: &PluginVersion) -> MimResult<Vec<PluginAsset>> {
        self.log.asset_listings.fetch_add(1, Ordering::SeqCst);
        let names: Vec<String> = serde_json::from_value(version.metadata()["assets"].clone())?;
        Ok(names
            .iter()
            .map(|name| {
                PluginAsset::new(
                    normalize_asset_filename(name, version.version()),
                    version,
                    json!({ "source": name }),
                )
            })
            .collect())
    }

    async fn install(&self, asset: &PluginAsset, destination: &Path) -> MimResult<PathBuf> {
        ensure_owner(&self.info, asset.registry(), || asset.label())?;
        self.log.record_install(&asset.filename);
        write_artifact(&destination.join(&asset.filename), asset.version()).await
    }
}
