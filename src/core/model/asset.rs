use std::sync::Arc;

use serde_json::Value;

use super::plugin::{PluginIdentity, PluginVersion, ReleaseInfo};
use super::server::Server;

/// One downloadable file of a [`PluginVersion`].
#[derive(Debug, Clone)]
pub struct PluginAsset {
    /// Local filename the file is installed under.
    pub filename: String,
    metadata: Value,
    release: Arc<ReleaseInfo>,
}

impl PluginAsset {
    pub fn new(filename: impl Into<String>, version: &PluginVersion, metadata: Value) -> Self {
        Self {
            filename: filename.into(),
            metadata,
            release: Arc::clone(version.release()),
        }
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

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn label(&self) -> String {
        format!(
            "{} version {} ({})",
            self.plugin().display_name(),
            self.version(),
            self.filename
        )
    }
}

/// Splice `version` into `filename` before its extension unless the name
/// already mentions it: `name.jar` + `7.3.9` → `name-7.3.9.jar`.
pub fn normalize_asset_filename(filename: &str, version: &str) -> String {
    if version.is_empty() || filename.contains(version) {
        return filename.to_string();
    }

    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            format!("{}-{}.{}", stem, version, extension)
        }
        _ => format!("{}-{}", filename, version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_version_before_extension() {
        assert_eq!(
            normalize_asset_filename("worldedit-bukkit.jar", "7.3.9"),
            "worldedit-bukkit-7.3.9.jar"
        );
    }

    #[test]
    fn keeps_names_that_already_carry_the_version() {
        assert_eq!(
            normalize_asset_filename("QuickShop-Hikari-3.3.0.0.jar", "3.3.0.0"),
            "QuickShop-Hikari-3.3.0.0.jar"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_asset_filename("Geyser-Spigot.jar", "2.4.0.700");
        let twice = normalize_asset_filename(&once, "2.4.0.700");
        assert_eq!(once, "Geyser-Spigot-2.4.0.700.jar");
        assert_eq!(once, twice);
    }

    #[test]
    fn handles_names_without_extension() {
        assert_eq!(normalize_asset_filename("LICENSE", "1.0"), "LICENSE-1.0");
        assert_eq!(normalize_asset_filename(".hidden", "1.0"), ".hidden-1.0");
    }
}
