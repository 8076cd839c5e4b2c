//! Registry adapters. Each one speaks a single upstream API and normalizes
//! its payloads into the common model; the raw payload rides along as
//! opaque metadata that only the adapter itself reads back.

pub mod geyser;
pub mod github;
pub mod modrinth;
pub mod paper;
pub mod spiget;

use std::path::{Path, PathBuf};

use crate::core::downloader::Downloader;
use crate::core::error::{MimError, MimResult};
use crate::core::model::PluginAsset;
use crate::core::registry::RegistryInfo;

pub use geyser::{GeyserRegistry, GEYSER_API};
pub use github::{GithubRegistry, GITHUB_API};
pub use modrinth::{ModrinthRegistry, MODRINTH_API};
pub use paper::{PaperRegistry, PAPER_API};
pub use spiget::{SpigetRegistry, SPIGET_API};

/// Stream `url` to `destination/asset.filename`, wrapping any transport
/// failure with the plugin name and version.
pub(crate) async fn download_asset(
    downloader: &Downloader,
    info: &RegistryInfo,
    asset: &PluginAsset,
    url: &str,
    destination: &Path,
) -> MimResult<PathBuf> {
    let dest = destination.join(&asset.filename);
    downloader.download_file(url, &dest).await.map_err(|e| {
        MimError::install(
            format!(
                "{} plugin {} version {}",
                info.name,
                asset.plugin().display_name(),
                asset.version()
            ),
            e,
        )
    })
}
