use std::sync::Arc;

use super::settings::Settings;
use crate::core::downloader::Downloader;
use crate::core::error::MimResult;
use crate::core::http::build_http_client;
use crate::core::registry::Registries;
use crate::core::sources::{
    GeyserRegistry, GithubRegistry, ModrinthRegistry, PaperRegistry, SpigetRegistry,
};

/// The registries taking part in searches, all sharing one downloader built
/// from the loaded settings.
pub struct AppState {
    pub registries: Registries,
}

impl AppState {
    pub fn new(settings: Settings) -> MimResult<Self> {
        let http_client = build_http_client(&settings.user_agent)?;
        let downloader = Arc::new(Downloader::new(http_client));
        let registries = default_registries(&settings, &downloader);

        Ok(Self { registries })
    }
}

/// Paper serves builds; GitHub, Modrinth, Spiget and Geyser serve plugins.
/// Plugin registries are searched in the order added here.
pub fn default_registries(settings: &Settings, downloader: &Arc<Downloader>) -> Registries {
    let mut registries = Registries::new();
    registries.add_server(
        PaperRegistry::new(Arc::clone(downloader)).with_api_url(settings.paper_api.clone()),
    );
    registries
        .add_plugin(
            GeyserRegistry::new(Arc::clone(downloader)).with_api_url(settings.geyser_api.clone()),
        )
        .add_plugin(
            GithubRegistry::new(Arc::clone(downloader)).with_api_url(settings.github_api.clone()),
        )
        .add_plugin(
            ModrinthRegistry::new(Arc::clone(downloader))
                .with_api_url(settings.modrinth_api.clone()),
        )
        .add_plugin(
            SpigetRegistry::new(Arc::clone(downloader)).with_api_url(settings.spiget_api.clone()),
        );
    registries
}
