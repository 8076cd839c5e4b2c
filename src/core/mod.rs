// ─── Minecraft Install Manager Core ───
// Resolves server and plugin versions across several registries and
// installs them into a server directory.
//
// Architecture:
//   core/
//     model/      : Server, Plugin, PluginVersion, PluginAsset, version selectors
//     registry/   : Registry traits + the explicit registry-of-registries
//     sources/    : GitHub, Modrinth, Spiget, PaperMC and GeyserMC adapters
//     resolver/   : Version search, loader/server filters, version ordering
//     manifest/   : JSON/YAML install manifests
//     install/    : Joint server+plugin selection and on-disk reconciliation
//     downloader/ : Registry JSON fetches + streaming file downloads
//     state/      : Settings and the wired-up application state

pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod manifest;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod state;

#[cfg(test)]
pub mod testing;
