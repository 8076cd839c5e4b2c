mod asset;
mod pattern;
mod plugin;
mod server;

pub use asset::{normalize_asset_filename, PluginAsset};
pub use pattern::VersionPattern;
pub use plugin::{Plugin, PluginIdentity, PluginVersion, ReleaseInfo};
pub use server::Server;
