use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{MimError, MimResult};
use crate::core::http::APP_USER_AGENT;
use crate::core::sources::{GEYSER_API, GITHUB_API, MODRINTH_API, PAPER_API, SPIGET_API};

const APP_DIR_NAME: &str = "mim";
const SETTINGS_FILE: &str = "settings.json";
pub const SETTINGS_ENV: &str = "MIM_SETTINGS";

/// User-level overrides for the HTTP identity and the registry endpoints.
/// Absent fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub user_agent: String,
    pub github_api: String,
    pub modrinth_api: String,
    pub spiget_api: String,
    pub paper_api: String,
    pub geyser_api: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: APP_USER_AGENT.to_string(),
            github_api: GITHUB_API.to_string(),
            modrinth_api: MODRINTH_API.to_string(),
            spiget_api: SPIGET_API.to_string(),
            paper_api: PAPER_API.to_string(),
            geyser_api: GEYSER_API.to_string(),
        }
    }
}

impl Settings {
    /// Settings from `$MIM_SETTINGS` or the user config directory. A missing
    /// or unreadable file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(Some(settings)) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// `Ok(None)` when `path` does not exist.
    pub fn load_from(path: &Path) -> MimResult<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MimError::io(path, e)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

fn settings_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(SETTINGS_ENV) {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE))
}
