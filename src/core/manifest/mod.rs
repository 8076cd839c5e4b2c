//! Install manifests: the server selector, loader and plugin list read from
//! a JSON or YAML file.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::error::{MimError, MimResult};

pub const DEFAULT_SERVER_SELECTOR: &str = "1.x.x";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallManifest {
    /// Minecraft version selector; wildcards allowed.
    pub version: String,
    pub loader: String,
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginEntry {
    pub name: String,
    pub id: Option<String>,
    /// Exact version pin.
    pub version: Option<String>,
    /// Asset filename regexes; empty means every asset.
    pub assets: Vec<String>,
}

impl PluginEntry {
    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }
}

impl InstallManifest {
    pub fn from_value(value: Value) -> MimResult<Self> {
        let Value::Object(root) = value else {
            return Err(MimError::Validation(
                "Manifest must be a mapping defining server and plugin specifications".into(),
            ));
        };

        let version = optional_string(&root, "version", "manifest")?
            .unwrap_or_else(|| DEFAULT_SERVER_SELECTOR.to_string());
        let loader = optional_string(&root, "loader", "manifest")?
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| {
                MimError::Validation(
                    "Manifest must define a \"loader\" field for the server loader (e.g. paper, spigot)"
                        .into(),
                )
            })?;

        let entries = match root.get("plugins") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries.clone(),
            Some(_) => {
                return Err(MimError::Validation(
                    "Manifest \"plugins\" must be a list".into(),
                ))
            }
        };

        let mut plugins = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Value::Object(fields) => plugins.push(parse_entry(&fields)?),
                other => warn!("Skipping non-mapping plugin entry in manifest: {}", other),
            }
        }

        Ok(Self {
            version,
            loader,
            plugins,
        })
    }
}

fn parse_entry(fields: &Map<String, Value>) -> MimResult<PluginEntry> {
    let name = optional_string(fields, "name", "plugin entry")?
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| MimError::Validation("Plugin entry missing \"name\"".into()))?;

    let assets = match fields.get("assets") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(single)) => vec![single.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                scalar_string(item, "assets", &name)?.ok_or_else(|| {
                    MimError::Validation(format!("Assets of {} must be strings", name))
                })
            })
            .collect::<MimResult<Vec<_>>>()?,
        Some(_) => {
            return Err(MimError::Validation(format!(
                "Assets of {} must be a list of regular expressions",
                name
            )))
        }
    };

    Ok(PluginEntry {
        id: optional_string(fields, "id", &name)?,
        version: optional_string(fields, "version", &name)?,
        name,
        assets,
    })
}

/// Strings and integers are accepted, so an unquoted Spiget resource id or
/// `version: 7` still reads as text. Fractional numbers are rejected: YAML
/// reads `1.20` as the float `1.2` and the original text cannot be recovered.
fn scalar_string(value: &Value, key: &str, owner: &str) -> MimResult<Option<String>> {
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) if n.is_f64() => Err(MimError::Validation(format!(
            "\"{}\" of {} was read as the number {}; quote it (e.g. \"{}\") to keep it as written",
            key, owner, n, n
        ))),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

fn optional_string(fields: &Map<String, Value>, key: &str, owner: &str) -> MimResult<Option<String>> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(value, key, owner)?.map(Some).ok_or_else(|| {
            MimError::Validation(format!("\"{}\" of {} must be a string", key, owner))
        }),
    }
}

/// Read a manifest from `path`, trying JSON first and YAML second.
pub async fn load_manifest(path: &Path) -> MimResult<InstallManifest> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MimError::NotFound(format!(
                "Input file not found: {}",
                path.display()
            )))
        }
        Err(e) => return Err(MimError::io(path, e)),
    };

    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(json_err) => {
            debug!("{} is not JSON ({}), reading as YAML", path.display(), json_err);
            serde_yaml::from_str::<Value>(&text)?
        }
    };
    InstallManifest::from_value(value)
}
