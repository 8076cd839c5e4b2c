use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the resolver and installer.
/// Every module returns `Result<T, MimError>`.
#[derive(Debug, Error)]
pub enum MimError {
    // ── Selection criteria ──────────────────────────────
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    // ── Registry dispatch ───────────────────────────────
    #[error("{subject} does not belong to the {registry} registry")]
    Ownership { registry: String, subject: String },

    #[error("No registry registered under '{0}'")]
    UnknownRegistry(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("{registry} API error: {message}")]
    RegistryApi { registry: String, message: String },

    #[error("Error installing {subject}: {source}")]
    Install {
        subject: String,
        #[source]
        source: Box<MimError>,
    },

    // ── Filesystem ──────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to uninstall {0:?}")]
    Uninstall(PathBuf),

    // ── Decoding ────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias used throughout the crate.
pub type MimResult<T> = Result<T, MimError>;

impl From<std::io::Error> for MimError {
    fn from(source: std::io::Error) -> Self {
        MimError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl MimError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MimError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a transport failure with the name of the thing being installed.
    pub fn install(subject: impl Into<String>, source: MimError) -> Self {
        MimError::Install {
            subject: subject.into(),
            source: Box::new(source),
        }
    }

    /// `true` when the filters simply excluded everything.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MimError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_error_keeps_context_and_source() {
        let err = MimError::install(
            "WorldEdit 7.3.9",
            MimError::DownloadFailed {
                url: "https://example.com/we.jar".into(),
                status: 503,
            },
        );
        let message = err.to_string();
        assert!(message.contains("WorldEdit 7.3.9"));
        assert!(message.contains("HTTP 503"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_is_distinguished() {
        assert!(MimError::NotFound("nothing".into()).is_not_found());
        assert!(!MimError::Validation("bad".into()).is_not_found());
    }
}
