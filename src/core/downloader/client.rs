use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::core::error::{MimError, MimResult};

/// Streaming downloader and JSON fetcher shared by every registry adapter.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // ── Registry API calls ──────────────────────────────

    /// GET `url` and decode the JSON body. Any non-success status is a
    /// `RegistryApi` error attributed to `registry`.
    pub async fn fetch_json<T: DeserializeOwned>(&self, registry: &str, url: &str) -> MimResult<T> {
        match self.fetch_json_optional(registry, url).await? {
            Some(value) => Ok(value),
            None => Err(MimError::RegistryApi {
                registry: registry.to_string(),
                message: format!("{} returned {}", url, StatusCode::NOT_FOUND),
            }),
        }
    }

    /// Like [`fetch_json`](Self::fetch_json) but maps HTTP 404 to `None`.
    pub async fn fetch_json_optional<T: DeserializeOwned>(
        &self,
        registry: &str,
        url: &str,
    ) -> MimResult<Option<T>> {
        debug!("{} GET {}", registry, url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(MimError::RegistryApi {
                registry: registry.to_string(),
                message: format!("{} returned {}", url, status),
            });
        }

        Ok(Some(response.json::<T>().await?))
    }

    /// Probe whether `registry` can service `url`. Every non-success status
    /// maps to `None`, so a rate-limited or unavailable source drops out of a
    /// search instead of failing it.
    pub async fn fetch_json_if_available<T: DeserializeOwned>(
        &self,
        registry: &str,
        url: &str,
    ) -> MimResult<Option<T>> {
        debug!("{} GET {}", registry, url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{} has nothing at {}", registry, url);
            return Ok(None);
        }
        if !status.is_success() {
            warn!("{} skipped: {} returned {}", registry, url, status);
            return Ok(None);
        }

        Ok(Some(response.json::<T>().await?))
    }

    // ── File download ───────────────────────────────────

    /// Stream `url` into `dest`, creating parent directories as needed.
    ///
    /// A failed transfer removes the partially written file so it is never
    /// mistaken for an installed artifact.
    pub async fn download_file(&self, url: &str, dest: &Path) -> MimResult<PathBuf> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MimError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MimError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let written = {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| MimError::io(dest, e))?;
            let result = write_stream(response, &mut file, dest).await;
            drop(file);
            result
        };

        match written {
            Ok(bytes) => {
                debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, bytes);
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

async fn write_stream(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    dest: &Path,
) -> MimResult<u64> {
    let mut stream = response.bytes_stream();
    let mut total = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| MimError::io(dest, e))?;
        total += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| MimError::io(dest, e))?;
    Ok(total)
}
