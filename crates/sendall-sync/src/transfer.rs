//! transfer.sh client: plain `PUT` upload, `DELETE` through the returned link.
//!
//! No client-side encryption; the file goes up as-is.

use std::path::Path;

use reqwest::{Client, Url};
use tracing::debug;

use sendall_core::config::TransferConfig;
use sendall_core::{LinkRecord, SendallError, SendallResult};

use crate::privatebin::network_err;

/// Response header carrying the deletion link.
pub const DELETE_URL_HEADER: &str = "X-Url-Delete";

#[derive(Debug, Clone)]
pub struct TransferShClient {
    http: Client,
    config: TransferConfig,
    base: Url,
}

impl TransferShClient {
    /// Fails with `Config` when the host cannot serve as an upload base.
    pub fn new(http: Client, config: TransferConfig) -> SendallResult<Self> {
        let base = Url::parse(&config.host).map_err(|e| {
            SendallError::Config(format!("invalid transfer host {}: {e}", config.host))
        })?;
        if base.cannot_be_a_base() {
            return Err(SendallError::Config(format!(
                "transfer host {} cannot take a path",
                config.host
            )));
        }
        Ok(Self { http, config, base })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// `{host}/{basename}`, with the name percent-encoded as one segment.
    pub fn upload_url(&self, path: &Path) -> SendallResult<Url> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SendallError::InvalidInput(format!("{} has no file name", path.display()))
            })?;

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SendallError::InvalidInput(format!("{} cannot take a path", self.base))
            })?
            .pop_if_empty()
            .push(&name);
        Ok(url)
    }

    /// Upload `path`; returns the public link and its deletion link.
    pub async fn upload(&self, path: &Path) -> SendallResult<LinkRecord> {
        let url = self.upload_url(path)?;
        let content = tokio::fs::read(path).await?;
        debug!(%url, bytes = content.len(), "uploading");

        let resp = self
            .http
            .put(url)
            .header("Max-Downloads", self.config.max_downloads.to_string())
            .header("Max-Days", self.config.max_days.to_string())
            .body(content)
            .send()
            .await
            .map_err(network_err)?;

        let status = resp.status();
        let delete_url = resp
            .headers()
            .get(DELETE_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(network_err)?;

        if !status.is_success() {
            return Err(SendallError::Protocol(format!("HTTP {status}")));
        }
        let public_url = body.trim();
        if public_url.is_empty() {
            return Err(SendallError::Protocol("empty upload reply".into()));
        }
        let delete_url = delete_url.ok_or_else(|| {
            SendallError::Protocol(format!("reply lacks {DELETE_URL_HEADER} header"))
        })?;

        Ok(LinkRecord::new(public_url, delete_url))
    }

    /// `DELETE {delete_url}`; any 2xx counts as removed.
    pub async fn delete(&self, delete_url: &str) -> SendallResult<()> {
        debug!(delete_url, "deleting upload");
        let resp = self
            .http
            .delete(delete_url)
            .send()
            .await
            .map_err(network_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SendallError::Protocol(format!("HTTP {status}")));
        }
        Ok(())
    }
}
