//! PrivateBin v2 JSON API client
//!
//! Submission: `POST {host}` with the encrypted document. The server replies
//! `{"status": 0, "id", "url", "deletetoken"}` on success, or a non-zero
//! status plus `message`.
//!
//! Deletion: `POST {host}` with `{"pasteid", "deletetoken"}`, parsed back out
//! of the stored deletion link.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sendall_core::config::PrivateBinConfig;
use sendall_core::{LinkRecord, SendallError, SendallResult};
use sendall_crypto::{assemble, seal_paste, AssociatedData, CryptoError, EncryptedSubmission, KeyMaterial};

/// Content type PrivateBin's own JavaScript client sends, even though the
/// body is JSON. Kept for compatibility with servers that check it.
pub const SUBMIT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Marks the request as an API call so the server answers in JSON.
pub const REQUESTED_WITH: &str = "JSONHttpRequest";

/// Server reply to a submission or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteResponse {
    pub status: i64,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub deletetoken: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PasteResponse {
    fn into_success(self) -> SendallResult<Self> {
        if self.status != 0 {
            let reason = self
                .message
                .unwrap_or_else(|| "no message from server".to_string());
            return Err(SendallError::Protocol(format!(
                "status {}: {reason}",
                self.status
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct PrivateBinClient {
    http: Client,
    config: PrivateBinConfig,
}

impl PrivateBinClient {
    pub fn new(http: Client, config: PrivateBinConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &PrivateBinConfig {
        &self.config
    }

    /// Configured host without a trailing slash.
    pub fn host(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }

    /// Encrypt `text` under fresh key material and submit it.
    ///
    /// The key material is returned alongside the server reply; it is the
    /// only way to build the shareable link.
    pub async fn submit_text(&self, text: String) -> SendallResult<(PasteResponse, KeyMaterial)> {
        let config = self.config.clone();
        let (submission, material) =
            tokio::task::spawn_blocking(move || seal_submission(&text, &config))
                .await
                .map_err(|e| SendallError::Other(anyhow::anyhow!("encryption task failed: {e}")))??;

        let body = serde_json::to_vec(&submission)
            .map_err(|e| SendallError::Crypto(format!("serializing submission: {e}")))?;
        debug!(host = self.host(), bytes = body.len(), "posting paste");

        let resp = self
            .http
            .post(self.host())
            .header(CONTENT_TYPE, SUBMIT_CONTENT_TYPE)
            .header("X-Requested-With", REQUESTED_WITH)
            .body(body)
            .send()
            .await
            .map_err(network_err)?;

        let reply = read_reply(resp).await?.into_success()?;
        if reply.id.is_empty() || reply.url.is_empty() || reply.deletetoken.is_empty() {
            return Err(SendallError::Protocol(
                "success reply without id, url or deletetoken".into(),
            ));
        }
        Ok((reply, material))
    }

    pub fn record_link(&self, reply: &PasteResponse, material: &KeyMaterial) -> LinkRecord {
        link_record(self.host(), reply, material)
    }

    /// Delete a paste through the link recorded at submission time.
    pub async fn delete(&self, delete_url: &str) -> SendallResult<()> {
        let mut endpoint = Url::parse(delete_url).map_err(|e| {
            SendallError::Protocol(format!("invalid deletion link {delete_url}: {e}"))
        })?;

        let mut pasteid = None;
        let mut deletetoken = None;
        for (key, value) in endpoint.query_pairs() {
            match key.as_ref() {
                "pasteid" => pasteid = Some(value.into_owned()),
                "deletetoken" => deletetoken = Some(value.into_owned()),
                _ => {}
            }
        }
        let (Some(pasteid), Some(deletetoken)) = (pasteid, deletetoken) else {
            return Err(SendallError::Protocol(format!(
                "deletion link {delete_url} lacks pasteid or deletetoken"
            )));
        };

        endpoint.set_query(None);
        endpoint.set_fragment(None);
        debug!(%endpoint, pasteid = %pasteid, "deleting paste");

        let body = serde_json::to_vec(&serde_json::json!({
            "pasteid": pasteid,
            "deletetoken": deletetoken,
        }))
        .map_err(|e| SendallError::Protocol(e.to_string()))?;

        let resp = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, SUBMIT_CONTENT_TYPE)
            .header("X-Requested-With", REQUESTED_WITH)
            .body(body)
            .send()
            .await
            .map_err(network_err)?;

        read_reply(resp).await?.into_success().map(|_| ())
    }
}

/// `{host}{url}#{base58(key)}`
pub fn share_link(host: &str, reply: &PasteResponse, material: &KeyMaterial) -> String {
    let host = host.trim_end_matches('/');
    format!("{host}{}#{}", reply.url, material.link_fragment())
}

/// `{host}/?pasteid={id}&deletetoken={token}`
pub fn delete_link(host: &str, reply: &PasteResponse) -> String {
    let host = host.trim_end_matches('/');
    format!("{host}/?pasteid={}&deletetoken={}", reply.id, reply.deletetoken)
}

pub fn link_record(host: &str, reply: &PasteResponse, material: &KeyMaterial) -> LinkRecord {
    LinkRecord::new(share_link(host, reply, material), delete_link(host, reply))
}

/// Draw key material, encrypt, and assemble the submission document.
fn seal_submission(
    text: &str,
    config: &PrivateBinConfig,
) -> Result<(EncryptedSubmission, KeyMaterial), CryptoError> {
    let material = KeyMaterial::generate()?;
    let adata = AssociatedData::build(
        material.nonce(),
        material.kdf_salt(),
        config.format,
        config.open_discussion,
        config.burn_after_reading,
    )
    .with_compression(config.compression);

    let ciphertext = seal_paste(text, &material, &adata)?;
    Ok((assemble(adata, ciphertext, config.expire), material))
}

async fn read_reply(resp: Response) -> SendallResult<PasteResponse> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(network_err)?;
    if !status.is_success() {
        return Err(SendallError::Protocol(format!("HTTP {status}")));
    }
    serde_json::from_slice(&body)
        .map_err(|e| SendallError::Protocol(format!("malformed reply: {e}")))
}

pub(crate) fn network_err(e: reqwest::Error) -> SendallError {
    SendallError::Network(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendall_core::{Compression, Expiry, PasteFormat};
    use sendall_crypto::decrypt;

    fn client(host: &str) -> PrivateBinClient {
        let config = PrivateBinConfig {
            host: host.to_string(),
            ..PrivateBinConfig::default()
        };
        PrivateBinClient::new(Client::new(), config)
    }

    fn reply() -> PasteResponse {
        PasteResponse {
            status: 0,
            id: "abc123".into(),
            url: "/abc123".into(),
            deletetoken: "tok1".into(),
            message: None,
        }
    }

    #[test]
    fn test_links_trim_trailing_slash() {
        let material = KeyMaterial::from_parts([0u8; 32], [0u8; 16], [0u8; 8]);
        let record = client("https://bin.example/").record_link(&reply(), &material);

        assert_eq!(
            record.public_url,
            format!("https://bin.example/abc123#{}", "1".repeat(32))
        );
        assert_eq!(
            record.delete_url,
            "https://bin.example/?pasteid=abc123&deletetoken=tok1"
        );
        assert_eq!(share_link("https://bin.example", &reply(), &material), record.public_url);
    }

    #[test]
    fn test_failure_reply() {
        let json = r#"{"status":1,"message":"Please wait 10 seconds between each post."}"#;
        let parsed: PasteResponse = serde_json::from_str(json).unwrap();
        let err = parsed.into_success().unwrap_err();

        assert!(matches!(err, SendallError::Protocol(_)));
        assert!(err.to_string().contains("Please wait"));
    }

    #[test]
    fn test_seal_submission_decrypts() {
        let config = PrivateBinConfig {
            expire: Expiry::OneHour,
            format: PasteFormat::Markdown,
            burn_after_reading: true,
            compression: Compression::None,
            ..PrivateBinConfig::default()
        };

        let (submission, material) = seal_submission("# notes", &config).unwrap();
        assert_eq!(submission.meta.expire, Expiry::OneHour);
        assert_eq!(submission.adata.format, PasteFormat::Markdown);
        assert!(submission.adata.burn_after_reading);
        assert!(!submission.adata.open_discussion);

        let envelope = decrypt(&submission.ct, material.key(), &submission.adata).unwrap();
        assert_eq!(envelope.paste, "# notes");
    }
}
