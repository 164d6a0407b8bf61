//! Backend capability: submit a file, derive its link record, delete by link.
//!
//! Dispatch enum over the supported sharing services. Encryption lives
//! entirely inside the PrivateBin arm; the pipeline never sees it.

use std::path::Path;

use tracing::debug;

use sendall_core::{LinkRecord, SendallResult};
use sendall_crypto::KeyMaterial;

use crate::privatebin::{self, PasteResponse, PrivateBinClient};
use crate::state::{PRIVATEBIN_BUCKET, TRANSFERSH_BUCKET};
use crate::transfer::TransferShClient;

/// What a backend hands back for one successful submission.
#[derive(Debug, Clone)]
pub enum Receipt {
    /// Server reply plus the key material the paste was sealed with.
    PrivateBin {
        host: String,
        response: PasteResponse,
        key: KeyMaterial,
    },
    TransferSh(LinkRecord),
}

#[derive(Debug, Clone)]
pub enum Backend {
    PrivateBin(PrivateBinClient),
    TransferSh(TransferShClient),
}

impl Backend {
    /// Link store bucket this backend's records live in.
    pub fn bucket(&self) -> &'static str {
        match self {
            Backend::PrivateBin(_) => PRIVATEBIN_BUCKET,
            Backend::TransferSh(_) => TRANSFERSH_BUCKET,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::PrivateBin(_) => "privatebin",
            Backend::TransferSh(_) => "transfer.sh",
        }
    }

    /// Submit one file. At most one attempt; errors are returned, not retried.
    pub async fn submit(&self, path: &Path) -> SendallResult<Receipt> {
        match self {
            Backend::PrivateBin(client) => {
                let content = tokio::fs::read(path).await?;
                let text = String::from_utf8_lossy(&content).into_owned();
                debug!(file = %path.display(), bytes = content.len(), "sealing paste");
                let (response, key) = client.submit_text(text).await?;
                Ok(Receipt::PrivateBin {
                    host: client.host().to_string(),
                    response,
                    key,
                })
            }
            Backend::TransferSh(client) => Ok(Receipt::TransferSh(client.upload(path).await?)),
        }
    }

    /// The `public_url → delete_url` pair to persist for a receipt.
    pub fn record_link(&self, receipt: &Receipt) -> LinkRecord {
        match receipt {
            Receipt::PrivateBin {
                host,
                response,
                key,
            } => privatebin::link_record(host, response, key),
            Receipt::TransferSh(record) => record.clone(),
        }
    }

    pub async fn delete(&self, delete_url: &str) -> SendallResult<()> {
        match self {
            Backend::PrivateBin(client) => client.delete(delete_url).await,
            Backend::TransferSh(client) => client.delete(delete_url).await,
        }
    }
}
