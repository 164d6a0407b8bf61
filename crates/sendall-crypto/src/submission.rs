//! The JSON document POSTed to a PrivateBin server

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use sendall_core::Expiry;

use crate::adata::AssociatedData;
use crate::FORMAT_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteMeta {
    pub expire: Expiry,
}

/// `{"adata": ..., "meta": {"expire": ...}, "v": 2, "ct": "<base64>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSubmission {
    pub adata: AssociatedData,
    pub meta: PasteMeta,
    #[serde(deserialize_with = "version_from_number")]
    v: u8,
    #[serde(serialize_with = "ct_to_base64", deserialize_with = "ct_from_base64")]
    pub ct: Vec<u8>,
}

impl EncryptedSubmission {
    pub fn version(&self) -> u8 {
        self.v
    }
}

/// Build the submission document for an already-encrypted paste.
pub fn assemble(adata: AssociatedData, ciphertext: Vec<u8>, expiry: Expiry) -> EncryptedSubmission {
    EncryptedSubmission {
        adata,
        meta: PasteMeta { expire: expiry },
        v: FORMAT_VERSION,
        ct: ciphertext,
    }
}

fn version_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let v = u8::deserialize(deserializer)?;
    if v != FORMAT_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported paste format version {v}, expected {FORMAT_VERSION}"
        )));
    }
    Ok(v)
}

fn ct_to_base64<S: Serializer>(ct: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(ct))
}

fn ct_from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded)
        .map_err(serde::de::Error::custom)
}
