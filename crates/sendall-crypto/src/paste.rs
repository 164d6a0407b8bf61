//! Paste envelope encryption with AES-256-GCM (16-byte nonce)
//!
//! Encrypted paste format:
//! ```text
//! ct  = AES-256-GCM(key, nonce, aad = json(adata), json({"paste": ...})) || 16-byte tag
//! key = PBKDF2-HMAC-SHA256(random_key, kdf_salt, iterations)
//! ```
//!
//! The adata is authenticated but not encrypted: the server can store it,
//! any change to it (or to the ciphertext) fails decryption.

use aes_gcm::aead::{consts::U16, Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use sendall_core::Compression;

use crate::adata::AssociatedData;
use crate::error::CryptoError;
use crate::kdf::derive_cipher_key;
use crate::keys::KeyMaterial;
use crate::{KDF_SALT_SIZE, KEY_SIZE, NONCE_SIZE};

/// AES-256-GCM with the 128-bit nonce PrivateBin uses.
type PasteCipher = AesGcm<Aes256, U16>;

/// Plaintext structure that gets encrypted.
///
/// Only `paste` is sent today; attachment fields are reserved and omitted
/// when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteEnvelope {
    pub paste: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
}

impl PasteEnvelope {
    pub fn new(paste: impl Into<String>) -> Self {
        Self {
            paste: paste.into(),
            attachment: None,
            attachment_name: None,
        }
    }
}

/// Encrypt `plaintext` as a paste envelope.
///
/// `nonce` and `kdf_salt` must be the ones recorded in `adata`, otherwise a
/// receiving client could never decrypt the result.
///
/// Returns `ciphertext || tag`.
pub fn encrypt(
    plaintext: &str,
    kdf_salt: &[u8; KDF_SALT_SIZE],
    nonce: &[u8; NONCE_SIZE],
    random_key: &[u8; KEY_SIZE],
    adata: &AssociatedData,
) -> Result<Vec<u8>, CryptoError> {
    if &adata.cipher.nonce != nonce || &adata.cipher.kdf_salt != kdf_salt {
        return Err(CryptoError::InvalidAdata(
            "nonce or kdf salt differs from the one declared in adata".into(),
        ));
    }

    let key = derive_cipher_key(random_key, kdf_salt, adata.cipher.kdf_iterations);
    let cipher = PasteCipher::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;

    let mut envelope = serde_json::to_vec(&PasteEnvelope::new(plaintext))?;
    let compressed = compress(&envelope, adata.cipher.compression);
    envelope.zeroize();
    let mut body = compressed?;

    let aad = adata.to_json()?;
    let ciphertext = cipher
        .encrypt(
            Nonce::<U16>::from_slice(nonce),
            Payload {
                msg: &body,
                aad: &aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()));
    body.zeroize();

    ciphertext
}

/// Encrypt with the nonce, salt and key of one `KeyMaterial` draw.
pub fn seal_paste(
    plaintext: &str,
    material: &KeyMaterial,
    adata: &AssociatedData,
) -> Result<Vec<u8>, CryptoError> {
    encrypt(
        plaintext,
        material.kdf_salt(),
        material.nonce(),
        material.key(),
        adata,
    )
}

/// Decrypt a paste, taking nonce, salt, iterations and compression from `adata`.
pub fn decrypt(
    ciphertext: &[u8],
    random_key: &[u8],
    adata: &AssociatedData,
) -> Result<PasteEnvelope, CryptoError> {
    decrypt_with_aad(ciphertext, random_key, &adata.to_json()?)
}

/// Decrypt using the adata exactly as received.
///
/// The raw bytes are what gets authenticated, so this is the form a client
/// uses when reading a paste back from the server.
pub fn decrypt_with_aad(
    ciphertext: &[u8],
    random_key: &[u8],
    aad: &[u8],
) -> Result<PasteEnvelope, CryptoError> {
    let adata: AssociatedData =
        serde_json::from_slice(aad).map_err(|e| CryptoError::InvalidAdata(e.to_string()))?;
    adata.validate()?;

    let key = derive_cipher_key(
        random_key,
        &adata.cipher.kdf_salt,
        adata.cipher.kdf_iterations,
    );
    let cipher = PasteCipher::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;

    let mut body = cipher
        .decrypt(
            Nonce::<U16>::from_slice(&adata.cipher.nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| {
            tracing::debug!(ct_len = ciphertext.len(), "paste failed authentication");
            CryptoError::Authentication
        })?;

    let envelope = decompress(&body, adata.cipher.compression);
    body.zeroize();
    let mut envelope = envelope?;
    let parsed = serde_json::from_slice(&envelope);
    envelope.zeroize();

    Ok(parsed?)
}

fn compress(data: &[u8], compression: Compression) -> Result<Vec<u8>, CryptoError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Zlib => deflate(data),
    }
}

fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>, CryptoError> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Zlib => inflate(data),
    }
}

#[cfg(feature = "zlib")]
fn deflate(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CryptoError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CryptoError::Compression(e.to_string()))
}

#[cfg(feature = "zlib")]
fn inflate(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| CryptoError::Compression(e.to_string()))?;
    Ok(out)
}

#[cfg(not(feature = "zlib"))]
fn deflate(_data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Err(CryptoError::UnsupportedCompression("zlib"))
}

#[cfg(not(feature = "zlib"))]
fn inflate(_data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Err(CryptoError::UnsupportedCompression("zlib"))
}
