//! PrivateBin v2 associated data (adata)
//!
//! Wire shape, authenticated as GCM AAD but sent in the clear:
//! ```text
//! [[nonce_b64, salt_b64, iterations, key_bits, tag_bits, "aes", "gcm", compression],
//!  format, open_discussion, burn_after_reading]
//! ```
//! Field order and JSON types are part of the authentication input: the
//! tag only verifies if both sides serialize this structure byte-identically.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use sendall_core::{Compression, PasteFormat};

use crate::error::CryptoError;
use crate::{KDF_ITERATIONS, KDF_SALT_SIZE, KEY_BITS, NONCE_SIZE, TAG_BITS};

const CIPHER_ALGORITHM: &str = "aes";
const CIPHER_MODE: &str = "gcm";

/// Inner array of the adata: how the ciphertext was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSpec {
    pub nonce: [u8; NONCE_SIZE],
    pub kdf_salt: [u8; KDF_SALT_SIZE],
    pub kdf_iterations: u32,
    pub key_bits: u32,
    pub tag_bits: u32,
    pub algorithm: String,
    pub mode: String,
    pub compression: Compression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedData {
    pub cipher: CipherSpec,
    pub format: PasteFormat,
    pub open_discussion: bool,
    pub burn_after_reading: bool,
}

impl AssociatedData {
    /// Protocol-default adata: 100000 PBKDF2 rounds, AES-256-GCM, 128-bit tag,
    /// no compression.
    pub fn build(
        nonce: &[u8; NONCE_SIZE],
        kdf_salt: &[u8; KDF_SALT_SIZE],
        format: PasteFormat,
        open_discussion: bool,
        burn_after_reading: bool,
    ) -> Self {
        Self {
            cipher: CipherSpec {
                nonce: *nonce,
                kdf_salt: *kdf_salt,
                kdf_iterations: KDF_ITERATIONS,
                key_bits: KEY_BITS,
                tag_bits: TAG_BITS,
                algorithm: CIPHER_ALGORITHM.to_string(),
                mode: CIPHER_MODE.to_string(),
                compression: Compression::None,
            },
            format,
            open_discussion,
            burn_after_reading,
        }
    }

    /// Declare a compression other than the default `none`.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.cipher.compression = compression;
        self
    }

    /// Canonical serialization, used verbatim as the GCM AAD.
    pub fn to_json(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Reject parameters this client cannot decrypt.
    pub fn validate(&self) -> Result<(), CryptoError> {
        let c = &self.cipher;
        if c.algorithm != CIPHER_ALGORITHM || c.mode != CIPHER_MODE {
            return Err(CryptoError::InvalidAdata(format!(
                "cipher {}-{} (expected {CIPHER_ALGORITHM}-{CIPHER_MODE})",
                c.algorithm, c.mode
            )));
        }
        if c.key_bits != KEY_BITS {
            return Err(CryptoError::InvalidAdata(format!("key size {} bits", c.key_bits)));
        }
        if c.tag_bits != TAG_BITS {
            return Err(CryptoError::InvalidAdata(format!("tag size {} bits", c.tag_bits)));
        }
        if c.kdf_iterations == 0 {
            return Err(CryptoError::InvalidAdata("zero KDF iterations".into()));
        }
        Ok(())
    }
}

impl Serialize for CipherSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            STANDARD.encode(self.nonce),
            STANDARD.encode(self.kdf_salt),
            self.kdf_iterations,
            self.key_bits,
            self.tag_bits,
            &self.algorithm,
            &self.mode,
            self.compression,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CipherSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (nonce, kdf_salt, kdf_iterations, key_bits, tag_bits, algorithm, mode, compression): (
            String,
            String,
            u32,
            u32,
            u32,
            String,
            String,
            Compression,
        ) = Deserialize::deserialize(deserializer)?;

        Ok(Self {
            nonce: decode_fixed(&nonce, "nonce").map_err(D::Error::custom)?,
            kdf_salt: decode_fixed(&kdf_salt, "kdf salt").map_err(D::Error::custom)?,
            kdf_iterations,
            key_bits,
            tag_bits,
            algorithm,
            mode,
            compression,
        })
    }
}

impl Serialize for AssociatedData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            &self.cipher,
            self.format,
            u8::from(self.open_discussion),
            u8::from(self.burn_after_reading),
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssociatedData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (cipher, format, open_discussion, burn_after_reading): (CipherSpec, PasteFormat, u8, u8) =
            Deserialize::deserialize(deserializer)?;
        Ok(Self {
            cipher,
            format,
            open_discussion: open_discussion != 0,
            burn_after_reading: burn_after_reading != 0,
        })
    }
}

fn decode_fixed<const N: usize>(encoded: &str, what: &str) -> Result<[u8; N], String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| format!("{what}: invalid base64: {e}"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("{what}: {} bytes (expected {N})", b.len()))
}
