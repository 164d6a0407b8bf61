//! Per-paste key material: random key, GCM nonce, and PBKDF2 salt

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::{KDF_SALT_SIZE, KEY_SIZE, NONCE_SIZE};

const DRAW_SIZE: usize = KEY_SIZE + NONCE_SIZE + KDF_SALT_SIZE;

/// Key, nonce and salt for exactly one paste. Zeroized on drop.
///
/// The key leaves the process only as the base58 URL fragment of the
/// shareable link; nonce and salt travel in the (public) adata.
#[derive(Clone)]
pub struct KeyMaterial {
    key: [u8; KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
    kdf_salt: [u8; KDF_SALT_SIZE],
}

impl KeyMaterial {
    /// Draw fresh material from the OS CSPRNG in a single read.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut buf = [0u8; DRAW_SIZE];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| CryptoError::Randomness(e.to_string()))?;

        let mut material = Self {
            key: [0u8; KEY_SIZE],
            nonce: [0u8; NONCE_SIZE],
            kdf_salt: [0u8; KDF_SALT_SIZE],
        };
        material.key.copy_from_slice(&buf[..KEY_SIZE]);
        material
            .nonce
            .copy_from_slice(&buf[KEY_SIZE..KEY_SIZE + NONCE_SIZE]);
        material
            .kdf_salt
            .copy_from_slice(&buf[KEY_SIZE + NONCE_SIZE..]);
        buf.zeroize();

        Ok(material)
    }

    pub fn from_parts(
        key: [u8; KEY_SIZE],
        nonce: [u8; NONCE_SIZE],
        kdf_salt: [u8; KDF_SALT_SIZE],
    ) -> Self {
        Self {
            key,
            nonce,
            kdf_salt,
        }
    }

    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    pub fn kdf_salt(&self) -> &[u8; KDF_SALT_SIZE] {
        &self.kdf_salt
    }

    /// The key as it appears after `#` in a shareable link.
    pub fn link_fragment(&self) -> String {
        bs58::encode(&self.key).into_string()
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.nonce.zeroize();
        self.kdf_salt.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .field("kdf_salt", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_draws_are_pairwise_distinct() {
        const SAMPLES: usize = 10_000;
        let mut keys = HashSet::with_capacity(SAMPLES);
        let mut nonces = HashSet::with_capacity(SAMPLES);
        let mut salts = HashSet::with_capacity(SAMPLES);

        for _ in 0..SAMPLES {
            let m = KeyMaterial::generate().unwrap();
            keys.insert(*m.key());
            nonces.insert(*m.nonce());
            salts.insert(*m.kdf_salt());
        }

        assert_eq!(keys.len(), SAMPLES, "keys must not repeat");
        assert_eq!(nonces.len(), SAMPLES, "nonces must not repeat");
        assert_eq!(salts.len(), SAMPLES, "salts must not repeat");
    }

    #[test]
    fn test_link_fragment_is_base58_of_key() {
        let m = KeyMaterial::from_parts([0u8; KEY_SIZE], [1u8; NONCE_SIZE], [2u8; KDF_SALT_SIZE]);
        // base58 keeps one '1' per leading zero byte
        assert_eq!(m.link_fragment(), "1".repeat(KEY_SIZE));

        let m = KeyMaterial::from_parts([0xFFu8; KEY_SIZE], [0u8; NONCE_SIZE], [0u8; KDF_SALT_SIZE]);
        let decoded = bs58::decode(m.link_fragment()).into_vec().unwrap();
        assert_eq!(decoded, vec![0xFFu8; KEY_SIZE]);
    }

    #[test]
    fn test_debug_redacts() {
        let m = KeyMaterial::from_parts([7u8; KEY_SIZE], [7u8; NONCE_SIZE], [7u8; KDF_SALT_SIZE]);
        let dbg = format!("{m:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains('7'));
    }
}
