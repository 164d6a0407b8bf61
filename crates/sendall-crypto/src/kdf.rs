//! Key derivation: random paste key → AES-256 key via PBKDF2-HMAC-SHA256

use sha2::Sha256;
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A 256-bit AES key derived from the paste key.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the AES-256 key from the random paste key.
///
/// Deterministic for a given (key, salt, iterations), so any compliant
/// client holding the link fragment derives the same key.
pub fn derive_cipher_key(random_key: &[u8], kdf_salt: &[u8], iterations: u32) -> CipherKey {
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(random_key, kdf_salt, iterations, &mut bytes);
    CipherKey { bytes }
}
