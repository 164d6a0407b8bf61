//! sendall-crypto: client-side zero-knowledge encryption for PrivateBin v2 pastes
//!
//! Pipeline: random key → PBKDF2-SHA256 → AES-256-GCM(envelope, AAD = adata) → submission
//!
//! ```text
//! KeyMaterial (one OS-random draw per paste, never persisted)
//!   ├── key      32 bytes  → base58, URL fragment only; PBKDF2 password
//!   ├── nonce    16 bytes  → GCM IV, carried in adata
//!   └── kdf_salt  8 bytes  → PBKDF2 salt, carried in adata
//!
//! adata = [[nonce, salt, 100000, 256, 128, "aes", "gcm", "none"], format, discussion, burn]
//! ct    = AES-256-GCM(key = PBKDF2(key, salt), iv = nonce, aad = json(adata), {"paste": ...}) || tag
//! ```

pub mod adata;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod paste;
pub mod submission;

pub use adata::{AssociatedData, CipherSpec};
pub use error::CryptoError;
pub use kdf::{derive_cipher_key, CipherKey};
pub use keys::KeyMaterial;
pub use paste::{decrypt, encrypt, seal_paste, PasteEnvelope};
pub use submission::{assemble, EncryptedSubmission, PasteMeta};

/// Size of the random paste key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the GCM nonce PrivateBin uses (128-bit)
pub const NONCE_SIZE: usize = 16;

/// Size of the PBKDF2 salt
pub const KDF_SALT_SIZE: usize = 8;

/// Size of the GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count fixed by the protocol
pub const KDF_ITERATIONS: u32 = 100_000;

/// Cipher key size in bits, as declared in adata
pub const KEY_BITS: u32 = 256;

/// Authentication tag size in bits, as declared in adata
pub const TAG_BITS: u32 = 128;

/// Paste format version sent as `v`
pub const FORMAT_VERSION: u8 = 2;
