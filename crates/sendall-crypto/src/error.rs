use sendall_core::SendallError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The OS random source failed; nothing can be encrypted safely.
    #[error("OS random source unavailable: {0}")]
    Randomness(String),

    #[error("cipher setup failed: {0}")]
    Cipher(String),

    #[error("paste encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, tampered ciphertext, or tampered adata.
    #[error("authentication failed: wrong key, corrupted ciphertext, or modified adata")]
    Authentication,

    #[error("unsupported adata: {0}")]
    InvalidAdata(String),

    #[error("compression '{0}' not available in this build")]
    UnsupportedCompression(&'static str),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CryptoError> for SendallError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Randomness(msg) => SendallError::Randomness(msg),
            CryptoError::Cipher(msg) => SendallError::Cipher(msg),
            other => SendallError::Crypto(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failures_are_fatal() {
        let err = SendallError::from(CryptoError::Cipher("bad key length".into()));
        assert!(matches!(err, SendallError::Cipher(_)));
        assert!(err.is_fatal());

        let err = SendallError::from(CryptoError::Randomness("getrandom".into()));
        assert!(err.is_fatal());
    }

    #[test]
    fn per_paste_failures_are_not_fatal() {
        for e in [
            CryptoError::UnsupportedCompression("zlib"),
            CryptoError::Authentication,
            CryptoError::InvalidAdata("nonce mismatch".into()),
            CryptoError::Compression("truncated".into()),
            CryptoError::Encryption("message too long".into()),
        ] {
            let err = SendallError::from(e);
            assert!(matches!(err, SendallError::Crypto(_)), "{err}");
            assert!(!err.is_fatal());
        }
    }
}
