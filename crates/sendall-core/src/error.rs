use thiserror::Error;

pub type SendallResult<T> = Result<T, SendallError>;

#[derive(Debug, Error)]
pub enum SendallError {
    /// Unusable configuration or local state (e.g. store file not writable).
    #[error("config error: {0}")]
    Config(String),

    /// The OS random source could not be read.
    #[error("randomness unavailable: {0}")]
    Randomness(String),

    /// The AEAD cipher could not be set up; no paste can be sealed.
    #[error("cipher unavailable: {0}")]
    Cipher(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    /// One input item is unusable (e.g. a path with no file name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("network error: {0}")]
    Network(String),

    /// The server answered, but not with a success signal.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no record for {0}")]
    NoRecord(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{failed} of {total} items failed")]
    Batch { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SendallError {
    /// Errors after which no further work in the run can proceed safely.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SendallError::Config(_) | SendallError::Randomness(_) | SendallError::Cipher(_)
        )
    }
}
