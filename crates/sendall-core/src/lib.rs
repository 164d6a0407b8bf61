//! sendall-core: configuration schema, shared paste types, and the error
//! taxonomy used by every other sendall crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::SendallConfig;
pub use error::{SendallError, SendallResult};
pub use types::{Compression, Expiry, LinkRecord, PasteFormat};
