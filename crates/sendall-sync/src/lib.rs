//! sendall-sync: sharing backends, the persistent link store, and the
//! concurrent submit/delete pipelines.

pub mod engine;
pub mod privatebin;
pub mod service;
pub mod state;
pub mod transfer;

pub use engine::{
    build_http_client, delete_links, submit_files, DeletionRecord, DeletionReport, ProgressFn,
    SubmissionRecord, SubmissionReport, Submitted,
};
pub use privatebin::{PasteResponse, PrivateBinClient, SUBMIT_CONTENT_TYPE};
pub use service::{Backend, Receipt};
pub use state::{LinkStore, PRIVATEBIN_BUCKET, TRANSFERSH_BUCKET};
pub use transfer::TransferShClient;
