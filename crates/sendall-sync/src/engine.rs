//! Submission and deletion pipelines
//!
//!   - `submit_files`: file → backend submit → link record → link store
//!   - `delete_links`: link store lookup → backend delete → link store removal
//!
//! Both run one task per item in a `JoinSet`, bounded by a semaphore sized
//! from `PipelineConfig::workers()`. Items are independent: a failure is
//! recorded against its item and the rest of the batch continues. Results
//! come back in input order regardless of completion order.
//!
//! Cancellation covers permit waits and network calls only. Once a server
//! has confirmed a submission the store commit always runs, so a cancelled
//! batch never drops a link it already paid for.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sendall_core::config::PipelineConfig;
use sendall_core::{LinkRecord, SendallError, SendallResult};

use crate::service::{Backend, Receipt};
use crate::state::LinkStore;

/// Progress callback type (items_done, items_total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

const USER_AGENT: &str = concat!("sendall/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by every task of a run.
pub fn build_http_client(config: &PipelineConfig) -> SendallResult<Client> {
    let mut builder = ClientBuilder::new()
        .pool_idle_timeout(Duration::from_secs(4))
        .user_agent(USER_AGENT);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| SendallError::Config(format!("building HTTP client: {e}")))
}

/// A confirmed and recorded submission.
#[derive(Debug)]
pub struct Submitted {
    pub receipt: Receipt,
    pub link: LinkRecord,
}

/// Outcome for one input file.
#[derive(Debug)]
pub struct SubmissionRecord {
    /// Position in the input list
    pub index: usize,
    pub file: PathBuf,
    pub outcome: SendallResult<Submitted>,
}

#[derive(Debug, Default)]
pub struct SubmissionReport {
    /// One record per input file, in input order
    pub records: Vec<SubmissionRecord>,
}

impl SubmissionReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&SubmissionRecord, &Submitted)> {
        self.records
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok().map(|s| (r, s)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&SubmissionRecord, &SendallError)> {
        self.records
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Aggregate error if any item failed. Successful items stay recorded.
    pub fn ensure_success(&self) -> SendallResult<()> {
        batch_result(self.failure_count(), self.records.len())
    }
}

/// Outcome for one link passed to `delete_links`.
#[derive(Debug)]
pub struct DeletionRecord {
    pub index: usize,
    pub public_url: String,
    pub outcome: SendallResult<()>,
}

#[derive(Debug, Default)]
pub struct DeletionReport {
    pub records: Vec<DeletionRecord>,
}

impl DeletionReport {
    pub fn deleted(&self) -> impl Iterator<Item = &DeletionRecord> {
        self.records.iter().filter(|r| r.outcome.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&DeletionRecord, &SendallError)> {
        self.records
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn ensure_success(&self) -> SendallResult<()> {
        batch_result(self.failure_count(), self.records.len())
    }
}

fn batch_result(failed: usize, total: usize) -> SendallResult<()> {
    if failed == 0 {
        Ok(())
    } else {
        Err(SendallError::Batch { failed, total })
    }
}

/// Submit every file and record each confirmed link.
///
/// Never fails as a whole: per-file errors are in the report. A fatal error
/// (no randomness, no usable cipher) cancels the rest of the batch.
pub async fn submit_files(
    backend: &Backend,
    store: &Arc<LinkStore>,
    files: &[PathBuf],
    config: &PipelineConfig,
    cancel: &CancellationToken,
    progress: Option<&ProgressFn>,
) -> SubmissionReport {
    let total = files.len();
    let backend = Arc::new(backend.clone());
    let semaphore = Arc::new(Semaphore::new(config.workers()));
    let cancel = cancel.child_token();
    let deadline = spawn_deadline(&cancel, config.deadline());

    info!(
        backend = backend.name(),
        files = total,
        workers = config.workers(),
        "submitting"
    );

    let mut tasks = JoinSet::new();
    for (index, file) in files.iter().cloned().enumerate() {
        let backend = Arc::clone(&backend);
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let outcome = submit_one(&backend, &store, &file, &semaphore, &cancel).await;
            SubmissionRecord {
                index,
                file,
                outcome,
            }
        });
    }

    let mut slots: Vec<Option<SubmissionRecord>> = (0..total).map(|_| None).collect();
    let mut done = 0u64;
    while let Some(joined) = tasks.join_next().await {
        done += 1;
        let record = match joined {
            Ok(record) => record,
            Err(e) => {
                warn!("submission task aborted: {e}");
                continue;
            }
        };

        let name = record.file.display().to_string();
        match &record.outcome {
            Ok(_) => info!(file = %name, bucket = backend.bucket(), "submitted"),
            Err(e) => {
                warn!(file = %name, error = %e, "submission failed");
                if e.is_fatal() {
                    cancel.cancel();
                }
            }
        }
        if let Some(cb) = progress {
            cb(done, total as u64, &name);
        }

        let index = record.index;
        slots[index] = Some(record);
    }

    if let Some(handle) = deadline {
        handle.abort();
    }

    let records = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| SubmissionRecord {
                index,
                file: files[index].clone(),
                outcome: Err(task_lost()),
            })
        })
        .collect();

    SubmissionReport { records }
}

async fn submit_one(
    backend: &Backend,
    store: &Arc<LinkStore>,
    file: &std::path::Path,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> SendallResult<Submitted> {
    if cancel.is_cancelled() {
        return Err(SendallError::Cancelled);
    }

    let receipt = cancellable(cancel, async {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| SendallError::Cancelled)?;
        debug!(file = %file.display(), "submitting");
        backend.submit(file).await
    })
    .await?;

    // Past this point the server holds the object: record it even if the
    // batch has been cancelled meanwhile.
    let link = backend.record_link(&receipt);
    let bucket = backend.bucket();
    let (public_url, delete_url) = (link.public_url.clone(), link.delete_url.clone());
    with_store(store, move |s| s.put(bucket, &public_url, &delete_url)).await?;

    Ok(Submitted { receipt, link })
}

/// Delete every link through its backend, removing records that are
/// confirmed gone.
///
/// A link without a record fails with `NoRecord`; a link whose remote
/// deletion fails keeps its record so it can be retried later.
pub async fn delete_links(
    backend: &Backend,
    store: &Arc<LinkStore>,
    public_urls: &[String],
    config: &PipelineConfig,
    cancel: &CancellationToken,
    progress: Option<&ProgressFn>,
) -> DeletionReport {
    let total = public_urls.len();
    let backend = Arc::new(backend.clone());
    let semaphore = Arc::new(Semaphore::new(config.workers()));
    let cancel = cancel.child_token();
    let deadline = spawn_deadline(&cancel, config.deadline());

    info!(backend = backend.name(), links = total, "deleting");

    let mut tasks = JoinSet::new();
    for (index, public_url) in public_urls.iter().cloned().enumerate() {
        let backend = Arc::clone(&backend);
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let outcome = delete_one(&backend, &store, &public_url, &semaphore, &cancel).await;
            DeletionRecord {
                index,
                public_url,
                outcome,
            }
        });
    }

    let mut slots: Vec<Option<DeletionRecord>> = (0..total).map(|_| None).collect();
    let mut done = 0u64;
    while let Some(joined) = tasks.join_next().await {
        done += 1;
        let record = match joined {
            Ok(record) => record,
            Err(e) => {
                warn!("deletion task aborted: {e}");
                continue;
            }
        };

        let shown = without_fragment(&record.public_url).to_string();
        match &record.outcome {
            Ok(()) => info!(link = %shown, bucket = backend.bucket(), "deleted"),
            Err(e) => warn!(link = %shown, error = %e, "deletion failed"),
        }
        if let Some(cb) = progress {
            cb(done, total as u64, &shown);
        }

        let index = record.index;
        slots[index] = Some(record);
    }

    if let Some(handle) = deadline {
        handle.abort();
    }

    let records = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| DeletionRecord {
                index,
                public_url: public_urls[index].clone(),
                outcome: Err(task_lost()),
            })
        })
        .collect();

    DeletionReport { records }
}

async fn delete_one(
    backend: &Backend,
    store: &Arc<LinkStore>,
    public_url: &str,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> SendallResult<()> {
    if cancel.is_cancelled() {
        return Err(SendallError::Cancelled);
    }
    let bucket = backend.bucket();

    let key = public_url.to_string();
    let delete_url = with_store(store, move |s| s.get(bucket, &key))
        .await?
        .ok_or_else(|| SendallError::NoRecord(public_url.to_string()))?;

    cancellable(cancel, async {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| SendallError::Cancelled)?;
        backend.delete(&delete_url).await
    })
    .await?;

    let key = public_url.to_string();
    with_store(store, move |s| s.delete(bucket, &key)).await
}

/// Run `work` unless `cancel` fires first. Completed work wins a tie.
async fn cancellable<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = SendallResult<T>>,
) -> SendallResult<T> {
    tokio::select! {
        biased;
        result = work => result,
        _ = cancel.cancelled() => Err(SendallError::Cancelled),
    }
}

/// Run a store operation on the blocking pool.
async fn with_store<T, F>(store: &Arc<LinkStore>, op: F) -> SendallResult<T>
where
    T: Send + 'static,
    F: FnOnce(&LinkStore) -> SendallResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| SendallError::Store(format!("store task failed: {e}")))?
}

fn spawn_deadline(cancel: &CancellationToken, limit: Option<Duration>) -> Option<JoinHandle<()>> {
    let limit = limit?;
    let cancel = cancel.clone();
    Some(tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        warn!(limit_secs = limit.as_secs(), "deadline reached, cancelling remaining items");
        cancel.cancel();
    }))
}

fn task_lost() -> SendallError {
    SendallError::Other(anyhow::anyhow!("task ended without a result"))
}

/// Strip the `#fragment`; PrivateBin links carry the paste key there.
fn without_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(base, _)| base)
}
