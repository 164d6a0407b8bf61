//! Persistent link store: public URL → deletion URL.
//!
//! One redb database file holds a table ("bucket") per backend. Every
//! mutation is its own write transaction, so a record is either fully
//! written or absent. redb serializes writers internally; share the store
//! across tasks with `Arc<LinkStore>` and call it from the blocking pool.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition, TableError};
use tracing::{debug, info};

use sendall_core::{LinkRecord, SendallError, SendallResult};

/// Bucket for PrivateBin pastes.
pub const PRIVATEBIN_BUCKET: &str = "privatebin";

/// Bucket for transfer.sh uploads.
pub const TRANSFERSH_BUCKET: &str = "transfersh";

fn bucket_table(bucket: &str) -> TableDefinition<'_, &'static str, &'static str> {
    TableDefinition::new(bucket)
}

fn store_err<E: Into<redb::Error>>(e: E) -> SendallError {
    SendallError::Store(e.into().to_string())
}

pub struct LinkStore {
    db: Database,
    path: PathBuf,
}

impl LinkStore {
    /// Open or create the store at `path`, creating parent directories.
    ///
    /// Failure here is a configuration fault: nothing can be recorded, so
    /// callers must stop before any network activity.
    pub fn open(path: &Path) -> SendallResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SendallError::Config(format!("creating store dir {}: {e}", parent.display()))
            })?;
        }

        let db = Database::create(path).map_err(|e| {
            SendallError::Config(format!("opening link store {}: {e}", path.display()))
        })?;

        info!(path = %path.display(), "opened link store");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `public_url → delete_url`, creating the bucket if needed.
    /// An existing record for the same public URL is replaced.
    pub fn put(&self, bucket: &str, public_url: &str, delete_url: &str) -> SendallResult<()> {
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = txn.open_table(bucket_table(bucket)).map_err(store_err)?;
            table.insert(public_url, delete_url).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)?;

        debug!(bucket, public_url, "link recorded");
        Ok(())
    }

    pub fn get(&self, bucket: &str, public_url: &str) -> SendallResult<Option<String>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = match txn.open_table(bucket_table(bucket)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(store_err(e)),
        };

        let value = table.get(public_url).map_err(store_err)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    /// Remove the record for `public_url`.
    ///
    /// Returns `NoRecord` (and writes nothing) if the key is absent.
    pub fn delete(&self, bucket: &str, public_url: &str) -> SendallResult<()> {
        let txn = self.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut table = txn.open_table(bucket_table(bucket)).map_err(store_err)?;
            let old = table.remove(public_url).map_err(store_err)?;
            old.is_some()
        };

        if !removed {
            txn.abort().map_err(store_err)?;
            return Err(SendallError::NoRecord(public_url.to_string()));
        }

        txn.commit().map_err(store_err)?;
        debug!(bucket, public_url, "link removed");
        Ok(())
    }

    /// All records in `bucket`, ordered by public URL.
    pub fn list(&self, bucket: &str) -> SendallResult<Vec<LinkRecord>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = match txn.open_table(bucket_table(bucket)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(store_err(e)),
        };

        let mut records = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (public_url, delete_url) = entry.map_err(store_err)?;
            records.push(LinkRecord::new(public_url.value(), delete_url.value()));
        }
        Ok(records)
    }
}
