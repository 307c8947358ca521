//! File-backed local store on redb.
//!
//! Used when `SECURITYX_LOCAL_STORE` points at a file, so fallback snapshots
//! and pending sign-ups survive a restart. Every redb call is blocking and
//! runs on the Tokio blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::{StorageBackend, StorageError};

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// A redb-backed store. Cheap to clone.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn txn_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

fn table_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::MissingTable {
        name: format!("entries: {e}"),
    }
}

impl RedbBackend {
    /// Open or create the database file and make sure the table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be created or
    /// opened, or a transaction error if the table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let txn = db.begin_write().map_err(txn_err)?;
        txn.open_table(ENTRIES).map_err(table_err)?;
        txn.commit().map_err(txn_err)?;

        tracing::debug!(path = %path.display(), "opened redb local store");
        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Filesystem path of the database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::Transaction {
                reason: format!("blocking task failed: {e}"),
            })?
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(txn_err)?;
            let table = txn.open_table(ENTRIES).map_err(table_err)?;
            let value = table.get(key.as_str()).map_err(|e| StorageError::Read {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            Ok(value.map(|v| v.value().to_vec()))
        })
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let key = key.to_owned();
        let value = value.to_vec();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            {
                let mut table = txn.open_table(ENTRIES).map_err(table_err)?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(|e| StorageError::Write {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(txn_err)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            {
                let mut table = txn.open_table(ENTRIES).map_err(table_err)?;
                table
                    .remove(key.as_str())
                    .map_err(|e| StorageError::Delete {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(txn_err)
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.to_owned();
        self.blocking(move |db| {
            let list_err = |e: &dyn std::fmt::Display| StorageError::List {
                prefix: prefix.clone(),
                reason: e.to_string(),
            };
            let txn = db.begin_read().map_err(txn_err)?;
            let table = txn.open_table(ENTRIES).map_err(table_err)?;
            let mut keys = Vec::new();
            for item in table.range(prefix.as_str()..).map_err(|e| list_err(&e))? {
                let (k, _) = item.map_err(|e| list_err(&e))?;
                if !k.value().starts_with(prefix.as_str()) {
                    break;
                }
                keys.push(k.value().to_owned());
            }
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.redb");

        {
            let store = RedbBackend::open(&path).unwrap();
            store.put("integrations/u1", b"[]").await.unwrap();
        }

        let store = RedbBackend::open(&path).unwrap();
        assert_eq!(
            store.get("integrations/u1").await.unwrap(),
            Some(b"[]".to_vec())
        );
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbBackend::open(dir.path().join("local.redb")).unwrap();
        store.put("pending_profile/a", b"1").await.unwrap();
        store.put("pending_profile/b", b"2").await.unwrap();
        store.put("integrations/a", b"3").await.unwrap();

        assert_eq!(
            store.list("pending_profile/").await.unwrap(),
            vec!["pending_profile/a", "pending_profile/b"]
        );

        store.delete("pending_profile/a").await.unwrap();
        store.delete("pending_profile/a").await.unwrap();
        assert!(!store.exists("pending_profile/a").await.unwrap());
    }
}
