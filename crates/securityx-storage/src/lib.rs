//! Local key-value storage for `SecurityX`.
//!
//! The hosted backend owns every durable row. This crate is the small local
//! tier that sits beside it: integration snapshots written when the backend
//! is not reachable, and sign-up data parked until the user's first
//! dashboard visit.
//!
//! Two implementations are provided:
//!
//! - [`MemoryBackend`]: in-process, the default for development and tests
//! - [`RedbBackend`]: file-backed, pure Rust (feature `redb-backend`)

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_backend;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;

/// Local key-value store used for fallback snapshots and parked sign-up data.
///
/// Keys are `/`-separated strings such as `integrations/<user_id>`; values
/// are JSON bytes written by the repositories in `securityx-core`. Every
/// method fails with the [`StorageError`] variant named after the operation.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Overwrites any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Keys under `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}
