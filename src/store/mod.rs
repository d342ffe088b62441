pub mod fs;
pub mod pg;

use crate::catalog::ProductVariant;
use crate::error::SyncError;
use async_trait::async_trait;
use bytes::Bytes;

pub use fs::FsFileStore;
pub use pg::PgProductTable;

/// Persisted product table. Mutated only by the orchestrator's Pull and
/// Import stages; concurrent runs against the same table must be serialized
/// by the caller.
#[async_trait]
pub trait ProductTable: Send + Sync {
    /// Insert or update records keyed by SKU. Idempotent; returns the
    /// number of records written.
    async fn upsert(&self, records: &[ProductVariant]) -> Result<u64, SyncError>;

    /// Full stored record set, in stable SKU order.
    async fn read_all(&self) -> Result<Vec<ProductVariant>, SyncError>;
}

/// Flat-file sink/source addressed by logical `<collection>/<file>` paths
/// (e.g. `imports/catalog.csv`).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store bytes under a logical name; returns a locator usable with
    /// [`FileStore::retrieve`].
    async fn store(&self, name: &str, bytes: Bytes) -> Result<String, SyncError>;

    /// Fetch previously stored bytes by locator.
    async fn retrieve(&self, locator: &str) -> Result<Bytes, SyncError>;
}
