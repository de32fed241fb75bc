//! Persistence boundary for generated tools.
//!
//! Records are immutable once stored: there is create, list and delete, but no
//! update. Id assignment is delegated to the storage backend.

mod sqlite;

pub use sqlite::SqliteToolRepository;

use crate::error::Result;
use crate::schema::{ToolRecord, ToolSpecification};
use async_trait::async_trait;

#[async_trait]
pub trait ToolRepository: Send + Sync {
    /// Persist a validated specification and return it with its new id.
    ///
    /// `output` is stored as text regardless of its declared type.
    async fn create(&self, spec: ToolSpecification, schema_version: u32) -> Result<ToolRecord>;

    /// All stored records, oldest first.
    async fn list(&self) -> Result<Vec<ToolRecord>>;

    /// Remove the record with `id`. Returns `false` if there was none.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<()>;
}
