//! The record-store contract and its bundled implementations.
//!
//! The hierarchy layer is written against [`RecordStore`], a thin contract
//! over a document-oriented key/value backend. Records are whole [`Task`]
//! documents keyed by id, with revision-based optimistic concurrency:
//! a `put` must carry the revision it read (0 for a brand-new record) and is
//! rejected with [`crate::StoreError::Conflict`] when the stored revision
//! moved underneath it.
//!
//! Two backends ship with the crate: [`MemoryStore`] for tests and embedding,
//! and [`SqliteStore`] for durable single-file storage.

pub mod feed;
pub mod memory;
pub mod sqlite;

pub use feed::{CancelToken, ChangeFeed, ChangeKind, RecordChange};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::task::Task;
use crate::model::task_id::TaskId;

/// Contract over a document-oriented key/value backend.
///
/// Implementations are internally synchronized: every method takes `&self`
/// and may be called from interleaved readers while a single logical writer
/// mutates. No method spans more than one record atomically; multi-record
/// atomicity is the hierarchy layer's concern.
pub trait RecordStore: Send + Sync {
    /// Fetch the record stored under `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Backend`] on backing-store failure.
    fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Write `task` under its id, enforcing optimistic concurrency.
    ///
    /// `task.rev` must equal the stored revision (0 when the record does not
    /// exist yet). On success the record is stored with the next revision,
    /// which is returned; a [`RecordChange`] with [`ChangeKind::Put`] is
    /// published on the feed after the write is applied.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Conflict`] on a revision mismatch, or
    /// [`crate::StoreError::Backend`] on backing-store failure.
    fn put(&self, task: &Task) -> Result<u64>;

    /// Remove the record stored under `id`.
    ///
    /// Publishes a [`ChangeKind::Remove`] change after the record is gone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if no record exists, or
    /// [`crate::StoreError::Backend`] on backing-store failure.
    fn remove(&self, id: &TaskId) -> Result<()>;

    /// Every stored record, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Backend`] on backing-store failure.
    fn list_all(&self) -> Result<Vec<Task>>;

    /// The raw per-record change feed for this store instance.
    fn feed(&self) -> &ChangeFeed;
}
