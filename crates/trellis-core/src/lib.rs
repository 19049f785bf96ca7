//! trellis-core: a path-addressed hierarchical task store.
//!
//! Tasks form an arbitrarily deep tree stored as flat JSON documents in a
//! key/value record store. Each task's `path` — the ordered ancestor ids
//! from the root down to itself — is the sole source of structural truth;
//! parent/child/descendant queries are derived from paths on demand.
//!
//! The main entry points:
//! - [`Hierarchy`] — create/update/delete/move/copy/state operations plus a
//!   bounded undo log.
//! - [`RecordStore`] — the backend contract, with [`MemoryStore`] and
//!   [`SqliteStore`] implementations.
//! - [`Watcher`] — live, cancellable per-task change subscriptions.
//!
//! # Conventions
//!
//! - **Errors**: fallible operations return [`Result`] with [`StoreError`];
//!   ambient plumbing (config loading) uses `anyhow::Result`.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`);
//!   the crate never installs a subscriber.

pub mod check;
pub mod config;
pub mod error;
pub mod model;
pub mod ops;
pub mod path;
pub mod progress;
pub mod store;
pub mod undo;
pub mod watch;

pub use config::StoreConfig;
pub use error::{ErrorCode, Result, StoreError};
pub use model::task::{StateChange, Task, TaskDraft, TaskState};
pub use model::task_id::{ROOT_ID, TaskId};
pub use ops::Hierarchy;
pub use path::TaskPath;
pub use store::{ChangeFeed, ChangeKind, MemoryStore, RecordChange, RecordStore, SqliteStore};
pub use undo::{UndoEntry, UndoKind, UndoLog};
pub use watch::{WatchHandle, Watcher};
