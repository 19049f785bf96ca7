//! In-memory record store.
//!
//! The default backend for tests and short-lived embedding: a `BTreeMap`
//! behind a `Mutex`, with the same revision-conflict contract as the durable
//! backend. Nothing survives the process.

use crate::error::{Result, StoreError};
use crate::model::task::Task;
use crate::model::task_id::TaskId;
use crate::store::feed::{ChangeFeed, ChangeKind, RecordChange};
use crate::store::RecordStore;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Volatile `BTreeMap`-backed record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<TaskId, Task>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("record map poisoned").len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        Ok(self
            .records
            .lock()
            .expect("record map poisoned")
            .get(id)
            .cloned())
    }

    fn put(&self, task: &Task) -> Result<u64> {
        let new_rev = {
            let mut records = self.records.lock().expect("record map poisoned");
            let stored_rev = records.get(&task.id).map_or(0, |stored| stored.rev);
            if stored_rev != task.rev {
                return Err(StoreError::Conflict(task.id.clone()));
            }
            let new_rev = stored_rev + 1;
            let mut stored = task.clone();
            stored.rev = new_rev;
            records.insert(task.id.clone(), stored);
            new_rev
        };

        self.feed.publish(&RecordChange {
            id: task.id.clone(),
            kind: ChangeKind::Put,
        });
        Ok(new_rev)
    }

    fn remove(&self, id: &TaskId) -> Result<()> {
        let removed = self
            .records
            .lock()
            .expect("record map poisoned")
            .remove(id);
        if removed.is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }

        self.feed.publish(&RecordChange {
            id: id.clone(),
            kind: ChangeKind::Remove,
        });
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Task>> {
        Ok(self
            .records
            .lock()
            .expect("record map poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}
