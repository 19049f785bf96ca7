//! Hierarchy operations: the write path of the store.
//!
//! [`Hierarchy`] wraps a [`RecordStore`] and implements every structural and
//! state operation, deriving tree relationships through [`crate::path`] and
//! pushing an [`UndoEntry`] for each successful mutation.
//!
//! # Atomicity
//!
//! The backing store offers no multi-record transactions, so multi-step
//! operations order their writes to bound what an interleaved reader can
//! observe:
//!
//! - `delete` removes descendants **leaves-first** and the target last, so a
//!   reader never finds a child whose ancestor chain is already gone — only,
//!   transiently, an ancestor whose deepest descendants have vanished.
//! - `move_subtree` rewrites the target first, then each descendant
//!   independently. A crash mid-move can leave a partially moved subtree;
//!   this is a documented failure mode, not hidden.
//!
//! A single logical writer per store instance is assumed throughout;
//! interleaved readers are safe, interleaved writers are not coordinated.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::model::task::{Task, TaskDraft, TaskState};
use crate::model::task_id::TaskId;
use crate::path::{self, TaskPath};
use crate::store::RecordStore;
use crate::undo::{UndoEntry, UndoKind, UndoLog};
use chrono::Utc;
use std::sync::{Arc, Mutex};

/// Hierarchy operations over a record store.
pub struct Hierarchy<S: RecordStore> {
    store: Arc<S>,
    undo: Mutex<UndoLog>,
    config: StoreConfig,
}

impl<S: RecordStore> Hierarchy<S> {
    /// Wrap `store` with the default configuration.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, StoreConfig::default())
    }

    /// Wrap `store` with an explicit configuration.
    #[must_use]
    pub fn with_config(store: Arc<S>, config: StoreConfig) -> Self {
        Self {
            undo: Mutex::new(UndoLog::new(config.undo_limit)),
            store,
            config,
        }
    }

    /// The shared record store, e.g. for wiring up a
    /// [`crate::watch::Watcher`] against the same instance.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The root task, materializing it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on backing-store failure.
    pub fn root(&self) -> Result<Task> {
        self.ensure_root()
    }

    /// Fetch a task by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id is absent.
    pub fn task(&self, id: &TaskId) -> Result<Task> {
        self.require(id)
    }

    /// Every stored task, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on backing-store failure.
    pub fn all(&self) -> Result<Vec<Task>> {
        self.store.list_all()
    }

    /// Immediate children of `id`, derived from paths.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is absent.
    pub fn children(&self, id: &TaskId) -> Result<Vec<Task>> {
        self.require(id)?;
        let snapshot = self.store.list_all()?;
        Ok(path::immediate_children(id, &snapshot)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Every transitive descendant of `id`, excluding `id` itself.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is absent.
    pub fn subtree(&self, id: &TaskId) -> Result<Vec<Task>> {
        self.require(id)?;
        let snapshot = self.store.list_all()?;
        Ok(path::subtree_of(id, &snapshot)
            .into_iter()
            .cloned()
            .collect())
    }

    // -----------------------------------------------------------------------
    // Structural writes
    // -----------------------------------------------------------------------

    /// Create a task from `draft` under `parent` (root when `None`).
    ///
    /// The task receives a fresh id and `path = parent.path + [id]`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ParentNotFound`] if the parent is absent.
    pub fn create(&self, draft: TaskDraft, parent: Option<&TaskId>) -> Result<Task> {
        self.ensure_root()?;
        let parent_id = parent.map_or_else(TaskId::root, Clone::clone);
        let parent_task = self
            .store
            .get(&parent_id)?
            .ok_or_else(|| StoreError::ParentNotFound(parent_id.clone()))?;

        let mut task = Task::new(TaskId::generate(), draft.text, &parent_task.path);
        task.internal_state = draft.state;
        task.due_date = draft.due_date;
        task.rev = self.store.put(&task)?;

        self.append_child_cache(&parent_id, &task.id)?;
        self.record_undo(UndoEntry::Create { task: task.clone() });
        tracing::debug!(task = %task.id, parent = %parent_id, "created task");
        Ok(task)
    }

    /// Merge non-structural fields (text, due date) into the stored task.
    ///
    /// Lifecycle state is owned by [`Self::change_state`] /
    /// [`Self::advance_state`], and structure by the move/delete operations,
    /// so neither is merged here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id is absent.
    pub fn update(&self, task: &Task) -> Result<Task> {
        let stored = self.require(&task.id)?;
        let mut next = stored.clone();
        next.text = task.text.clone();
        next.due_date = task.due_date;
        next.rev = self.store.put(&next)?;

        self.record_undo(UndoEntry::AttributeChange { task: stored });
        tracing::debug!(task = %next.id, "updated task attributes");
        Ok(next)
    }

    /// Delete `id` and every descendant, leaves-first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RootDeletionForbidden`] for the root, or
    /// [`StoreError::NotFound`] if the id is absent.
    pub fn delete(&self, id: &TaskId) -> Result<()> {
        let (target, descendants, prior_parent) = self.apply_delete(id)?;
        let removed = descendants.len() + 1;
        self.record_undo(UndoEntry::Delete {
            task: target,
            descendants,
            prior_parent,
        });
        tracing::debug!(task = %id, removed, "deleted subtree");
        Ok(())
    }

    /// Move `id` (and its whole subtree) under `new_parent`.
    ///
    /// Every descendant keeps its relative suffix: its new path is the moved
    /// task's new path plus the segments below the old prefix.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is absent,
    /// [`StoreError::ParentNotFound`] if the destination is absent, or
    /// [`StoreError::CyclicMove`] when the destination is `id` itself or lies
    /// inside its subtree.
    pub fn move_subtree(&self, id: &TaskId, new_parent: &TaskId) -> Result<Task> {
        let (before, after) = self.apply_move(id, new_parent)?;
        let prior_parent = before
            .path
            .parent_id()
            .cloned()
            .unwrap_or_else(TaskId::root);
        self.record_undo(UndoEntry::Move {
            task: before,
            prior_parent,
        });
        tracing::debug!(task = %id, destination = %new_parent, "moved subtree");
        Ok(after)
    }

    /// Copy `id`'s subtree under `new_parent`, returning the copy's root.
    ///
    /// Fresh identifiers are allocated throughout, so the new id set is
    /// disjoint from the source subtree. Text, state, and due date are
    /// carried over; the change-log history is not.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is absent, or
    /// [`StoreError::ParentNotFound`] if the destination is absent.
    pub fn copy_subtree(&self, id: &TaskId, new_parent: &TaskId) -> Result<Task> {
        self.ensure_root()?;
        let source = self.require(id)?;
        let parent_task = self
            .store
            .get(new_parent)?
            .ok_or_else(|| StoreError::ParentNotFound(new_parent.clone()))?;

        let snapshot = self.store.list_all()?;
        let copy = self.copy_node(&source, &parent_task.path, &snapshot)?;

        self.append_child_cache(new_parent, &copy.id)?;
        self.record_undo(UndoEntry::Create { task: copy.clone() });
        tracing::debug!(source = %id, copy = %copy.id, destination = %new_parent, "copied subtree");
        Ok(copy)
    }

    /// Delete every immediate child of `id` (and their subtrees), keeping
    /// `id` itself. Returns the number of children cleared.
    ///
    /// Records one undo entry per child; each `undo_last` restores one
    /// child subtree.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is absent.
    pub fn clear_children(&self, id: &TaskId) -> Result<usize> {
        self.require(id)?;
        let snapshot = self.store.list_all()?;
        let children: Vec<TaskId> = path::immediate_children(id, &snapshot)
            .into_iter()
            .map(|task| task.id.clone())
            .collect();

        for child in &children {
            self.delete(child)?;
        }
        tracing::debug!(task = %id, cleared = children.len(), "cleared children");
        Ok(children.len())
    }

    // -----------------------------------------------------------------------
    // State writes
    // -----------------------------------------------------------------------

    /// Rewrite `internalState` without touching the change log.
    ///
    /// The audit log is populated by the state-transition caller
    /// ([`Self::advance_state`]), not here — a quirk preserved from the
    /// system this store models.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id is absent.
    pub fn change_state(&self, id: &TaskId, new_state: TaskState) -> Result<Task> {
        let stored = self.require(id)?;
        let mut next = stored.clone();
        next.internal_state = new_state;
        next.rev = self.store.put(&next)?;

        self.record_undo(UndoEntry::StateChange { task: stored });
        tracing::debug!(task = %id, state = %new_state, "changed state");
        Ok(next)
    }

    /// Step the canonical lifecycle cycle and append the transition to the
    /// change log.
    ///
    /// `NOT_STARTED -> IN_PROGRESS -> DONE -> NOT_STARTED`; a blocked task
    /// resumes at `IN_PROGRESS`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id is absent.
    pub fn advance_state(&self, id: &TaskId) -> Result<Task> {
        let stored = self.require(id)?;
        let target = stored.internal_state.next_in_cycle();
        let mut next = stored.clone();
        next.log_transition(Utc::now(), target);
        next.rev = self.store.put(&next)?;

        self.record_undo(UndoEntry::StateChange { task: stored });
        tracing::debug!(task = %id, state = %target, "advanced state");
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Undo
    // -----------------------------------------------------------------------

    /// Number of operations currently available to undo.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.lock().expect("undo log poisoned").len()
    }

    /// Reverse the most recent recorded operation.
    ///
    /// The entry is consumed whether or not the inverse succeeds; there is
    /// no redo. Inverse operations do not themselves record undo entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyUndoLog`] when nothing is recorded, or
    /// [`StoreError::ParentNotFound`] when re-creating / moving back under a
    /// parent that has since been deleted (stale undo).
    pub fn undo_last(&self) -> Result<UndoKind> {
        let entry = self
            .undo
            .lock()
            .expect("undo log poisoned")
            .pop()
            .ok_or(StoreError::EmptyUndoLog)?;
        let kind = entry.kind();

        match entry {
            UndoEntry::Create { task } => {
                self.apply_delete(&task.id)?;
            }
            UndoEntry::Delete {
                task,
                descendants,
                prior_parent,
            } => {
                if self.store.get(&prior_parent)?.is_none() {
                    return Err(StoreError::ParentNotFound(prior_parent));
                }
                let mut restored = task.clone();
                restored.rev = 0;
                self.store.put(&restored)?;
                // Snapshots were taken parents-first, so each restore finds
                // its ancestor chain already present.
                for descendant in descendants {
                    let mut restored = descendant;
                    restored.rev = 0;
                    self.store.put(&restored)?;
                }
                self.append_child_cache(&prior_parent, &task.id)?;
            }
            UndoEntry::Move { task, prior_parent } => {
                self.apply_move(&task.id, &prior_parent)?;
            }
            UndoEntry::StateChange { task } => {
                let current = self.require(&task.id)?;
                let mut restored = current;
                restored.internal_state = task.internal_state;
                restored.change_log = task.change_log;
                self.store.put(&restored)?;
            }
            UndoEntry::AttributeChange { task } => {
                let current = self.require(&task.id)?;
                let mut restored = current;
                restored.text = task.text;
                restored.due_date = task.due_date;
                self.store.put(&restored)?;
            }
        }

        tracing::debug!(kind = %kind, "undid last operation");
        Ok(kind)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require(&self, id: &TaskId) -> Result<Task> {
        // Any access to the root counts as "first access" and materializes it.
        if id.is_root() {
            return self.ensure_root();
        }
        self.store
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Lazily materialize the root. Idempotent; a lost creation race (two
    /// interleaved first accesses) resolves by re-reading.
    fn ensure_root(&self) -> Result<Task> {
        let root_id = TaskId::root();
        if let Some(root) = self.store.get(&root_id)? {
            return Ok(root);
        }

        let mut root = Task::root(self.config.root_title.clone());
        match self.store.put(&root) {
            Ok(rev) => {
                root.rev = rev;
                tracing::info!("materialized root task");
                Ok(root)
            }
            // A lost race means another access just materialized it.
            Err(StoreError::Conflict(_)) => self
                .store
                .get(&root_id)?
                .ok_or(StoreError::NotFound(root_id)),
            Err(err) => Err(err),
        }
    }

    /// Push an entry onto the undo log.
    ///
    /// Every operation here records its own entry; this is exposed for
    /// collaborators that perform reversible mutations outside this layer
    /// and want them in the same undo stream.
    pub fn record_undo(&self, entry: UndoEntry) {
        self.undo.lock().expect("undo log poisoned").record(entry);
    }

    /// Remove `id` and its subtree, returning the pre-images needed to undo:
    /// the target, its descendants parents-first, and the prior parent id.
    fn apply_delete(&self, id: &TaskId) -> Result<(Task, Vec<Task>, TaskId)> {
        if id.is_root() {
            return Err(StoreError::RootDeletionForbidden);
        }
        let target = self.require(id)?;

        let snapshot = self.store.list_all()?;
        let mut descendants: Vec<Task> = path::subtree_of(id, &snapshot)
            .into_iter()
            .cloned()
            .collect();

        // Leaves first: remove the deepest paths before their ancestors so a
        // concurrent reader never resolves a child whose ancestor is gone.
        descendants.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        for descendant in &descendants {
            self.store.remove(&descendant.id)?;
        }
        self.store.remove(id)?;

        let prior_parent = target
            .path
            .parent_id()
            .cloned()
            .unwrap_or_else(TaskId::root);
        self.remove_child_cache(&prior_parent, id)?;

        // Flip to parents-first: the order a restore needs.
        descendants.reverse();
        Ok((target, descendants, prior_parent))
    }

    /// Rewrite `id`'s path (and all descendant paths) to sit under
    /// `new_parent`. Returns the pre-move and post-move images of the task.
    fn apply_move(&self, id: &TaskId, new_parent: &TaskId) -> Result<(Task, Task)> {
        self.ensure_root()?;
        let task = self.require(id)?;
        let parent_task = self
            .store
            .get(new_parent)?
            .ok_or_else(|| StoreError::ParentNotFound(new_parent.clone()))?;

        // The destination lies inside the moved subtree exactly when its own
        // path passes through `id` (this also catches destination == task).
        if parent_task.path.contains(id) {
            return Err(StoreError::CyclicMove {
                task: id.clone(),
                destination: new_parent.clone(),
            });
        }

        let old_path = task.path.clone();
        let new_path = parent_task.path.child(id.clone());
        let prior_parent = old_path.parent_id().cloned().unwrap_or_else(TaskId::root);

        let snapshot = self.store.list_all()?;
        let descendants: Vec<Task> = path::subtree_of(id, &snapshot)
            .into_iter()
            .cloned()
            .collect();

        let mut moved = task.clone();
        moved.path = new_path.clone();
        moved.rev = self.store.put(&moved)?;

        // Each descendant update is an independent put; a crash here leaves
        // a partially moved subtree (documented in the module docs).
        for descendant in descendants {
            let mut rewritten = descendant;
            rewritten.path = rewritten.path.rebased(old_path.len(), &new_path);
            self.store.put(&rewritten)?;
        }

        if prior_parent != *new_parent {
            self.remove_child_cache(&prior_parent, id)?;
            self.append_child_cache(new_parent, id)?;
        }

        Ok((task, moved))
    }

    fn copy_node(&self, source: &Task, parent_path: &TaskPath, snapshot: &[Task]) -> Result<Task> {
        let mut copy = Task::new(TaskId::generate(), source.text.clone(), parent_path);
        copy.internal_state = source.internal_state;
        copy.due_date = source.due_date;
        copy.rev = self.store.put(&copy)?;

        let mut child_ids = Vec::new();
        for child in path::immediate_children(&source.id, snapshot) {
            let child_copy = self.copy_node(child, &copy.path, snapshot)?;
            child_ids.push(child_copy.id);
        }
        if !child_ids.is_empty() {
            copy.sub_task_ids = child_ids;
            copy.rev = self.store.put(&copy)?;
        }
        Ok(copy)
    }

    /// Best-effort maintenance of the parent's `sub_task_ids` cache. The
    /// cache is display-only; the path index never reads it.
    fn append_child_cache(&self, parent: &TaskId, child: &TaskId) -> Result<()> {
        let Some(mut parent_task) = self.store.get(parent)? else {
            return Ok(());
        };
        if parent_task.sub_task_ids.contains(child) {
            return Ok(());
        }
        parent_task.sub_task_ids.push(child.clone());
        self.store.put(&parent_task)?;
        Ok(())
    }

    fn remove_child_cache(&self, parent: &TaskId, child: &TaskId) -> Result<()> {
        let Some(mut parent_task) = self.store.get(parent)? else {
            return Ok(());
        };
        let before = parent_task.sub_task_ids.len();
        parent_task.sub_task_ids.retain(|id| id != child);
        if parent_task.sub_task_ids.len() != before {
            self.store.put(&parent_task)?;
        }
        Ok(())
    }
}
