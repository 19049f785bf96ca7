//! Path-derived tree structure.
//!
//! A task's [`TaskPath`] is the ordered sequence of ancestor identifiers from
//! the root down to and including the task itself. It is the sole source of
//! structural truth: parent, children, and descendant relationships are all
//! recomputed from paths over a snapshot of tasks, and no adjacency structure
//! is ever persisted. The `sub_task_ids` cache on each task exists for
//! display convenience only and may be stale or absent.
//!
//! The snapshot queries are O(n) per call. That is acceptable at the
//! client-local scale this store targets; supporting large hierarchies would
//! require a persisted child index instead of path re-derivation.

use crate::model::task::Task;
use crate::model::task_id::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskPath
// ---------------------------------------------------------------------------

/// Ordered ancestor identifiers, root first, own identifier last.
///
/// Serializes as a plain JSON array of ids. A well-formed path is non-empty
/// and contains its own identifier exactly once (acyclicity); the integrity
/// checker ([`crate::check`]) enforces this over stored snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPath(Vec<TaskId>);

impl TaskPath {
    /// The root's path: `[root]`.
    #[must_use]
    pub fn root() -> Self {
        Self(vec![TaskId::root()])
    }

    /// Build a path from raw segments without validation.
    #[must_use]
    pub fn from_segments(segments: Vec<TaskId>) -> Self {
        Self(segments)
    }

    /// The raw segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[TaskId] {
        &self.0
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path has no segments (malformed; tolerated for serde).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The task's own identifier (last segment).
    #[must_use]
    pub fn leaf(&self) -> Option<&TaskId> {
        self.0.last()
    }

    /// The parent identifier (`path[len-2]`), or `None` for root-level paths.
    #[must_use]
    pub fn parent_id(&self) -> Option<&TaskId> {
        if self.0.len() < 2 {
            None
        } else {
            self.0.get(self.0.len() - 2)
        }
    }

    /// Extend this path with a child identifier.
    #[must_use]
    pub fn child(&self, id: TaskId) -> Self {
        let mut segments = self.0.clone();
        segments.push(id);
        Self(segments)
    }

    /// Whether `id` appears anywhere on the path.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.0.contains(id)
    }

    /// Whether this path begins with every segment of `prefix`, in order.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Replace the first `old_len` segments with `new_prefix`, preserving the
    /// relative suffix.
    ///
    /// This is the move rewrite: for a descendant whose path begins with the
    /// moved task's old path, `rebased(old_path.len(), &new_path)` yields
    /// `new_path + old_suffix`.
    #[must_use]
    pub fn rebased(&self, old_len: usize, new_prefix: &Self) -> Self {
        let mut segments = new_prefix.0.clone();
        segments.extend_from_slice(&self.0[old_len.min(self.0.len())..]);
        Self(segments)
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                f.write_str("/")?;
            }
            first = false;
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot queries
// ---------------------------------------------------------------------------

/// The parent identifier of `task`, or `None` if it sits at the root level.
///
/// O(1): reads `path[len-2]`.
#[must_use]
pub fn parent_of(task: &Task) -> Option<&TaskId> {
    task.path.parent_id()
}

/// Tasks in `snapshot` whose parent (second-to-last path segment) is `id`.
///
/// O(n) over the snapshot; order follows scan order.
#[must_use]
pub fn immediate_children<'a>(id: &TaskId, snapshot: &'a [Task]) -> Vec<&'a Task> {
    snapshot
        .iter()
        .filter(|task| task.path.parent_id() == Some(id))
        .collect()
}

/// Every transitive descendant of `id` in `snapshot`, excluding `id` itself.
///
/// O(n) over the snapshot. Order is unspecified; callers needing
/// depth/breadth ordering must sort by path length themselves.
#[must_use]
pub fn subtree_of<'a>(id: &TaskId, snapshot: &'a [Task]) -> Vec<&'a Task> {
    snapshot
        .iter()
        .filter(|task| task.id != *id && task.path.contains(id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
