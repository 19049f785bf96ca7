//! Progress rollups for statistics consumers.
//!
//! Pure tallies over a snapshot of tasks, answering "how far along is this
//! branch of the tree". Direct progress counts immediate children; subtree
//! progress counts every descendant. Both derive membership from paths, so
//! they share the O(n) scan cost and staleness tolerance of
//! [`crate::path`].

use crate::model::task::{Task, TaskState};
use crate::model::task_id::TaskId;
use crate::path;
use std::fmt;

/// Progress of a branch: how many tasks are done vs total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Tasks in the `DONE` state.
    pub done: u32,
    /// Tasks in the `IN_PROGRESS` state.
    pub in_progress: u32,
    /// Tasks in the `BLOCKED` state.
    pub blocked: u32,
    /// All tallied tasks, regardless of state.
    pub total: u32,
}

impl Progress {
    /// A zeroed tally.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Percentage of work completed, in the range `0.0..=100.0`.
    ///
    /// Returns `100.0` if total is 0 (vacuously complete).
    #[must_use]
    pub fn percent_complete(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        (self.done as f32 / self.total as f32) * 100.0
    }

    /// Returns `true` if every tallied task is done (or none exist).
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total == 0 || self.done == self.total
    }

    /// Number of tallied tasks not yet done.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.done)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            self.done,
            self.total,
            self.percent_complete()
        )
    }
}

/// Tally the immediate children of `id` in `snapshot`.
#[must_use]
pub fn direct_progress(id: &TaskId, snapshot: &[Task]) -> Progress {
    tally(&path::immediate_children(id, snapshot))
}

/// Tally every descendant of `id` in `snapshot`.
#[must_use]
pub fn subtree_progress(id: &TaskId, snapshot: &[Task]) -> Progress {
    tally(&path::subtree_of(id, snapshot))
}

fn tally(tasks: &[&Task]) -> Progress {
    let mut progress = Progress::zero();
    for task in tasks {
        progress.total += 1;
        match task.internal_state {
            TaskState::Done => progress.done += 1,
            TaskState::InProgress => progress.in_progress += 1,
            TaskState::Blocked => progress.blocked += 1,
            TaskState::NotStarted => {}
        }
    }
    progress
}
