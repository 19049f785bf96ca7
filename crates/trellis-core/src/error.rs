//! Error taxonomy for store and hierarchy operations.
//!
//! Every failure a caller can observe is a [`StoreError`]. Each variant maps
//! to a stable machine-readable [`ErrorCode`] so UI collaborators and agents
//! can branch on the code instead of parsing messages.

use crate::model::task_id::TaskId;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TaskNotFound,
    ParentNotFound,
    RootDeletionForbidden,
    CyclicMoveRejected,
    EmptyUndoLog,
    RevisionConflict,
    BackingStore,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TaskNotFound => "E2001",
            Self::ParentNotFound => "E2002",
            Self::RootDeletionForbidden => "E2003",
            Self::CyclicMoveRejected => "E2004",
            Self::EmptyUndoLog => "E2005",
            Self::RevisionConflict => "E3001",
            Self::BackingStore => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TaskNotFound => "Task not found",
            Self::ParentNotFound => "Parent task not found",
            Self::RootDeletionForbidden => "Root task cannot be deleted",
            Self::CyclicMoveRejected => "Move would create a cycle",
            Self::EmptyUndoLog => "Nothing to undo",
            Self::RevisionConflict => "Stale revision rejected by the record store",
            Self::BackingStore => "Backing store failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::TaskNotFound => None,
            Self::ParentNotFound => {
                Some("The referenced parent was deleted or never existed; pick another parent.")
            }
            Self::RootDeletionForbidden => Some("Delete the root's children instead."),
            Self::CyclicMoveRejected => {
                Some("Pick a destination outside the subtree being moved.")
            }
            Self::EmptyUndoLog => None,
            Self::RevisionConflict => Some("Re-read the task and retry with the fresh revision."),
            Self::BackingStore => Some("Check the backing store; the operation was not retried."),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Unified error for record-store and hierarchy operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier does not resolve to a stored task.
    #[error("task not found: '{0}'")]
    NotFound(TaskId),

    /// The referenced parent does not resolve to a stored task.
    #[error("parent task not found: '{0}'")]
    ParentNotFound(TaskId),

    /// Deleting the distinguished root is never allowed.
    #[error("the root task cannot be deleted")]
    RootDeletionForbidden,

    /// The move destination lies inside the moved subtree (or is the task
    /// itself), which would make a task its own ancestor.
    #[error("moving '{task}' under '{destination}' would create a cycle")]
    CyclicMove { task: TaskId, destination: TaskId },

    /// `undo_last` was called with no recorded operations.
    #[error("undo log is empty")]
    EmptyUndoLog,

    /// A `put` carried a revision that no longer matches the stored record.
    #[error("revision conflict writing '{0}'")]
    Conflict(TaskId),

    /// Opaque failure from the backing store, wrapped with operation context.
    #[error("backing store error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// The stable [`ErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::TaskNotFound,
            Self::ParentNotFound(_) => ErrorCode::ParentNotFound,
            Self::RootDeletionForbidden => ErrorCode::RootDeletionForbidden,
            Self::CyclicMove { .. } => ErrorCode::CyclicMoveRejected,
            Self::EmptyUndoLog => ErrorCode::EmptyUndoLog,
            Self::Conflict(_) => ErrorCode::RevisionConflict,
            Self::Backend(_) => ErrorCode::BackingStore,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
