//! The task record and its lifecycle state.
//!
//! A [`Task`] is the unit stored in the record store, serialized as a JSON
//! document with camelCase keys. Structure lives entirely in [`Task::path`];
//! `sub_task_ids` is a derived cache that readers must never treat as
//! authoritative (see [`crate::path`]).

use crate::model::task_id::TaskId;
use crate::path::TaskPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle state of a task.
///
/// The canonical forward cycle is
/// `NOT_STARTED -> IN_PROGRESS -> DONE -> NOT_STARTED`; there is no terminal
/// state. `BLOCKED` sits outside the cycle and is only entered by an explicit
/// state set.
///
/// Historical spellings `CREATED` and `STARTED` deserialize to `NOT_STARTED`
/// and `IN_PROGRESS`; serialization always emits the canonical spelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    #[default]
    #[serde(alias = "CREATED")]
    NotStarted,
    #[serde(alias = "STARTED")]
    InProgress,
    Blocked,
    Done,
}

impl TaskState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Blocked => "BLOCKED",
            Self::Done => "DONE",
        }
    }

    /// The next state in the canonical cycle.
    ///
    /// A blocked task is outside the cycle; advancing it resumes at
    /// `IN_PROGRESS`.
    #[must_use]
    pub const fn next_in_cycle(self) -> Self {
        match self {
            Self::NotStarted | Self::Blocked => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::NotStarted,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError {
    pub got: String,
}

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task state: '{}'", self.got)
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for TaskState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOT_STARTED" | "CREATED" => Ok(Self::NotStarted),
            "IN_PROGRESS" | "STARTED" => Ok(Self::InProgress),
            "BLOCKED" => Ok(Self::Blocked),
            "DONE" => Ok(Self::Done),
            _ => Err(ParseStateError { got: s.to_string() }),
        }
    }
}

/// One entry of a task's append-only lifecycle audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub time: DateTime<Utc>,
    pub new_state: TaskState,
}

/// All persisted fields for a task.
///
/// `rev` is record-store bookkeeping for optimistic concurrency: 0 means the
/// task has never been persisted; each successful `put` bumps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub internal_state: TaskState,
    pub path: TaskPath,
    pub sub_task_ids: Vec<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub change_log: Vec<StateChange>,
    pub rev: u64,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: TaskId::new_unchecked(""),
            text: String::new(),
            internal_state: TaskState::NotStarted,
            path: TaskPath::default(),
            sub_task_ids: Vec::new(),
            due_date: None,
            change_log: Vec::new(),
            rev: 0,
        }
    }
}

impl Task {
    /// Build a task under `parent_path` with the given identifier.
    ///
    /// The task's path becomes `parent_path + [id]`.
    #[must_use]
    pub fn new(id: TaskId, text: impl Into<String>, parent_path: &TaskPath) -> Self {
        let path = parent_path.child(id.clone());
        Self {
            id,
            text: text.into(),
            path,
            ..Self::default()
        }
    }

    /// The synthesized root task: well-known id, `path = [root]`.
    #[must_use]
    pub fn root(title: impl Into<String>) -> Self {
        let id = TaskId::root();
        Self {
            id: id.clone(),
            text: title.into(),
            path: TaskPath::root(),
            ..Self::default()
        }
    }

    /// Append a lifecycle transition to the audit log and apply it.
    ///
    /// This is the only place that writes `change_log`; plain state rewrites
    /// go through the hierarchy's `change_state` and leave the log untouched.
    pub fn log_transition(&mut self, time: DateTime<Utc>, new_state: TaskState) {
        self.change_log.push(StateChange { time, new_state });
        self.internal_state = new_state;
    }
}

/// Caller-supplied fields for a task about to be created.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub text: String,
    pub state: TaskState,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    /// A draft with the given display text and default state.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the initial lifecycle state.
    #[must_use]
    pub const fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }

    /// Set the optional due date.
    #[must_use]
    pub const fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }
}
