//! Offline integrity checking.
//!
//! [`check_tree`] validates the structural invariants over a snapshot of
//! tasks and reports every violation found. It never repairs anything;
//! callers decide whether a violation is fatal.
//!
//! A stale or missing `sub_task_ids` cache is deliberately NOT a violation —
//! the cache is display-only and the path index tolerates it by design.

use crate::model::task::Task;
use crate::model::task_id::TaskId;
use std::collections::HashSet;
use std::fmt;

/// One structural invariant violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A task's path has no segments.
    EmptyPath { id: TaskId },
    /// The last path segment is not the task's own id.
    PathTailMismatch { id: TaskId, tail: Option<TaskId> },
    /// The task's own id appears more than once on its path (cycle).
    SelfReferentialPath { id: TaskId },
    /// The second-to-last path segment names a task that is not stored.
    MissingParent { id: TaskId, parent: TaskId },
    /// A single-segment path on a task other than the distinguished root.
    StrayTopLevel { id: TaskId },
    /// The root task's path is not exactly `[root]`.
    MalformedRootPath { path_len: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath { id } => write!(f, "task '{id}' has an empty path"),
            Self::PathTailMismatch { id, tail } => match tail {
                Some(tail) => write!(f, "task '{id}' path ends in '{tail}', not its own id"),
                None => write!(f, "task '{id}' path ends in nothing"),
            },
            Self::SelfReferentialPath { id } => {
                write!(f, "task '{id}' appears more than once on its own path")
            }
            Self::MissingParent { id, parent } => {
                write!(f, "task '{id}' references missing parent '{parent}'")
            }
            Self::StrayTopLevel { id } => {
                write!(f, "task '{id}' sits at the top level but is not the root")
            }
            Self::MalformedRootPath { path_len } => {
                write!(f, "root task path has {path_len} segments, expected 1")
            }
        }
    }
}

/// Validate every stored task against the structural invariants.
///
/// Returns all violations found, in snapshot order; an empty result means
/// the tree is well-formed.
#[must_use]
pub fn check_tree(snapshot: &[Task]) -> Vec<Violation> {
    let stored_ids: HashSet<&TaskId> = snapshot.iter().map(|task| &task.id).collect();
    let mut violations = Vec::new();

    for task in snapshot {
        if task.path.is_empty() {
            violations.push(Violation::EmptyPath {
                id: task.id.clone(),
            });
            continue;
        }

        if task.path.leaf() != Some(&task.id) {
            violations.push(Violation::PathTailMismatch {
                id: task.id.clone(),
                tail: task.path.leaf().cloned(),
            });
        }

        let own_occurrences = task
            .path
            .segments()
            .iter()
            .filter(|segment| **segment == task.id)
            .count();
        if own_occurrences > 1 {
            violations.push(Violation::SelfReferentialPath {
                id: task.id.clone(),
            });
        }

        if task.id.is_root() {
            if task.path.len() != 1 {
                violations.push(Violation::MalformedRootPath {
                    path_len: task.path.len(),
                });
            }
            continue;
        }

        match task.path.parent_id() {
            None => violations.push(Violation::StrayTopLevel {
                id: task.id.clone(),
            }),
            Some(parent) => {
                if !stored_ids.contains(parent) {
                    violations.push(Violation::MissingParent {
                        id: task.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::{Violation, check_tree};
    use crate::model::task::Task;
    use crate::model::task_id::TaskId;
    use crate::path::TaskPath;

    fn id(s: &str) -> TaskId {
        TaskId::new_unchecked(s)
    }

    fn task_at(segments: &[&str]) -> Task {
        let path = TaskPath::from_segments(segments.iter().map(|s| id(s)).collect());
        let own = path.leaf().expect("non-empty").clone();
        Task {
            id: own,
            path,
            ..Task::default()
        }
    }

    #[test]
    fn well_formed_tree_has_no_violations() {
        let snapshot = vec![
            task_at(&["root"]),
            task_at(&["root", "a"]),
            task_at(&["root", "a", "b"]),
        ];
        assert!(check_tree(&snapshot).is_empty());
    }

    #[test]
    fn empty_path_is_reported() {
        let task = Task {
            id: id("a"),
            path: TaskPath::from_segments(vec![]),
            ..Task::default()
        };
        let violations = check_tree(&[task]);
        assert_eq!(violations, vec![Violation::EmptyPath { id: id("a") }]);
    }

    #[test]
    fn tail_mismatch_is_reported() {
        let task = Task {
            id: id("a"),
            path: TaskPath::from_segments(vec![id("root"), id("b")]),
            ..Task::default()
        };
        let snapshot = vec![task_at(&["root"]), task, task_at(&["root", "b"])];
        let violations = check_tree(&snapshot);
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::PathTailMismatch { id: task, .. } if task == &id("a")
        )));
    }

    #[test]
    fn missing_parent_is_reported() {
        let snapshot = vec![task_at(&["root"]), task_at(&["root", "ghost", "a"])];
        let violations = check_tree(&snapshot);
        assert_eq!(
            violations,
            vec![Violation::MissingParent {
                id: id("a"),
                parent: id("ghost"),
            }]
        );
    }

    #[test]
    fn cycle_in_path_is_reported() {
        let task = Task {
            id: id("a"),
            path: TaskPath::from_segments(vec![id("root"), id("a"), id("b"), id("a")]),
            ..Task::default()
        };
        let snapshot = vec![task_at(&["root"]), task];
        let violations = check_tree(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::SelfReferentialPath { .. })));
    }

    #[test]
    fn stray_top_level_is_reported() {
        let snapshot = vec![task_at(&["root"]), task_at(&["imposter"])];
        let violations = check_tree(&snapshot);
        assert_eq!(
            violations,
            vec![Violation::StrayTopLevel { id: id("imposter") }]
        );
    }

    #[test]
    fn malformed_root_path_is_reported() {
        let root = Task {
            id: TaskId::root(),
            path: TaskPath::from_segments(vec![id("x"), TaskId::root()]),
            ..Task::default()
        };
        let snapshot = vec![root, task_at(&["x"])];
        let violations = check_tree(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::MalformedRootPath { path_len: 2 })));
    }

    #[test]
    fn stale_child_cache_is_tolerated() {
        let mut root = task_at(&["root"]);
        root.sub_task_ids = vec![id("ghost"), id("a")];
        let snapshot = vec![root, task_at(&["root", "a"])];
        assert!(check_tree(&snapshot).is_empty());
    }

    #[test]
    fn violations_render_readably() {
        let violation = Violation::MissingParent {
            id: id("a"),
            parent: id("ghost"),
        };
        let rendered = violation.to_string();
        assert!(rendered.contains('a') && rendered.contains("ghost"));
    }
}
