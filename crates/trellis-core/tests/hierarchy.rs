//! End-to-end scenarios across the public API.

use std::sync::{Arc, Mutex};

use trellis_core::{
    Hierarchy, MemoryStore, SqliteStore, StoreError, TaskDraft, TaskId, TaskState, Watcher, check,
    path, progress,
};

fn hierarchy() -> Hierarchy<MemoryStore> {
    Hierarchy::new(Arc::new(MemoryStore::new()))
}

#[test]
fn grocery_scenario_create_move_and_reparent() {
    let ops = hierarchy();

    // Root exists implicitly; "buy milk" lands under it.
    let milk = ops.create(TaskDraft::new("buy milk"), None).expect("milk");
    let root_children = ops.children(&TaskId::root()).expect("root children");
    assert!(root_children.iter().any(|t| t.id == milk.id));

    // "2% milk" under the milk task, then an "errands" sibling.
    let two_percent = ops
        .create(TaskDraft::new("2% milk"), Some(&milk.id))
        .expect("2% milk");
    let errands = ops
        .create(TaskDraft::new("errands"), None)
        .expect("errands");

    // Move "2% milk" under "errands".
    ops.move_subtree(&two_percent.id, &errands.id)
        .expect("move");

    let moved = ops.task(&two_percent.id).expect("moved task");
    assert_eq!(
        moved.path.segments(),
        &[
            TaskId::root(),
            errands.id.clone(),
            two_percent.id.clone()
        ]
    );

    // "buy milk"'s children no longer include it.
    assert!(ops.children(&milk.id).expect("milk children").is_empty());
    assert_eq!(ops.children(&errands.id).expect("errands children").len(), 1);
}

#[test]
fn delete_cascades_to_children() {
    let ops = hierarchy();
    let milk = ops.create(TaskDraft::new("buy milk"), None).expect("milk");
    let two_percent = ops
        .create(TaskDraft::new("2% milk"), Some(&milk.id))
        .expect("2% milk");

    ops.delete(&milk.id).expect("delete");

    assert!(matches!(
        ops.task(&two_percent.id),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(ops.task(&milk.id), Err(StoreError::NotFound(_))));
}

#[test]
fn state_cycle_has_no_terminal_trap() {
    let ops = hierarchy();
    let task = ops.create(TaskDraft::new("cycling"), None).expect("create");

    for state in [
        TaskState::InProgress,
        TaskState::Done,
        TaskState::NotStarted,
    ] {
        let updated = ops.change_state(&task.id, state).expect("change state");
        assert_eq!(updated.internal_state, state);
    }

    // Back at the initial state, and explicit blocking still works.
    let blocked = ops
        .change_state(&task.id, TaskState::Blocked)
        .expect("block");
    assert_eq!(blocked.internal_state, TaskState::Blocked);
}

#[test]
fn path_consistency_after_a_burst_of_operations() {
    let ops = hierarchy();

    let a = ops.create(TaskDraft::new("a"), None).expect("a");
    let b = ops.create(TaskDraft::new("b"), Some(&a.id)).expect("b");
    let c = ops.create(TaskDraft::new("c"), Some(&b.id)).expect("c");
    let d = ops.create(TaskDraft::new("d"), None).expect("d");

    ops.move_subtree(&b.id, &d.id).expect("move b under d");
    ops.copy_subtree(&d.id, &a.id).expect("copy d under a");
    ops.delete(&c.id).expect("delete c");

    let snapshot = ops.all().expect("snapshot");
    assert!(check::check_tree(&snapshot).is_empty());

    // Every non-root task's parent exists, and the task is a member of its
    // parent's subtree.
    for task in &snapshot {
        if let Some(parent) = path::parent_of(task) {
            let parent_task = snapshot
                .iter()
                .find(|t| t.id == *parent)
                .expect("parent stored");
            let members = path::subtree_of(&parent_task.id, &snapshot);
            assert!(members.iter().any(|member| member.id == task.id));
        }
    }
}

#[test]
fn undo_restores_a_deleted_task_verbatim() {
    let ops = hierarchy();
    let task = ops
        .create(TaskDraft::new("precious"), None)
        .expect("create");
    let original_path = task.path.clone();

    ops.delete(&task.id).expect("delete");
    ops.undo_last().expect("undo");

    let restored = ops.task(&task.id).expect("restored");
    assert_eq!(restored.text, "precious");
    assert_eq!(restored.path, original_path);
}

#[test]
fn watcher_sees_the_freshest_resolved_state() {
    let store = Arc::new(MemoryStore::new());
    let ops = Hierarchy::new(Arc::clone(&store));
    let watcher = Watcher::new(store);

    let task = ops.create(TaskDraft::new("v0"), None).expect("create");

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let handle = watcher.watch(&task.id, {
        let seen = Arc::clone(&seen);
        move |task| seen.lock().expect("seen").push(task.text.clone())
    });

    for version in ["v1", "v2"] {
        let mut edited = ops.task(&task.id).expect("fresh");
        edited.text = version.to_string();
        ops.update(&edited).expect("update");
    }
    handle.cancel();

    // One more write after cancel: never delivered.
    let mut edited = ops.task(&task.id).expect("fresh");
    edited.text = "v3".to_string();
    ops.update(&edited).expect("update after cancel");

    let seen = seen.lock().expect("seen");
    assert_eq!(seen.as_slice(), ["v1", "v2"]);
}

#[test]
fn progress_rolls_up_across_the_subtree() {
    let ops = hierarchy();
    let goal = ops.create(TaskDraft::new("goal"), None).expect("goal");
    let step1 = ops
        .create(TaskDraft::new("step 1"), Some(&goal.id))
        .expect("step 1");
    let step2 = ops
        .create(TaskDraft::new("step 2"), Some(&goal.id))
        .expect("step 2");
    ops.create(TaskDraft::new("note"), Some(&step2.id))
        .expect("nested");

    ops.change_state(&step1.id, TaskState::Done).expect("done");
    ops.change_state(&step2.id, TaskState::InProgress)
        .expect("doing");

    let snapshot = ops.all().expect("snapshot");
    let direct = progress::direct_progress(&goal.id, &snapshot);
    assert_eq!((direct.done, direct.total), (1, 2));

    let nested = progress::subtree_progress(&goal.id, &snapshot);
    assert_eq!((nested.done, nested.in_progress, nested.total), (1, 1, 3));
    assert!(!nested.is_complete());
}

#[test]
fn sqlite_backend_behaves_like_memory_and_persists() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("trellis.sqlite3");

    let milk_id;
    let two_percent_id;
    {
        let store = Arc::new(SqliteStore::open(&db_path).expect("open"));
        let ops = Hierarchy::new(store);

        let milk = ops.create(TaskDraft::new("buy milk"), None).expect("milk");
        let two_percent = ops
            .create(TaskDraft::new("2% milk"), Some(&milk.id))
            .expect("2% milk");
        ops.advance_state(&two_percent.id).expect("advance");

        milk_id = milk.id;
        two_percent_id = two_percent.id;
    }

    // Reopen: the whole tree (and the audit log) survived.
    let store = Arc::new(SqliteStore::open(&db_path).expect("reopen"));
    let ops = Hierarchy::new(store);

    let two_percent = ops.task(&two_percent_id).expect("2% milk");
    assert_eq!(two_percent.internal_state, TaskState::InProgress);
    assert_eq!(two_percent.change_log.len(), 1);
    assert_eq!(two_percent.path.parent_id(), Some(&milk_id));

    // And the reopened store keeps full operation support.
    ops.delete(&milk_id).expect("delete");
    assert!(matches!(
        ops.task(&two_percent_id),
        Err(StoreError::NotFound(_))
    ));

    let snapshot = ops.all().expect("snapshot");
    assert!(check::check_tree(&snapshot).is_empty());
    assert_eq!(
        path::immediate_children(&TaskId::root(), &snapshot).len(),
        0
    );
}
