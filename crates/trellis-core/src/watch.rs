//! Typed change watching.
//!
//! [`Watcher`] sits on the record store's raw [`crate::store::ChangeFeed`]
//! and turns "this
//! record changed" into "here is the resolved task": on each raw change for
//! the watched id it re-fetches the record and hands the typed snapshot to
//! the caller's callback.
//!
//! Delivery semantics are deliberately loose — at-least-once, unordered
//! across keys, and each delivered task is only a point-in-time snapshot
//! (the record may have changed again by the time the callback runs).
//! Consumers keying decisions on freshness must compare task contents, not
//! delivery order.
//!
//! A failed resolve (backing-store error, or the record vanishing between
//! change and fetch) is logged and skipped; the subscription stays alive for
//! future deliveries.

use crate::model::task::Task;
use crate::model::task_id::TaskId;
use crate::store::RecordStore;
use crate::store::feed::{CancelToken, ChangeKind};
use std::sync::Arc;

/// Resolves raw record changes into typed task deliveries.
pub struct Watcher<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore + 'static> Watcher<S> {
    /// Watch the given store instance.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Invoke `on_change` with the resolved task each time the record under
    /// `id` is written.
    ///
    /// Removal changes are skipped (there is no task left to resolve);
    /// consumers tracking deletions subscribe to the raw feed instead.
    pub fn watch(
        &self,
        id: &TaskId,
        on_change: impl Fn(&Task) + Send + Sync + 'static,
    ) -> WatchHandle {
        let store = Arc::clone(&self.store);
        let watched = id.clone();

        let token = self.store.feed().subscribe(move |change| {
            if change.id != watched {
                return;
            }
            if change.kind == ChangeKind::Remove {
                tracing::trace!(task = %watched, "record removed; nothing to resolve");
                return;
            }
            match store.get(&watched) {
                Ok(Some(task)) => on_change(&task),
                Ok(None) => {
                    tracing::trace!(task = %watched, "record vanished before resolve; skipped");
                }
                Err(err) => {
                    tracing::warn!(
                        task = %watched,
                        error = %err,
                        "watch delivery failed; subscription stays live"
                    );
                }
            }
        });

        WatchHandle { token }
    }
}

/// Cancellation handle returned by [`Watcher::watch`].
///
/// `cancel` is idempotent and re-entrant safe: calling it from inside the
/// watch callback is allowed, and no delivery begins after it returns on the
/// delivering thread. An in-flight resolve on another thread may still
/// complete; callers needing strict exclusion keep a generation token of
/// their own.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    token: CancelToken,
}

impl WatchHandle {
    /// Stop further deliveries. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
