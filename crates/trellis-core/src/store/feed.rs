//! Raw per-record change feed.
//!
//! Each store owns one [`ChangeFeed`]. After a record write is applied, the
//! store publishes a [`RecordChange`]; every live subscriber is invoked on
//! the publishing thread. Delivery is therefore at-least-once relative to
//! the caller's view and carries no ordering guarantee across keys.
//!
//! Cancellation contract: the registry lock is never held while a subscriber
//! runs, so a callback may cancel its own (or any other) subscription
//! without deadlocking, and no new delivery begins after `cancel` returns on
//! the publishing thread. A delivery already in flight on another thread may
//! still complete; callers needing strict exclusion keep their own token.

use crate::model::task_id::TaskId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The record was created or overwritten.
    Put,
    /// The record was removed.
    Remove,
}

/// A raw change notification: which record, and what happened to it.
///
/// Deliberately carries no payload; interested consumers re-fetch and
/// resolve the record, accepting that it may have changed again since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    pub id: TaskId,
    pub kind: ChangeKind,
}

type RawCallback = dyn Fn(&RecordChange) + Send + Sync;

struct RawSubscription {
    active: Arc<AtomicBool>,
    deliver: Arc<RawCallback>,
}

/// Cancellation handle for one raw subscription.
///
/// `cancel` is idempotent and safe to call from inside the subscriber.
/// Dropping the token without cancelling leaves the subscription live.
#[derive(Debug, Clone)]
pub struct CancelToken {
    active: Arc<AtomicBool>,
}

impl CancelToken {
    /// Stop further deliveries. Idempotent.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        !self.active.load(Ordering::SeqCst)
    }
}

/// Registry of raw change subscribers for one store instance.
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: Mutex<Vec<RawSubscription>>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `deliver` to run on every published change.
    pub fn subscribe(
        &self,
        deliver: impl Fn(&RecordChange) + Send + Sync + 'static,
    ) -> CancelToken {
        let active = Arc::new(AtomicBool::new(true));
        let subscription = RawSubscription {
            active: Arc::clone(&active),
            deliver: Arc::new(deliver),
        };
        self.subscribers
            .lock()
            .expect("change feed registry poisoned")
            .push(subscription);
        CancelToken { active }
    }

    /// Deliver `change` to every live subscriber.
    ///
    /// Cancelled subscriptions are pruned here; the registry lock is
    /// released before any subscriber runs.
    pub fn publish(&self, change: &RecordChange) {
        let live: Vec<(Arc<AtomicBool>, Arc<RawCallback>)> = {
            let mut subscribers = self
                .subscribers
                .lock()
                .expect("change feed registry poisoned");
            subscribers.retain(|s| s.active.load(Ordering::SeqCst));
            subscribers
                .iter()
                .map(|s| (Arc::clone(&s.active), Arc::clone(&s.deliver)))
                .collect()
        };

        for (active, deliver) in live {
            // Re-check at call time: an earlier subscriber in this very
            // publish may have cancelled a later one.
            if active.load(Ordering::SeqCst) {
                deliver(change);
            }
        }
    }

    /// Number of live subscriptions (cancelled-but-unpruned excluded).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("change feed registry poisoned")
            .iter()
            .filter(|s| s.active.load(Ordering::SeqCst))
            .count()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
