use gator_infra::TaskCanceller;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Cancellation group of a tracked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Package list refreshes and update checks.
    Default,
    /// Dependency graph lookups.
    Dependencies,
}

#[derive(Debug, Clone)]
pub struct CancellableAction {
    pub kind: TaskKind,
    pub canceller: TaskCanceller,
}

/// Stack of in-flight cancellable tasks owned by one client.
#[derive(Debug, Default)]
pub struct CancellableRegistry {
    entries: Mutex<Vec<(usize, CancellableAction)>>,
    next_key: AtomicUsize,
}

impl CancellableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<(usize, CancellableAction)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a key for [`CancellableRegistry::remove`]. Keys stay valid
    /// while other entries come and go.
    pub fn push(&self, kind: TaskKind, canceller: TaskCanceller) -> usize {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.entries()
            .push((key, CancellableAction { kind, canceller }));
        key
    }

    pub fn remove(&self, key: usize) -> bool {
        let mut entries = self.entries();
        match entries.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drains the whole stack, then cancels the entries of `kind` and returns
    /// their cancellers.
    ///
    /// Entries of other kinds are dropped without being cancelled: their
    /// tasks keep running but are no longer tracked.
    pub fn cancel_all(&self, kind: TaskKind) -> Vec<TaskCanceller> {
        let drained: Vec<_> = self.entries().drain(..).collect();
        cancel_matching(drained, kind)
    }

    /// Same as [`CancellableRegistry::cancel_all`] followed by
    /// [`CancellableRegistry::push`], under one lock. No other registration
    /// can land between the two.
    pub fn supersede(&self, kind: TaskKind, canceller: TaskCanceller) -> usize {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries();
        let drained: Vec<_> = entries.drain(..).collect();
        cancel_matching(drained, kind);
        entries.push((key, CancellableAction { kind, canceller }));
        key
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cancel_matching(
    drained: Vec<(usize, CancellableAction)>,
    kind: TaskKind,
) -> Vec<TaskCanceller> {
    drained
        .into_iter()
        .filter(|(_, action)| action.kind == kind)
        .map(|(_, action)| {
            action.canceller.cancel();
            action.canceller
        })
        .collect()
}
