//! Scoped mutation with deferred side effects.
//!
//! A [`ScopedMutation`] holds the state lock for the duration of one public
//! operation. Side effects that may re-enter the owner (event handlers, mostly)
//! are queued with [`ScopedMutation::defer`] and run only after the lock has
//! been released, on the same thread, in the order they were queued.

use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};

type Action<'a> = Box<dyn FnOnce() + 'a>;

/// Exclusive access to `S` plus a queue of actions to run after release.
pub(crate) struct ScopedMutation<'a, S> {
    // Fields drop in declaration order: the lock is released before
    // `deferred` runs its queue.
    state: MutexGuard<'a, S>,
    deferred: DeferredActions<'a>,
}

impl<'a, S> ScopedMutation<'a, S> {
    /// Blocks until the lock is available.
    pub(crate) fn acquire(mutex: &'a Mutex<S>) -> Self {
        Self {
            state: mutex.lock(),
            deferred: DeferredActions::default(),
        }
    }

    /// Queues `action` to run once this mutation ends.
    pub(crate) fn defer(&mut self, action: impl FnOnce() + 'a) {
        self.deferred.0.push(Box::new(action));
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.deferred.0.len()
    }
}

impl<S> Deref for ScopedMutation<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.state
    }
}

impl<S> DerefMut for ScopedMutation<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.state
    }
}

#[derive(Default)]
struct DeferredActions<'a>(Vec<Action<'a>>);

impl Drop for DeferredActions<'_> {
    fn drop(&mut self) {
        // Running handlers while unwinding would turn a second panic into an abort.
        if std::thread::panicking() {
            return;
        }
        for action in self.0.drain(..) {
            action();
        }
    }
}
