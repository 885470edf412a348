use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

/// Outcome of a failed lock operation; the store maps these to
/// [`ContentError`](crate::ContentError) with the topic name attached.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TopicLockError {
    /// A panicked holder poisoned the lock; the acquisition was abandoned.
    Interrupted,
    /// Release attempted by a thread that is not the owner.
    NotHeld,
}

#[derive(Default)]
struct LockState {
    owner: Option<ThreadId>,
    hold_count: u32,
}

/// Reentrant per-topic mutual-exclusion lock.
///
/// The owning thread may re-acquire freely; each acquire must be paired
/// with a release. Created lazily per topic and never removed; bounded by
/// topic cardinality.
#[derive(Default)]
pub(crate) struct TopicLock {
    state: Mutex<LockState>,
    available: Condvar,
}

impl TopicLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> Result<(), TopicLockError> {
        let me = thread::current().id();
        let mut state = self.state.lock().map_err(|_| TopicLockError::Interrupted)?;

        if state.owner == Some(me) {
            state.hold_count += 1;
            return Ok(());
        }

        while state.owner.is_some() {
            state = self
                .available
                .wait(state)
                .map_err(|_| TopicLockError::Interrupted)?;
        }

        state.owner = Some(me);
        state.hold_count = 1;
        Ok(())
    }

    pub fn release(&self) -> Result<(), TopicLockError> {
        let me = thread::current().id();
        let mut state = self.state.lock().map_err(|_| TopicLockError::Interrupted)?;

        if state.owner != Some(me) {
            return Err(TopicLockError::NotHeld);
        }

        state.hold_count -= 1;
        if state.hold_count == 0 {
            state.owner = None;
            drop(state);
            self.available.notify_one();
        }
        Ok(())
    }
}
