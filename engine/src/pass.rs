//! Cancellation of in-flight passes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{AbortHandle, AbortRegistration};

/// Identifies one annotate or review pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u64);

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Slot {
    next_id: u64,
    active: Option<(PassId, AbortHandle)>,
}

/// The cancellation handle of the pass currently running for one editor.
///
/// Clones share state, so a clone handed to another task can cancel the pass
/// while the session is busy consuming it.
#[derive(Debug, Clone, Default)]
pub struct PassRegistry {
    slot: Arc<Mutex<Slot>>,
}

/// A running pass. The registration half goes to the transport task.
#[derive(Debug)]
pub struct Pass {
    id: PassId,
    handle: AbortHandle,
}

impl Pass {
    #[must_use]
    pub fn id(&self) -> PassId {
        self.id
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }
}

impl PassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a pass, cancelling whichever pass was running.
    pub fn begin(&self) -> (Pass, AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        let mut slot = self.lock();
        if let Some((previous, old)) = slot.active.take() {
            old.abort();
            tracing::info!(pass = %previous, "Cancelled previous pass");
        }
        let id = PassId(slot.next_id);
        slot.next_id += 1;
        slot.active = Some((id, handle.clone()));
        (Pass { id, handle }, registration)
    }

    /// Cancel the running pass. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        match self.lock().active.take() {
            Some((id, handle)) => {
                handle.abort();
                tracing::info!(pass = %id, "Cancelled pass");
                true
            }
            None => false,
        }
    }

    /// Release the slot if `pass` still owns it.
    pub fn finish(&self, pass: &Pass) {
        let mut slot = self.lock();
        if slot.active.as_ref().is_some_and(|(id, _)| *id == pass.id) {
            slot.active = None;
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<PassId> {
        self.lock().active.as_ref().map(|(id, _)| *id)
    }
}
