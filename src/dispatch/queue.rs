//! # Dirty Control Queue
//!
//! Mutex-guarded, insertion-ordered set of controls that changed since the
//! last frame. This is the only routing state shared across threads: device
//! polling threads mark controls dirty, the frame thread swaps the queue out
//! once per [`Dispatcher::update`](super::Dispatcher::update).
//!
//! Every critical section is a presence check, a removal or a swap.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::control::ControlId;
use crate::routing::controller::ControllerId;

/// Cloneable handle to the dispatcher's dirty queue.
///
/// Invariant: never holds the same [`ControlId`] twice.
#[derive(Debug, Clone, Default)]
pub struct DirtyQueue {
    controls: Arc<Mutex<Vec<ControlId>>>,
}

impl DirtyQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a control unless it is already queued.
    ///
    /// Returns true if the control was inserted.
    pub fn mark(&self, id: ControlId) -> bool {
        let mut controls = self.lock();
        if controls.contains(&id) {
            return false;
        }
        controls.push(id);
        true
    }

    /// Removes a control if present. Returns true if it was queued.
    pub fn remove(&self, id: ControlId) -> bool {
        let mut controls = self.lock();
        match controls.iter().position(|queued| *queued == id) {
            Some(index) => {
                controls.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every queued control owned by `controller`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_controller(&self, controller: ControllerId) -> usize {
        let mut controls = self.lock();
        let before = controls.len();
        controls.retain(|queued| queued.controller() != controller);
        before - controls.len()
    }

    /// Swaps the queue out, leaving it empty. Order of insertion is kept.
    pub fn take(&self) -> Vec<ControlId> {
        std::mem::take(&mut *self.lock())
    }

    #[must_use]
    pub fn contains(&self, id: ControlId) -> bool {
        self.lock().contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ControlId>> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
