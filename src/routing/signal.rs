//! Synchronous observer list used for controller notifications.

use std::fmt;

/// Handle returned by [`Signal::connect`], used to disconnect a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Slot<T> = Box<dyn FnMut(&T) + Send>;

/// Ordered list of callbacks fired synchronously on the emitting thread.
pub struct Signal<T: ?Sized> {
    next_id: u64,
    slots: Vec<(SubscriptionId, Slot<T>)>,
}

impl<T: ?Sized> Default for Signal<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            slots: Vec::new(),
        }
    }
}

impl<T: ?Sized> Signal<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback. Callbacks fire in registration order.
    pub fn connect(&mut self, slot: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, Box::new(slot)));
        id
    }

    /// Removes a callback. Returns false if it was not registered.
    pub fn disconnect(&mut self, id: SubscriptionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot_id, _)| *slot_id != id);
        self.slots.len() != before
    }

    pub fn emit(&mut self, value: &T) {
        for (_, slot) in &mut self.slots {
            slot(value);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T: ?Sized> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.len())
            .finish()
    }
}
