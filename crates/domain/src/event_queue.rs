//! Bounded FIFO of domain events awaiting dispatch.

use thiserror::Error;

/// Returned when an operation would record more events than the queue can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue full: {needed} events needed, {remaining} of {capacity} slots free")]
pub struct QueueFull {
    pub needed: usize,
    pub remaining: usize,
    pub capacity: usize,
}

/// Events recorded by an aggregate, in the order they happened.
///
/// The queue is owned by its aggregate and emptied only through [`drain`].
/// Operations that record events reserve room with [`ensure_room`] before
/// changing any state, so a full queue never leaves a half-applied change.
///
/// [`drain`]: EventQueue::drain
/// [`ensure_room`]: EventQueue::ensure_room
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    events: Vec<E>,
    capacity: usize,
}

impl<E> EventQueue<E> {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a queue holding at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. Events already queued are kept even if they
    /// exceed the new limit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events that can still be recorded.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.events.len())
    }

    /// Fails unless `needed` more events fit.
    pub fn ensure_room(&self, needed: usize) -> Result<(), QueueFull> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(QueueFull {
                needed,
                remaining,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Appends an event. Callers reserve room with `ensure_room` first.
    pub(crate) fn push(&mut self, event: E) {
        debug_assert!(self.events.len() < self.capacity, "event queue overflow");
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }

    /// Removes and returns every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
