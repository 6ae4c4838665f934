//! # Free Slot Queue
//!
//! Bounded FIFO ring buffer of recycled slot ids. All memory is allocated
//! when the queue is created; push and pop never allocate.

use crate::error::{MemoryError, MemoryResult};

/// A fixed-capacity circular queue of slot ids.
///
/// Slot ids come out in the order they went in, so the oldest recycled
/// slot is always reused first.
#[derive(Debug)]
pub struct FreeSlotQueue {
    /// Ring storage.
    buffer: Box<[u32]>,
    /// Position of the oldest entry.
    head: usize,
    /// Number of queued entries.
    len: usize,
}

impl FreeSlotQueue {
    /// Creates an empty queue able to hold `capacity` slot ids.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of queued slot ids.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if no slot id is queued.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a slot id at the back.
    ///
    /// # Errors
    ///
    /// Returns `FreeQueueFull` if the queue already holds `capacity` ids.
    pub fn push(&mut self, slot_i: u32) -> MemoryResult<()> {
        let capacity = self.capacity();
        if self.len == capacity {
            return Err(MemoryError::FreeQueueFull {
                capacity: u32::try_from(capacity).unwrap_or(u32::MAX),
            });
        }

        let tail = (self.head + self.len) % capacity;
        self.buffer[tail] = slot_i;
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the oldest slot id.
    pub fn pop(&mut self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }

        let slot_i = self.buffer[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(slot_i)
    }

    /// Returns the oldest slot id without removing it.
    #[inline]
    #[must_use]
    pub fn front(&self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }
        Some(self.buffer[self.head])
    }

    /// Discards every queued slot id.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Iterates from the oldest to the newest queued slot id.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |offset| self.buffer[(self.head + offset) % capacity])
    }
}
