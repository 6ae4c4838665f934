//! # Memory Storage
//!
//! Fixed-capacity slab for one concrete object type.
//!
//! A storage reserves all of its slots up front and constructs objects
//! in place. Freed slots are recycled in FIFO order through a
//! [`FreeSlotQueue`]; slots that were never used are handed out in
//! ascending order once the queue is empty.

use super::free_queue::FreeSlotQueue;
use super::handle::{AllocatorId, Constructible, Handle};
use crate::datatype::TypeTag;
use crate::error::{MemoryError, MemoryResult};

/// A slab holding up to `capacity` instances of `T`.
///
/// # Thread Safety
///
/// This storage is NOT thread-safe. The engine drives it from its single
/// control thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: Storage<Scene> = Storage::new(Datatype::Scene.into(), 0, 256);
///
/// // Build - O(1), no heap allocation
/// let handle = *storage.build_in(Scene::default()).unwrap().handle();
///
/// // Destroy - O(1), no heap deallocation
/// storage.destroy(handle.slot_i())?;
/// ```
#[derive(Debug)]
pub struct Storage<T: Constructible> {
    /// Owning allocator stamped into every handle.
    owner: AllocatorId,
    /// Type tag stamped into every handle.
    datatype: TypeTag,
    /// Index of this storage within its allocator.
    storage_i: u32,
    /// The slots. `Some` marks a live instance.
    slots: Box<[Option<T>]>,
    /// Generation of each slot, bumped on every destroy.
    generations: Box<[u32]>,
    /// Recycled slot ids, oldest first.
    free_slots: FreeSlotQueue,
    /// Number of slots.
    capacity: u32,
    /// Number of live instances.
    number_of_instances: u32,
    /// Next never-used slot id.
    high_water_mark: u32,
}

impl<T: Constructible> Storage<T> {
    /// Creates an empty standalone storage with room for `capacity`
    /// instances. It takes a fresh owner identity.
    ///
    /// # Arguments
    ///
    /// * `datatype` - Tag of the owning allocator
    /// * `storage_i` - Index of this storage within its allocator
    /// * `capacity` - Maximum number of live instances
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(datatype: TypeTag, storage_i: u32, capacity: u32) -> Self {
        Self::with_owner(AllocatorId::next(), datatype, storage_i, capacity)
    }

    /// Creates an empty storage whose handles name `owner`.
    #[must_use]
    pub(crate) fn with_owner(
        owner: AllocatorId,
        datatype: TypeTag,
        storage_i: u32,
        capacity: u32,
    ) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();

        Self {
            owner,
            datatype,
            storage_i,
            slots: slots.into_boxed_slice(),
            generations: vec![0; capacity as usize].into_boxed_slice(),
            free_slots: FreeSlotQueue::with_capacity(capacity as usize),
            capacity,
            number_of_instances: 0,
            high_water_mark: 0,
        }
    }

    /// Returns the index of this storage within its allocator.
    #[inline]
    #[must_use]
    pub const fn storage_i(&self) -> u32 {
        self.storage_i
    }

    /// Returns the owner identity stamped into handles.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> AllocatorId {
        self.owner
    }

    /// Returns the type tag stamped into handles.
    #[inline]
    #[must_use]
    pub const fn datatype(&self) -> TypeTag {
        self.datatype
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the number of live instances.
    #[inline]
    #[must_use]
    pub const fn number_of_instances(&self) -> u32 {
        self.number_of_instances
    }

    /// Returns one past the highest slot id ever used.
    #[inline]
    #[must_use]
    pub const fn high_water_mark(&self) -> u32 {
        self.high_water_mark
    }

    /// Checks if every slot holds a live instance.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.number_of_instances >= self.capacity()
    }

    /// Checks if no slot holds a live instance.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.number_of_instances == 0
    }

    /// Builds `value` into a free slot and stamps its handle.
    ///
    /// This is a **O(1)** operation with **zero heap allocations**.
    ///
    /// # Returns
    ///
    /// The instance in its slot, or None if the storage is full.
    pub fn build_in(&mut self, value: T) -> Option<&mut T> {
        self.build_in_with(|_| value)
    }

    /// Builds the value returned by `build` into a free slot.
    ///
    /// `build` receives the handle the instance will carry, so constructors
    /// can record it before the instance is placed. It is not called when
    /// the storage is full. The slot is claimed only after `build` returns.
    pub fn build_in_with<F>(&mut self, build: F) -> Option<&mut T>
    where
        F: FnOnce(Handle) -> T,
    {
        if self.is_full() {
            return None;
        }

        let recycled = self.free_slots.front();
        let slot_i = recycled.unwrap_or(self.high_water_mark);

        let handle = Handle::new(
            self.owner,
            self.datatype,
            self.storage_i,
            slot_i,
            self.generations[slot_i as usize],
        );
        let mut instance = build(handle);
        *instance.handle_mut() = handle;

        if recycled.is_some() {
            self.free_slots.pop();
        } else {
            self.high_water_mark += 1;
        }
        self.number_of_instances += 1;
        tracing::debug!(
            "Built type {} instance in storage {} slot {}",
            self.datatype,
            self.storage_i,
            slot_i
        );

        Some(self.slots[slot_i as usize].insert(instance))
    }

    /// Destroys the instance at `slot_i` and recycles the slot.
    ///
    /// The instance's handle is marked dead before it is dropped.
    ///
    /// # Errors
    ///
    /// `SlotOutOfBounds` if `slot_i` is not below capacity, `VacantSlot`
    /// if the slot holds no live instance. State is unchanged on error.
    pub fn destroy(&mut self, slot_i: u32) -> MemoryResult<()> {
        let Some(slot) = self.slots.get(slot_i as usize) else {
            let err = MemoryError::SlotOutOfBounds {
                slot_i,
                capacity: self.capacity(),
            };
            tracing::warn!("Storage destroy rejected: {}", err);
            return Err(err);
        };
        if slot.is_none() {
            let err = MemoryError::VacantSlot {
                storage_i: self.storage_i,
                slot_i,
            };
            tracing::warn!("Storage destroy rejected: {}", err);
            return Err(err);
        }

        self.free_slots.push(slot_i)?;

        if let Some(mut instance) = self.slots[slot_i as usize].take() {
            instance.handle_mut().mark_dead();
            drop(instance);
        }

        let generation = &mut self.generations[slot_i as usize];
        *generation = generation.wrapping_add(1);
        self.number_of_instances -= 1;

        tracing::debug!(
            "Destroyed type {} instance in storage {} slot {}",
            self.datatype,
            self.storage_i,
            slot_i
        );
        Ok(())
    }

    /// Destroys every live instance and resets slot allocation.
    ///
    /// Memory is kept. Generations of cleared slots are bumped, so handles
    /// issued before the clear stay stale.
    pub fn clear(&mut self) {
        self.drop_live();
        self.free_slots.clear();
        self.high_water_mark = 0;
    }

    /// Drops each live instance exactly once, walking slots in order.
    fn drop_live(&mut self) {
        for (slot, generation) in self.slots.iter_mut().zip(self.generations.iter_mut()) {
            if let Some(mut instance) = slot.take() {
                instance.handle_mut().mark_dead();
                drop(instance);
                *generation = generation.wrapping_add(1);
            }
        }
        self.number_of_instances = 0;
    }

    /// Checks if `slot_i` holds a live instance built with `generation`.
    #[inline]
    #[must_use]
    pub fn is_current(&self, slot_i: u32, generation: u32) -> bool {
        matches!(self.slots.get(slot_i as usize), Some(Some(_)))
            && self.generations[slot_i as usize] == generation
    }

    /// Gets a reference to the live instance at `slot_i`.
    #[inline]
    #[must_use]
    pub fn get(&self, slot_i: u32) -> Option<&T> {
        self.slots.get(slot_i as usize)?.as_ref()
    }

    /// Gets a mutable reference to the live instance at `slot_i`.
    #[inline]
    pub fn get_mut(&mut self, slot_i: u32) -> Option<&mut T> {
        self.slots.get_mut(slot_i as usize)?.as_mut()
    }

    /// Iterates over all live instances in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Iterates mutably over all live instances in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }
}

impl<T: Constructible> Drop for Storage<T> {
    fn drop(&mut self) {
        if self.number_of_instances == 0 {
            return;
        }

        tracing::debug!(
            "Tearing down storage {} of type {} with {} live instances",
            self.storage_i,
            self.datatype,
            self.number_of_instances
        );
        self.drop_live();
    }
}
