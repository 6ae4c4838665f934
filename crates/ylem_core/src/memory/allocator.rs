//! # Memory Allocator
//!
//! Growable collection of [`Storage`] slabs for one concrete type.
//!
//! Storages are append-only: a storage's index is its position in the
//! collection and is never reused while the allocator lives.

use std::any::Any;

use super::generic::GenericAllocator;
use super::handle::{AllocatorId, Constructible, Handle};
use super::storage::Storage;
use crate::datatype::TypeTag;
use crate::error::{MemoryError, MemoryResult};

/// Dense slab allocator for objects of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let mut scenes: MemoryAllocator<Scene> = MemoryAllocator::new(Datatype::Scene.into(), 256);
///
/// let handle = *scenes.build_in(Scene::default()).unwrap().handle();
/// scenes.destroy(handle)?;
/// ```
#[derive(Debug)]
pub struct MemoryAllocator<T: Constructible> {
    /// Identity stamped into every handle this allocator issues.
    owner: AllocatorId,
    /// Tag of the managed type.
    datatype: TypeTag,
    /// Capacity of each storage.
    data_size: u32,
    /// Storages in creation order.
    storages: Vec<Storage<T>>,
}

impl<T: Constructible> MemoryAllocator<T> {
    /// Creates an allocator with no storages.
    ///
    /// # Arguments
    ///
    /// * `datatype` - Tag of the managed type
    /// * `data_size` - Number of instances per storage
    ///
    /// # Panics
    ///
    /// Panics if `data_size` is zero.
    #[must_use]
    pub fn new(datatype: TypeTag, data_size: u32) -> Self {
        assert!(data_size > 0, "Data size must be greater than zero");

        Self {
            owner: AllocatorId::next(),
            datatype,
            data_size,
            storages: Vec::new(),
        }
    }

    /// Returns the identity recorded in issued handles.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> AllocatorId {
        self.owner
    }

    /// Returns the number of instances each storage holds.
    #[inline]
    #[must_use]
    pub const fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Returns the storage at `storage_i`.
    #[inline]
    #[must_use]
    pub fn storage(&self, storage_i: u32) -> Option<&Storage<T>> {
        self.storages.get(storage_i as usize)
    }

    /// Builds `value` into the first storage with a free slot, opening a
    /// new storage when every existing one is full.
    ///
    /// Returns None only if the new storage could not take the instance,
    /// which does not happen with a non-zero data size.
    pub fn build_in(&mut self, value: T) -> Option<&mut T> {
        self.build_in_with(|_| value)
    }

    /// Builds the value returned by `build`, which receives the handle the
    /// instance will carry.
    pub fn build_in_with<F>(&mut self, build: F) -> Option<&mut T>
    where
        F: FnOnce(Handle) -> T,
    {
        let available = self.storages.iter().position(|storage| !storage.is_full());
        let storage_i = match available {
            Some(storage_i) => storage_i,
            None => self.open_storage(),
        };

        self.storages[storage_i].build_in_with(build)
    }

    /// Appends an empty storage and returns its position.
    fn open_storage(&mut self) -> usize {
        let storage_i = self.storages.len();
        let index = u32::try_from(storage_i).unwrap_or(u32::MAX);
        tracing::debug!(
            "Opening storage {} for type {} ({} slots)",
            storage_i,
            self.datatype,
            self.data_size
        );
        self.storages.push(Storage::with_owner(
            self.owner,
            self.datatype,
            index,
            self.data_size,
        ));
        storage_i
    }

    /// Resolves the storage a handle points into.
    fn storage_for(&self, handle: Handle) -> MemoryResult<usize> {
        if handle.datatype() != self.datatype {
            return Err(MemoryError::DatatypeMismatch {
                expected: self.datatype,
                found: handle.datatype(),
            });
        }
        if handle.is_null() {
            return Err(MemoryError::UnsetSlot);
        }
        if handle.owner() != self.owner {
            return Err(MemoryError::ForeignHandle {
                expected: self.owner,
                found: handle.owner(),
            });
        }

        let storage_i = handle.storage_i() as usize;
        if storage_i >= self.storages.len() {
            return Err(MemoryError::StorageOutOfBounds {
                storage_i: handle.storage_i(),
                storages: self.number_of_storages(),
            });
        }
        Ok(storage_i)
    }

    /// Resolves a handle to the storage holding its live instance.
    fn live_storage_for(&self, handle: Handle) -> MemoryResult<usize> {
        let storage_i = self.storage_for(handle)?;
        let storage = &self.storages[storage_i];

        if handle.slot_i() >= storage.capacity() {
            return Err(MemoryError::SlotOutOfBounds {
                slot_i: handle.slot_i(),
                capacity: storage.capacity(),
            });
        }
        if !storage.is_current(handle.slot_i(), handle.generation()) {
            return Err(MemoryError::StaleHandle {
                storage_i: handle.storage_i(),
                slot_i: handle.slot_i(),
                generation: handle.generation(),
            });
        }
        Ok(storage_i)
    }

    /// Destroys the instance `handle` refers to.
    ///
    /// # Errors
    ///
    /// Rejects handles of another type, unset handles, out-of-range
    /// indices and handles whose slot was freed or recycled since. Nothing
    /// is destroyed on error.
    pub fn destroy(&mut self, handle: Handle) -> MemoryResult<()> {
        let storage_i = self.live_storage_for(handle).map_err(|err| {
            tracing::warn!("Allocator for type {} rejected destroy: {}", self.datatype, err);
            err
        })?;

        self.storages[storage_i].destroy(handle.slot_i())
    }

    /// Gets the live instance `handle` refers to.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let storage_i = self.live_storage_for(handle).ok()?;
        self.storages[storage_i].get(handle.slot_i())
    }

    /// Gets the live instance `handle` refers to, mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let storage_i = self.live_storage_for(handle).ok()?;
        self.storages[storage_i].get_mut(handle.slot_i())
    }

    /// Iterates over all live instances, storage by storage.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.storages.iter().flat_map(Storage::iter)
    }

    /// Iterates mutably over all live instances, storage by storage.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.storages.iter_mut().flat_map(Storage::iter_mut)
    }

    /// Returns the number of storages.
    #[inline]
    #[must_use]
    pub fn number_of_storages(&self) -> u32 {
        u32::try_from(self.storages.len()).unwrap_or(u32::MAX)
    }

    /// Returns the number of live instances across all storages.
    #[must_use]
    pub fn number_of_instances(&self) -> u32 {
        self.storages.iter().map(Storage::number_of_instances).sum()
    }

    /// Destroys every live instance. Storages stay allocated and keep
    /// their indices, and handles issued before the clear become stale.
    pub fn clear(&mut self) {
        tracing::debug!(
            "Clearing allocator for type {}: {} storages, {} instances",
            self.datatype,
            self.number_of_storages(),
            self.number_of_instances()
        );
        for storage in &mut self.storages {
            storage.clear();
        }
    }
}

impl<T: Constructible + 'static> GenericAllocator for MemoryAllocator<T> {
    fn datatype(&self) -> TypeTag {
        self.datatype
    }

    fn number_of_storages(&self) -> u32 {
        MemoryAllocator::number_of_storages(self)
    }

    fn number_of_instances(&self) -> u32 {
        MemoryAllocator::number_of_instances(self)
    }

    fn destroy(&mut self, handle: Handle) -> MemoryResult<()> {
        MemoryAllocator::destroy(self, handle)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
