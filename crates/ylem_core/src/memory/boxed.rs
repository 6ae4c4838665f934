//! # Boxed Allocator
//!
//! Allocator strategy for polymorphic types whose instances differ in
//! concrete type and size, so a dense slab cannot hold them. Each instance
//! is boxed individually; list positions are recycled through a FIFO
//! free-index queue.

use std::any::Any;
use std::collections::VecDeque;

use super::generic::GenericAllocator;
use super::handle::{AllocatorId, Constructible, Handle};
use crate::datatype::TypeTag;
use crate::error::{MemoryError, MemoryResult};

/// Pointer-list allocator for `T`, usually a trait object.
///
/// All instances live in one logical storage (index 0); the slot id is the
/// position in the instance list.
///
/// # Example
///
/// ```rust,ignore
/// let mut overloads: BoxedAllocator<dyn LispOverload> =
///     BoxedAllocator::new(Datatype::GenericLispFunctionOverload.into());
///
/// let handle = *overloads.build_in(Box::new(NumberOverload::default())).handle();
/// overloads.destroy(handle)?;
/// ```
pub struct BoxedAllocator<T: ?Sized + Constructible> {
    /// Identity stamped into every handle this allocator issues.
    owner: AllocatorId,
    /// Tag of the managed type.
    datatype: TypeTag,
    /// Instance list. `Some` marks a live instance.
    instances: Vec<Option<Box<T>>>,
    /// Generation of each list position.
    generations: Vec<u32>,
    /// Recycled list positions, oldest first.
    free_indices: VecDeque<u32>,
    /// Number of live instances.
    number_of_instances: u32,
}

impl<T: ?Sized + Constructible> BoxedAllocator<T> {
    /// Creates an allocator with no instances.
    #[must_use]
    pub fn new(datatype: TypeTag) -> Self {
        Self {
            owner: AllocatorId::next(),
            datatype,
            instances: Vec::new(),
            generations: Vec::new(),
            free_indices: VecDeque::new(),
            number_of_instances: 0,
        }
    }

    /// Returns the identity recorded in issued handles.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> AllocatorId {
        self.owner
    }

    /// Takes ownership of `instance` and stamps its handle.
    pub fn build_in(&mut self, instance: Box<T>) -> &mut T {
        self.build_in_with(|_| instance)
    }

    /// Stores the instance returned by `build`, which receives the handle
    /// the instance will carry. The list position is claimed only after
    /// `build` returns.
    pub fn build_in_with<F>(&mut self, build: F) -> &mut T
    where
        F: FnOnce(Handle) -> Box<T>,
    {
        let recycled = self.free_indices.front().copied();
        let slot_i = recycled.unwrap_or_else(|| self.list_len());
        let generation = self.generations.get(slot_i as usize).copied().unwrap_or(0);

        let handle = Handle::new(self.owner, self.datatype, 0, slot_i, generation);
        let mut instance = build(handle);
        *instance.handle_mut() = handle;

        if recycled.is_some() {
            self.free_indices.pop_front();
        } else {
            self.instances.push(None);
            self.generations.push(generation);
        }
        self.number_of_instances += 1;
        tracing::debug!("Built boxed type {} instance at index {}", self.datatype, slot_i);

        &mut **self.instances[slot_i as usize].insert(instance)
    }

    fn list_len(&self) -> u32 {
        u32::try_from(self.instances.len()).unwrap_or(u32::MAX)
    }

    fn live_index_for(&self, handle: Handle) -> MemoryResult<usize> {
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
        if handle.storage_i() != 0 {
            return Err(MemoryError::StorageOutOfBounds {
                storage_i: handle.storage_i(),
                storages: 1,
            });
        }

        let slot_i = handle.slot_i() as usize;
        match self.instances.get(slot_i) {
            None => Err(MemoryError::SlotOutOfBounds {
                slot_i: handle.slot_i(),
                capacity: self.list_len(),
            }),
            Some(Some(_)) if self.generations[slot_i] == handle.generation() => Ok(slot_i),
            Some(_) => Err(MemoryError::StaleHandle {
                storage_i: 0,
                slot_i: handle.slot_i(),
                generation: handle.generation(),
            }),
        }
    }

    /// Destroys the instance `handle` refers to and recycles its position.
    ///
    /// # Errors
    ///
    /// Same rejections as [`MemoryAllocator::destroy`](super::MemoryAllocator::destroy).
    pub fn destroy(&mut self, handle: Handle) -> MemoryResult<()> {
        let slot_i = self.live_index_for(handle).map_err(|err| {
            tracing::warn!("Boxed allocator for type {} rejected destroy: {}", self.datatype, err);
            err
        })?;

        if let Some(mut instance) = self.instances[slot_i].take() {
            instance.handle_mut().mark_dead();
            drop(instance);
        }
        self.generations[slot_i] = self.generations[slot_i].wrapping_add(1);
        self.free_indices.push_back(handle.slot_i());
        self.number_of_instances -= 1;

        tracing::debug!("Destroyed boxed type {} instance at index {}", self.datatype, slot_i);
        Ok(())
    }

    /// Gets the live instance `handle` refers to.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot_i = self.live_index_for(handle).ok()?;
        self.instances[slot_i].as_deref()
    }

    /// Gets the live instance `handle` refers to, mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot_i = self.live_index_for(handle).ok()?;
        self.instances[slot_i].as_deref_mut()
    }

    /// Iterates over all live instances in list order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.instances.iter().filter_map(Option::as_deref)
    }

    /// Always one: the instance list is a single logical storage.
    #[inline]
    #[must_use]
    pub const fn number_of_storages(&self) -> u32 {
        1
    }

    /// Returns the number of live instances.
    #[inline]
    #[must_use]
    pub const fn number_of_instances(&self) -> u32 {
        self.number_of_instances
    }
}

impl<T: ?Sized + Constructible> Drop for BoxedAllocator<T> {
    fn drop(&mut self) {
        if self.number_of_instances == 0 {
            return;
        }

        tracing::debug!(
            "Tearing down boxed allocator for type {} with {} live instances",
            self.datatype,
            self.number_of_instances
        );
        for slot in &mut self.instances {
            if let Some(mut instance) = slot.take() {
                instance.handle_mut().mark_dead();
                drop(instance);
            }
        }
    }
}

impl<T: ?Sized + Constructible + 'static> GenericAllocator for BoxedAllocator<T> {
    fn datatype(&self) -> TypeTag {
        self.datatype
    }

    fn number_of_storages(&self) -> u32 {
        BoxedAllocator::number_of_storages(self)
    }

    fn number_of_instances(&self) -> u32 {
        BoxedAllocator::number_of_instances(self)
    }

    fn destroy(&mut self, handle: Handle) -> MemoryResult<()> {
        BoxedAllocator::destroy(self, handle)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
