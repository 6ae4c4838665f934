//! # Handle Records
//!
//! Every managed object embeds a [`Handle`] that ties it back to the
//! allocator, storage and slot that own it:
//! - The type tag of the owning allocator (a lookup key, never a pointer)
//! - The identity of the owning allocator, so handles from another
//!   allocator of the same type are rejected
//! - Storage and slot indices, fixed for the life of the instance
//! - A generation counter for detecting stale copies after slot reuse
//! - An alive flag guarding against double destroy

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::datatype::TypeTag;

/// Process-unique identity of one allocator.
///
/// Identity only: it never grants access to the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocatorId(u32);

impl AllocatorId {
    /// Owner of handles that were never stamped.
    pub const NONE: Self = Self(0);

    /// Takes the next unused identity.
    #[must_use]
    pub fn next() -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AllocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location and liveness of one managed instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    owner: AllocatorId,
    datatype: TypeTag,
    storage_i: u32,
    slot_i: u32,
    generation: u32,
    alive: bool,
}

impl Handle {
    /// Slot id of a handle that was never stamped by a storage.
    pub const UNSET_SLOT: u32 = u32::MAX;

    /// Null/unset handle.
    pub const NULL: Self = Self {
        owner: AllocatorId::NONE,
        datatype: TypeTag(u32::MAX),
        storage_i: 0,
        slot_i: Self::UNSET_SLOT,
        generation: 0,
        alive: false,
    };

    /// Creates a live handle. Only storages stamp handles.
    #[inline]
    #[must_use]
    pub(crate) const fn new(
        owner: AllocatorId,
        datatype: TypeTag,
        storage_i: u32,
        slot_i: u32,
        generation: u32,
    ) -> Self {
        Self {
            owner,
            datatype,
            storage_i,
            slot_i,
            generation,
            alive: true,
        }
    }

    /// Identity of the owning allocator.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> AllocatorId {
        self.owner
    }

    /// Type tag of the owning allocator.
    #[inline]
    #[must_use]
    pub const fn datatype(&self) -> TypeTag {
        self.datatype
    }

    /// Index of the owning storage within its allocator.
    #[inline]
    #[must_use]
    pub const fn storage_i(&self) -> u32 {
        self.storage_i
    }

    /// Index of the slot within its storage.
    #[inline]
    #[must_use]
    pub const fn slot_i(&self) -> u32 {
        self.slot_i
    }

    /// Slot generation at the time the instance was built.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether the instance has not been destroyed through this record.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Checks if this handle was never stamped.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.slot_i == Self::UNSET_SLOT
    }

    #[inline]
    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

/// An object that can live in a memory allocator.
///
/// The allocator writes the handle record when the instance is built and
/// clears its alive flag right before the instance is dropped.
///
/// # Example
///
/// ```rust,ignore
/// struct Scene {
///     handle: Handle,
///     gravity: f32,
/// }
///
/// impl Constructible for Scene {
///     fn handle(&self) -> &Handle { &self.handle }
///     fn handle_mut(&mut self) -> &mut Handle { &mut self.handle }
/// }
/// ```
pub trait Constructible {
    /// The embedded handle record.
    fn handle(&self) -> &Handle;

    /// Mutable access to the embedded handle record.
    fn handle_mut(&mut self) -> &mut Handle;
}
