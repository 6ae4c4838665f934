//! # Memory Error Types
//!
//! All errors that can occur in the object memory subsystem.

use thiserror::Error;

use crate::datatype::TypeTag;
use crate::memory::AllocatorId;

/// Errors that can occur while building, destroying or looking up objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Handle points past the last storage of its allocator.
    #[error("storage index {storage_i} out of bounds: allocator has {storages} storages")]
    StorageOutOfBounds {
        /// Requested storage index.
        storage_i: u32,
        /// Number of storages in the allocator.
        storages: u32,
    },

    /// Slot index is outside `[0, capacity)`.
    #[error("slot index {slot_i} out of bounds: capacity {capacity}")]
    SlotOutOfBounds {
        /// Requested slot index.
        slot_i: u32,
        /// Slots in the storage.
        capacity: u32,
    },

    /// Handle was never stamped by a storage.
    #[error("handle has no slot assigned")]
    UnsetSlot,

    /// Slot holds no live instance.
    #[error("slot {slot_i} of storage {storage_i} is vacant")]
    VacantSlot {
        /// Storage index.
        storage_i: u32,
        /// Slot index.
        slot_i: u32,
    },

    /// Slot was recycled after the handle was issued.
    #[error("stale handle: slot {slot_i} of storage {storage_i} no longer holds generation {generation}")]
    StaleHandle {
        /// Storage index.
        storage_i: u32,
        /// Slot index.
        slot_i: u32,
        /// Generation recorded in the handle.
        generation: u32,
    },

    /// Free-slot queue cannot take more slot ids.
    #[error("free slot queue full: capacity {capacity}")]
    FreeQueueFull {
        /// Queue capacity.
        capacity: u32,
    },

    /// No allocator is registered for the type tag.
    #[error("allocator for type {0} does not exist")]
    AllocatorNotFound(TypeTag),

    /// An allocator is already registered for the type tag.
    #[error("allocator for type {0} already exists")]
    AllocatorExists(TypeTag),

    /// The registered allocator is not of the requested concrete type.
    #[error("allocator for type {0} has a different concrete type")]
    AllocatorTypeMismatch(TypeTag),

    /// Handle was presented to an allocator of another type.
    #[error("handle of type {found} given to allocator of type {expected}")]
    DatatypeMismatch {
        /// The allocator's own type.
        expected: TypeTag,
        /// The type recorded in the handle.
        found: TypeTag,
    },

    /// Handle was issued by another allocator of the same type.
    #[error("handle owned by allocator {found} given to allocator {expected}")]
    ForeignHandle {
        /// The allocator's own identity.
        expected: AllocatorId,
        /// The owner recorded in the handle.
        found: AllocatorId,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MemoryError::AllocatorNotFound(TypeTag(7));
        assert_eq!(err.to_string(), "allocator for type 7 does not exist");

        let err = MemoryError::SlotOutOfBounds { slot_i: 4, capacity: 4 };
        assert_eq!(err.to_string(), "slot index 4 out of bounds: capacity 4");

        let err = MemoryError::ForeignHandle {
            expected: AllocatorId::NONE,
            found: AllocatorId::NONE,
        };
        assert_eq!(err.to_string(), "handle owned by allocator #0 given to allocator #0");
    }
}
