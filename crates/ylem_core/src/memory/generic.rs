//! # Generic Allocator Interface
//!
//! Type-erased view of an allocator, used by code that only knows a type
//! tag. Building instances needs the concrete type, so it is only offered
//! by the concrete allocators.

use std::any::Any;

use super::handle::Handle;
use crate::datatype::TypeTag;
use crate::error::MemoryResult;

/// Operations available on any allocator without knowing its element type.
pub trait GenericAllocator: Any {
    /// Type tag of the instances this allocator manages.
    fn datatype(&self) -> TypeTag;

    /// Number of storages currently owned.
    fn number_of_storages(&self) -> u32;

    /// Number of live instances across all storages.
    fn number_of_instances(&self) -> u32;

    /// Destroys the instance `handle` refers to.
    ///
    /// # Errors
    ///
    /// Fails without side effects if the handle does not refer to a live
    /// instance of this allocator.
    fn destroy(&mut self, handle: Handle) -> MemoryResult<()>;

    /// Upcast for downcasting to the concrete allocator.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete allocator.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
