//! # Object Memory
//!
//! Type-segregated slab allocation for long-lived engine objects.
//!
//! ## Layers
//!
//! - [`Storage`]: one fixed-capacity slab, O(1) build and destroy
//! - [`MemoryAllocator`]: growable list of slabs for one type
//! - [`BoxedAllocator`]: individually boxed instances for polymorphic types
//! - [`GenericAllocator`]: type-erased view used by tag-only code
//! - [`MemorySystem`]: registry of allocators by type tag
//!
//! Every managed object embeds a [`Handle`] naming its allocator, storage
//! and slot. Lifetime is explicit: nothing is freed until it is destroyed
//! through its handle or its allocator goes away.

mod allocator;
mod boxed;
mod free_queue;
mod generic;
mod handle;
mod storage;
mod system;

pub use allocator::MemoryAllocator;
pub use boxed::BoxedAllocator;
pub use free_queue::FreeSlotQueue;
pub use generic::GenericAllocator;
pub use handle::{AllocatorId, Constructible, Handle};
pub use storage::Storage;
pub use system::MemorySystem;
