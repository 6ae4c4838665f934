//! # Ylem Core Engine
//!
//! Object memory for the Ylem simulation engine. Every long-lived engine
//! object (universes, scenes, species, UI text) is built in place inside a
//! per-type slab and addressed through a stable, recyclable handle.
//!
//! ## Architecture Rules
//!
//! 1. **O(1) build and destroy** - Slabs are pre-allocated, slots recycle
//! 2. **Explicit lifetime** - No reference counting, no garbage collection
//! 3. **Single control thread** - No locks anywhere in this crate
//!
//! ## Example
//!
//! ```rust,ignore
//! use ylem_core::{Datatype, MemorySystem};
//!
//! let mut memory = MemorySystem::new(Datatype::Universe);
//! let scenes = memory.get_or_create_storage_allocator::<Scene>(Datatype::Scene.into())?;
//! let mut handle = *scenes.build_in(Scene::default()).unwrap().handle();
//!
//! memory.destroy(&mut handle);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod datatype;
pub mod error;
pub mod memory;

pub use config::MemoryConfig;
pub use datatype::{Datatype, TypeTag};
pub use error::{MemoryError, MemoryResult};
pub use memory::{
    AllocatorId, BoxedAllocator, Constructible, FreeSlotQueue, GenericAllocator, Handle, MemoryAllocator,
    MemorySystem, Storage,
};
