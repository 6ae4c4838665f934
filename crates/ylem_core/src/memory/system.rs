//! # Memory System
//!
//! Registry of all allocators of one application, keyed by type tag.
//!
//! The system owns its allocators. On drop it destroys every allocator
//! except the root type's first, then the root allocator, so the root
//! object (the universe) outlives everything that refers to it.

use std::collections::HashMap;

use super::allocator::MemoryAllocator;
use super::boxed::BoxedAllocator;
use super::generic::GenericAllocator;
use super::handle::{Constructible, Handle};
use crate::config::MemoryConfig;
use crate::datatype::TypeTag;
use crate::error::{MemoryError, MemoryResult};

/// Owner of every allocator in an application.
///
/// # Example
///
/// ```rust,ignore
/// let mut memory = MemorySystem::new(Datatype::Universe);
///
/// let scenes = memory.get_or_create_storage_allocator::<Scene>(Datatype::Scene.into())?;
/// let mut handle = *scenes.build_in(Scene::default()).unwrap().handle();
///
/// memory.destroy(&mut handle);
/// ```
pub struct MemorySystem {
    /// Allocators by type tag.
    allocators: HashMap<TypeTag, Box<dyn GenericAllocator>>,
    /// Capacities and root type.
    config: MemoryConfig,
}

impl MemorySystem {
    /// Creates an empty system with the built-in capacity table.
    #[must_use]
    pub fn new(root: impl Into<TypeTag>) -> Self {
        Self::with_config(MemoryConfig::default().with_root(root))
    }

    /// Creates an empty system from a configuration.
    #[must_use]
    pub fn with_config(config: MemoryConfig) -> Self {
        tracing::info!("Creating memory system with root type {}", config.root());
        Self {
            allocators: HashMap::new(),
            config,
        }
    }

    /// The type whose allocator is destroyed last.
    #[inline]
    #[must_use]
    pub const fn root_datatype(&self) -> TypeTag {
        self.config.root()
    }

    /// The active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Returns the number of registered allocators.
    #[inline]
    #[must_use]
    pub fn number_of_allocators(&self) -> u32 {
        u32::try_from(self.allocators.len()).unwrap_or(u32::MAX)
    }

    /// Checks if an allocator is registered for `tag`.
    #[inline]
    #[must_use]
    pub fn has_allocator(&self, tag: TypeTag) -> bool {
        self.allocators.contains_key(&tag)
    }

    /// Gets the allocator registered for `tag`.
    ///
    /// # Errors
    ///
    /// `AllocatorNotFound` if none is registered.
    pub fn get_allocator(&self, tag: TypeTag) -> MemoryResult<&dyn GenericAllocator> {
        self.allocators
            .get(&tag)
            .map(|allocator| &**allocator)
            .ok_or(MemoryError::AllocatorNotFound(tag))
    }

    /// Gets the allocator registered for `tag`, mutably.
    ///
    /// # Errors
    ///
    /// `AllocatorNotFound` if none is registered.
    pub fn get_allocator_mut(&mut self, tag: TypeTag) -> MemoryResult<&mut dyn GenericAllocator> {
        match self.allocators.get_mut(&tag) {
            Some(allocator) => Ok(&mut **allocator),
            None => Err(MemoryError::AllocatorNotFound(tag)),
        }
    }

    /// Gets the allocator for `tag` as its concrete type.
    ///
    /// # Errors
    ///
    /// `AllocatorNotFound` if none is registered, `AllocatorTypeMismatch`
    /// if it is not an `A`.
    pub fn allocator<A: GenericAllocator>(&self, tag: TypeTag) -> MemoryResult<&A> {
        self.get_allocator(tag)?
            .as_any()
            .downcast_ref::<A>()
            .ok_or(MemoryError::AllocatorTypeMismatch(tag))
    }

    /// Gets the allocator for `tag` as its concrete type, mutably.
    ///
    /// # Errors
    ///
    /// `AllocatorNotFound` if none is registered, `AllocatorTypeMismatch`
    /// if it is not an `A`.
    pub fn allocator_mut<A: GenericAllocator>(&mut self, tag: TypeTag) -> MemoryResult<&mut A> {
        self.get_allocator_mut(tag)?
            .as_any_mut()
            .downcast_mut::<A>()
            .ok_or(MemoryError::AllocatorTypeMismatch(tag))
    }

    /// Registers `allocator` under `tag`.
    ///
    /// # Errors
    ///
    /// `AllocatorExists` if `tag` is taken, `DatatypeMismatch` if the
    /// allocator manages another type.
    pub fn create_allocator<A: GenericAllocator>(
        &mut self,
        tag: TypeTag,
        allocator: A,
    ) -> MemoryResult<&mut A> {
        self.store_allocator(tag, Box::new(allocator))?;
        self.allocator_mut::<A>(tag)
    }

    /// Takes ownership of an allocator built elsewhere.
    ///
    /// # Errors
    ///
    /// `AllocatorExists` if `tag` is taken, `DatatypeMismatch` if the
    /// allocator manages another type. The allocator is dropped on error.
    pub fn store_allocator(
        &mut self,
        tag: TypeTag,
        allocator: Box<dyn GenericAllocator>,
    ) -> MemoryResult<()> {
        if self.has_allocator(tag) {
            return Err(MemoryError::AllocatorExists(tag));
        }
        if allocator.datatype() != tag {
            return Err(MemoryError::DatatypeMismatch {
                expected: tag,
                found: allocator.datatype(),
            });
        }

        tracing::info!("Creating memory allocator of type {}", tag);
        self.allocators.insert(tag, allocator);
        Ok(())
    }

    /// Returns the allocator for `tag`, creating it with `make` first if
    /// none is registered. An existing allocator is returned untouched.
    ///
    /// # Errors
    ///
    /// `AllocatorTypeMismatch` if the registered allocator is not an `A`,
    /// `DatatypeMismatch` if `make` builds an allocator for another type.
    pub fn get_or_create_allocator<A, F>(&mut self, tag: TypeTag, make: F) -> MemoryResult<&mut A>
    where
        A: GenericAllocator,
        F: FnOnce() -> A,
    {
        if !self.has_allocator(tag) {
            self.store_allocator(tag, Box::new(make()))?;
        }
        self.allocator_mut::<A>(tag)
    }

    /// Returns the dense allocator for `tag`, creating it with the
    /// configured capacity if needed.
    ///
    /// # Errors
    ///
    /// `AllocatorTypeMismatch` if `tag` holds a different allocator.
    pub fn get_or_create_storage_allocator<T>(
        &mut self,
        tag: TypeTag,
    ) -> MemoryResult<&mut MemoryAllocator<T>>
    where
        T: Constructible + 'static,
    {
        let data_size = self.config.capacity_for(tag);
        self.get_or_create_allocator(tag, || MemoryAllocator::new(tag, data_size))
    }

    /// Returns the boxed allocator for `tag`, creating it if needed.
    ///
    /// # Errors
    ///
    /// `AllocatorTypeMismatch` if `tag` holds a different allocator.
    pub fn get_or_create_boxed_allocator<T>(
        &mut self,
        tag: TypeTag,
    ) -> MemoryResult<&mut BoxedAllocator<T>>
    where
        T: ?Sized + Constructible + 'static,
    {
        self.get_or_create_allocator(tag, || BoxedAllocator::new(tag))
    }

    /// Destroys the instance `handle` refers to and marks `handle` dead.
    ///
    /// Does nothing for a handle that is already dead. This is the entry
    /// point external code should use.
    ///
    /// # Returns
    ///
    /// `true` if an instance was destroyed.
    pub fn destroy(&mut self, handle: &mut Handle) -> bool {
        if !handle.is_alive() {
            tracing::debug!("Ignoring destroy of a dead handle");
            return false;
        }

        let Some(allocator) = self.allocators.get_mut(&handle.datatype()) else {
            tracing::warn!(
                "Cannot destroy instance: {}",
                MemoryError::AllocatorNotFound(handle.datatype())
            );
            return false;
        };

        match allocator.destroy(*handle) {
            Ok(()) => {
                handle.mark_dead();
                true
            }
            Err(MemoryError::StaleHandle { .. }) => {
                // The instance is already gone; only the slot lives on.
                handle.mark_dead();
                false
            }
            Err(_) => false,
        }
    }
}

impl Drop for MemorySystem {
    fn drop(&mut self) {
        let root = self.root_datatype();

        tracing::info!("Deleting memory allocators except the root allocator");
        let others: Vec<TypeTag> = self
            .allocators
            .keys()
            .copied()
            .filter(|tag| *tag != root)
            .collect();
        for tag in others {
            if let Some(allocator) = self.allocators.remove(&tag) {
                tracing::debug!(
                    "Deleting allocator of type {} ({} instances)",
                    tag,
                    allocator.number_of_instances()
                );
                drop(allocator);
            }
        }

        if let Some(allocator) = self.allocators.remove(&root) {
            tracing::info!("Deleting the root allocator of type {}", root);
            drop(allocator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Datatype;
    use crate::memory::AllocatorId;
    use std::cell::RefCell;
    use std::rc::Rc;

    type DropLog = Rc<RefCell<Vec<TypeTag>>>;

    struct Node {
        handle: Handle,
        log: DropLog,
    }

    impl Node {
        fn new(log: &DropLog) -> Self {
            Self {
                handle: Handle::default(),
                log: Rc::clone(log),
            }
        }
    }

    impl Constructible for Node {
        fn handle(&self) -> &Handle {
            &self.handle
        }

        fn handle_mut(&mut self) -> &mut Handle {
            &mut self.handle
        }
    }

    impl Drop for Node {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.handle.datatype());
        }
    }

    const UNIVERSE: TypeTag = TypeTag(Datatype::Universe as u32);
    const SCENE: TypeTag = TypeTag(Datatype::Scene as u32);
    const CAMERA: TypeTag = TypeTag(Datatype::Camera as u32);

    fn build(memory: &mut MemorySystem, tag: TypeTag, log: &DropLog) -> Handle {
        let allocator = memory.get_or_create_storage_allocator::<Node>(tag).unwrap();
        *allocator.build_in(Node::new(log)).unwrap().handle()
    }

    #[test]
    fn test_system_starts_empty() {
        let memory = MemorySystem::new(Datatype::Universe);
        assert_eq!(memory.number_of_allocators(), 0);
        assert_eq!(memory.root_datatype(), UNIVERSE);
        assert!(!memory.has_allocator(SCENE));
        assert_eq!(
            memory.get_allocator(SCENE).err(),
            Some(MemoryError::AllocatorNotFound(SCENE))
        );
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let log = DropLog::default();
        let mut memory = MemorySystem::new(Datatype::Universe);

        build(&mut memory, SCENE, &log);
        build(&mut memory, SCENE, &log);

        let scenes = memory.allocator::<MemoryAllocator<Node>>(SCENE).unwrap();
        assert_eq!(scenes.number_of_instances(), 2);
        assert_eq!(scenes.data_size(), Datatype::Scene.default_capacity());
        assert_eq!(memory.number_of_allocators(), 1);
    }

    #[test]
    fn test_create_allocator_twice_fails() {
        let mut memory = MemorySystem::new(Datatype::Universe);
        memory
            .create_allocator(SCENE, MemoryAllocator::<Node>::new(SCENE, 4))
            .unwrap();

        assert!(matches!(
            memory.create_allocator(SCENE, MemoryAllocator::<Node>::new(SCENE, 4)),
            Err(MemoryError::AllocatorExists(_))
        ));
        assert!(matches!(
            memory.create_allocator(CAMERA, MemoryAllocator::<Node>::new(SCENE, 4)),
            Err(MemoryError::DatatypeMismatch { .. })
        ));
        assert_eq!(memory.number_of_allocators(), 1);
    }

    #[test]
    fn test_typed_lookup_mismatch() {
        let mut memory = MemorySystem::new(Datatype::Universe);
        memory.get_or_create_storage_allocator::<Node>(SCENE).unwrap();

        assert!(matches!(
            memory.allocator::<BoxedAllocator<Node>>(SCENE),
            Err(MemoryError::AllocatorTypeMismatch(_))
        ));
        assert!(matches!(
            memory.get_or_create_boxed_allocator::<Node>(SCENE),
            Err(MemoryError::AllocatorTypeMismatch(_))
        ));
    }

    #[test]
    fn test_destroy_marks_handle_dead() {
        let log = DropLog::default();
        let mut memory = MemorySystem::new(Datatype::Universe);
        let mut handle = build(&mut memory, SCENE, &log);

        assert!(memory.destroy(&mut handle));
        assert!(!handle.is_alive());
        assert_eq!(*log.borrow(), vec![SCENE]);

        // Second destroy through the same record is a no-op.
        assert!(!memory.destroy(&mut handle));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(memory.get_allocator(SCENE).unwrap().number_of_instances(), 0);
    }

    #[test]
    fn test_destroy_through_stale_copy_is_noop() {
        let log = DropLog::default();
        let mut memory = MemorySystem::with_config(MemoryConfig::default().with_capacity(SCENE, 1));
        let mut original = build(&mut memory, SCENE, &log);
        let mut copy = original;

        assert!(memory.destroy(&mut original));
        let replacement = build(&mut memory, SCENE, &log);
        assert_eq!(replacement.slot_i(), copy.slot_i());

        assert!(!memory.destroy(&mut copy));
        assert!(!copy.is_alive());
        assert_eq!(memory.get_allocator(SCENE).unwrap().number_of_instances(), 1);
    }

    #[test]
    fn test_destroy_rejects_handle_from_other_system() {
        let log = DropLog::default();
        let mut a = MemorySystem::new(Datatype::Universe);
        let mut b = MemorySystem::new(Datatype::Universe);
        let mut from_a = build(&mut a, SCENE, &log);
        let from_b = build(&mut b, SCENE, &log);
        assert_eq!((from_a.slot_i(), from_a.generation()), (from_b.slot_i(), from_b.generation()));

        assert!(!b.destroy(&mut from_a));
        assert!(from_a.is_alive());
        assert!(log.borrow().is_empty());
        assert_eq!(a.get_allocator(SCENE).unwrap().number_of_instances(), 1);
        assert_eq!(b.get_allocator(SCENE).unwrap().number_of_instances(), 1);

        assert!(a.destroy(&mut from_a));
        assert_eq!(a.get_allocator(SCENE).unwrap().number_of_instances(), 0);
    }

    #[test]
    fn test_destroy_unknown_allocator() {
        let mut memory = MemorySystem::new(Datatype::Universe);
        let mut handle = Handle::new(AllocatorId::next(), CAMERA, 0, 0, 0);
        assert!(!memory.destroy(&mut handle));
        assert!(handle.is_alive());
    }

    #[test]
    fn test_root_allocator_dropped_last() {
        let log = DropLog::default();
        {
            let mut memory = MemorySystem::new(Datatype::Universe);
            build(&mut memory, UNIVERSE, &log);
            for tag in [SCENE, CAMERA, TypeTag(Datatype::Object as u32)] {
                build(&mut memory, tag, &log);
                build(&mut memory, tag, &log);
            }
        }

        let log = log.borrow();
        assert_eq!(log.len(), 7);
        assert_eq!(log.last(), Some(&UNIVERSE));
        assert_eq!(log.iter().filter(|tag| **tag == UNIVERSE).count(), 1);
    }
}
