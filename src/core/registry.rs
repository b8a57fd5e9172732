//=========================================================================
// Domain Object Registry
//=========================================================================
//
// Generational handles for domain objects referenced by commands.
//
// Each subsystem owns a registry of its domain objects on its own thread.
// Producers never hold references into it: a command carries an
// `EntityKey`, and the slot generation answers "is this handle still the
// one I meant" at execution time. A stale key resolves to `None`, which
// the drain site turns into a logged no-op.
//
//=========================================================================

//=== External Dependencies ===============================================

use slotmap::SlotMap;

//=== Keys ================================================================

slotmap::new_key_type! {
    /// Generational handle to a registered domain object.
    pub struct EntityKey;
}

//=== DomainRegistry ======================================================

/// Arena of domain objects with generational keys.
///
/// Insertion returns a key that stays cheap to copy into command payloads.
/// Removing an object invalidates its key permanently; a later insert
/// reusing the slot carries a new generation, so old keys can never alias
/// the new object.
pub struct DomainRegistry<T> {
    slots: SlotMap<EntityKey, T>,
}

impl<T> DomainRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }

    /// Registers an object, returning its handle.
    pub fn insert(&mut self, value: T) -> EntityKey {
        self.slots.insert(value)
    }

    /// Unregisters an object, returning it if the key was live.
    pub fn remove(&mut self, key: EntityKey) -> Option<T> {
        self.slots.remove(key)
    }

    /// Resolves a handle, or `None` if it is stale.
    pub fn get(&self, key: EntityKey) -> Option<&T> {
        self.slots.get(key)
    }

    /// Mutably resolves a handle, or `None` if it is stale.
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    /// Whether the handle still points at a live object.
    pub fn contains(&self, key: EntityKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no objects are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> Default for DomainRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
