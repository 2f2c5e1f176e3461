//! Generational arena for level-owned entities
//!
//! Handles are `(index, generation)` pairs. A slot's generation is bumped
//! when its occupant is removed, so stale handles resolve to `None` instead
//! of aliasing whatever reuses the slot.
//!
//! Items move through three stages: reserved (handle exists, item held in the
//! pending buffer by the caller), live (in the slot and in `order`), removed.
//! A live item can be taken out temporarily while it is being mutated; during
//! that window it is invisible to lookups and scans.

use std::fmt;

/// Stable reference to an arena item
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}:{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    /// Live handles in insertion order
    order: Vec<EntityHandle>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Allocate a handle without making anything visible yet
    pub fn reserve(&mut self) -> EntityHandle {
        if let Some(index) = self.free.pop() {
            let generation = self.slots[index as usize].generation;
            return EntityHandle { index, generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            item: None,
        });
        EntityHandle {
            index,
            generation: 0,
        }
    }

    /// Make a reserved handle live, appending it to the scan order
    pub fn insert(&mut self, handle: EntityHandle, item: T) -> bool {
        match self.slots.get_mut(handle.index()) {
            Some(slot) if slot.generation == handle.generation && slot.item.is_none() => {
                slot.item = Some(item);
                self.order.push(handle);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.item.as_ref())
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Whether the handle still names its slot: reserved, live or taken out
    pub fn is_current(&self, handle: EntityHandle) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|s| s.generation == handle.generation)
    }

    /// Temporarily move an item out of its slot. It stays in the scan order
    /// but is skipped until `restore` puts it back.
    pub fn take(&mut self, handle: EntityHandle) -> Option<T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.item.take())
    }

    /// Put back an item obtained from `take`
    pub fn restore(&mut self, handle: EntityHandle, item: T) {
        if let Some(slot) = self
            .slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
        {
            slot.item = Some(item);
        }
    }

    /// Remove every live item matching the predicate, keeping order stable
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.order.len());
        for handle in std::mem::take(&mut self.order) {
            let slot = &mut self.slots[handle.index()];
            let drop = slot.item.as_ref().is_some_and(|item| !keep(item));
            if drop {
                removed.extend(slot.item.take());
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
            } else {
                kept.push(handle);
            }
        }
        self.order = kept;
        removed
    }

    /// Snapshot of live handles in insertion order
    pub fn handles(&self) -> Vec<EntityHandle> {
        self.order.clone()
    }

    /// Live items in insertion order, skipping any currently taken out
    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &T)> {
        self.order
            .iter()
            .filter_map(|&h| self.get(h).map(|item| (h, item)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
