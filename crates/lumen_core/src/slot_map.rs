//! Slot map - Generational storage with owner-stamped keys
//!
//! Every map draws its own owner tag on creation and stamps it into each key
//! it issues. A key resolves only in the map that issued it, and only while
//! the entry it was issued for is still there. Keys from another map, or for
//! an entry that was removed and whose slot was reused, resolve to nothing.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

/// Owner tag 0 is reserved for the null key
static NEXT_OWNER: AtomicU32 = AtomicU32::new(1);

/// Handle to one entry of one [`SlotMap`]
pub struct SlotKey<T> {
    owner: u32,
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotKey<T> {
    const fn new(owner: u32, index: u32, generation: u32) -> Self {
        Self {
            owner,
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// A key no map ever resolves
    pub const fn null() -> Self {
        Self::new(0, u32::MAX, 0)
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.owner == 0
    }

    /// Tag of the map that issued this key
    #[inline]
    pub const fn owner(&self) -> u32 {
        self.owner
    }

    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

// Written by hand so keys are Copy and Eq whatever T is
impl<T> Clone for SlotKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlotKey<T> {}

impl<T> PartialEq for SlotKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for SlotKey<T> {}

impl<T> Hash for SlotKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for SlotKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "SlotKey(null)")
        } else {
            write!(f, "SlotKey({}v{}@{})", self.index, self.generation, self.owner)
        }
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational storage that only honors its own keys
pub struct SlotMap<T> {
    owner: u32,
    slots: Vec<Slot<T>>,
    vacant: Vec<u32>,
}

impl<T> SlotMap<T> {
    /// Create an empty map with a fresh owner tag
    pub fn new() -> Self {
        Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Tag stamped into every key this map issues
    pub fn owner(&self) -> u32 {
        self.owner
    }

    /// The key the next call to [`SlotMap::insert`] will return.
    ///
    /// Lets a value be built with a back-reference to its own key.
    pub fn next_key(&self) -> SlotKey<T> {
        match self.vacant.last() {
            Some(&index) => SlotKey::new(self.owner, index, self.slots[index as usize].generation),
            None => SlotKey::new(self.owner, self.slots.len() as u32, 0),
        }
    }

    pub fn insert(&mut self, value: T) -> SlotKey<T> {
        let key = self.next_key();
        match self.vacant.pop() {
            Some(index) => self.slots[index as usize].value = Some(value),
            None => self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            }),
        }
        key
    }

    /// Take the value out; the slot's generation moves on so `key` goes stale
    pub fn remove(&mut self, key: SlotKey<T>) -> Option<T> {
        if !self.contains_key(key) {
            return None;
        }
        let slot = &mut self.slots[key.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(key.index);
        slot.value.take()
    }

    pub fn get(&self, key: SlotKey<T>) -> Option<&T> {
        self.slot(key)?.value.as_ref()
    }

    pub fn get_mut(&mut self, key: SlotKey<T>) -> Option<&mut T> {
        if key.owner != self.owner {
            return None;
        }
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn contains_key(&self, key: SlotKey<T>) -> bool {
        self.get(key).is_some()
    }

    /// Every live value, in slot order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }

    fn slot(&self, key: SlotKey<T>) -> Option<&Slot<T>> {
        if key.owner != self.owner {
            return None;
        }
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
    }
}
