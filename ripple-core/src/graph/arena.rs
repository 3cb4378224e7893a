//! Generational Arena
//!
//! Cells and computations live in arenas and are addressed by a slot index
//! plus a generation. Freeing a slot bumps its generation, so a key that
//! outlived its entry can never resolve to whatever reuses the slot later.

use std::fmt;

/// A generational key into an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    index: u32,
    generation: u32,
}

impl Key {
    /// The slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation the slot had when this key was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Slot storage with free-list reuse.
#[derive(Debug)]
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Insert a value, reusing a freed slot when one is available.
    pub fn insert(&mut self, value: T) -> Key {
        self.len += 1;

        if let Some(index) = self.free_head {
            let entry = &mut self.entries[index as usize];
            if let Entry::Vacant { generation, next_free } = *entry {
                self.free_head = next_free;
                *entry = Entry::Occupied { generation, value };
                return Key { index, generation };
            }
            unreachable!("free list points at an occupied slot");
        }

        let index = u32::try_from(self.entries.len()).expect("arena exceeded u32::MAX slots");
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        Key {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, key: Key) -> Option<&T> {
        match self.entries.get(key.index as usize)? {
            Entry::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.entries.get_mut(key.index as usize)? {
            Entry::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// Remove the entry for `key`, returning its value.
    ///
    /// The slot's generation is bumped so `key` stays invalid forever.
    pub fn remove(&mut self, key: Key) -> Option<T> {
        let entry = self.entries.get_mut(key.index as usize)?;
        match entry {
            Entry::Occupied { generation, .. } if *generation == key.generation => {}
            _ => return None,
        }

        let vacant = Entry::Vacant {
            generation: key.generation.wrapping_add(1),
            next_free: self.free_head,
        };
        let Entry::Occupied { value, .. } = std::mem::replace(entry, vacant) else {
            return None;
        };

        self.free_head = Some(key.index);
        self.len -= 1;
        Some(value)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
