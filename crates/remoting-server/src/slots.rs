//! Integer-keyed table that hands out the smallest free id.

use std::collections::BTreeMap;

/// A table of values addressed by small non-negative ids.
///
/// New entries take the smallest id not currently occupied, so ids are
/// reused after removal.
#[derive(Debug)]
pub struct SlotTable<T> {
    entries: BTreeMap<usize, T>,
}

impl<T> SlotTable<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The id the next [`insert`](Self::insert) would use.
    pub fn next_free(&self) -> usize {
        let mut id = 0;
        for &occupied in self.entries.keys() {
            if occupied != id {
                break;
            }
            id += 1;
        }
        id
    }

    pub fn insert(&mut self, value: T) -> usize {
        let id = self.next_free();
        self.entries.insert(id, value);
        id
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: usize) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
