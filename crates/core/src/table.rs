//! Open-addressed hash table with tombstone deletion.
//!
//! Keys are interned-string [`ObjRef`]s, so key comparison during probing is
//! pointer identity. Collisions are resolved by linear probing; deletion
//! writes a tombstone so probe chains that pass through the deleted slot stay
//! traversable. `count` includes tombstones, which is what the load factor is
//! measured against; growth drops tombstones and re-counts.

use crate::object::ObjRef;
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;

/// One slot. Three states:
/// - empty: `key == None`, `value == Nil`
/// - tombstone: `key == None`, `value == Bool(true)`
/// - live: `key == Some(_)`
#[derive(Debug, Clone, Copy)]
struct Entry {
    key: Option<ObjRef>,
    value: Value,
}

impl Entry {
    const EMPTY: Entry = Entry {
        key: None,
        value: Value::Nil,
    };

    fn is_empty(&self) -> bool {
        self.key.is_none() && matches!(self.value, Value::Nil)
    }
}

#[derive(Debug, Default)]
pub struct Table {
    /// Live entries plus tombstones.
    count: usize,
    entries: Box<[Entry]>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entries + tombstones (the load-factor numerator).
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Find the slot for `key`: its live entry if present, otherwise the
    /// first reusable slot on its probe chain (preferring a tombstone over
    /// the terminating empty slot).
    ///
    /// Requires a non-empty entry array; the load factor keeps at least one
    /// empty slot, so the probe always terminates.
    fn find_entry(entries: &[Entry], key: ObjRef) -> usize {
        let capacity = entries.len();
        let mut index = key.as_string().hash() as usize % capacity;
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match entry.key {
                None => {
                    if entry.is_empty() {
                        // The chain ends here; hand back a remembered
                        // tombstone so inserts reuse it.
                        return tombstone.unwrap_or(index);
                    }
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Some(existing) if existing == key => return index,
                Some(_) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    pub fn get(&self, key: ObjRef) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let entry = &self.entries[Self::find_entry(&self.entries, key)];
        entry.key.map(|_| entry.value)
    }

    /// Insert or overwrite. Returns whether the key was absent before.
    ///
    /// A set that lands on a tombstone does not bump `count`: the tombstone
    /// already counted when the load factor was last measured.
    pub fn set(&mut self, key: ObjRef, value: Value) -> bool {
        if (self.count + 1) as f64 > self.capacity() as f64 * TABLE_MAX_LOAD {
            self.adjust_capacity(grow_capacity(self.capacity()));
        }

        let index = Self::find_entry(&self.entries, key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        if is_new_key && entry.is_empty() {
            self.count += 1;
        }
        entry.key = Some(key);
        entry.value = value;
        is_new_key
    }

    /// Replace the entry with a tombstone. Returns whether the key existed.
    pub fn delete(&mut self, key: ObjRef) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, key);
        let entry = &mut self.entries[index];
        if entry.key.is_none() {
            return false;
        }
        entry.key = None;
        entry.value = Value::Bool(true);
        true
    }

    /// Copy every live entry into `dest`.
    pub fn add_all(&self, dest: &mut Table) {
        for entry in self.entries.iter() {
            if let Some(key) = entry.key {
                dest.set(key, entry.value);
            }
        }
    }

    /// Interning lookup: find the key whose contents equal `chars`.
    ///
    /// This is the one place where strings are compared byte-wise; once a
    /// string is interned through this lookup, everything else compares
    /// handles.
    pub fn find_string(&self, chars: &str, hash: u32) -> Option<ObjRef> {
        if self.count == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut index = hash as usize % capacity;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None => {
                    if entry.is_empty() {
                        return None;
                    }
                }
                Some(key) => {
                    let s = key.as_string();
                    if s.hash() == hash && s.len() == chars.len() && s.as_str() == chars {
                        return Some(key);
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    /// Re-bucket into a fresh array. Only live entries move over; tombstones
    /// are dropped and `count` becomes the live count.
    fn adjust_capacity(&mut self, capacity: usize) {
        let old = std::mem::replace(
            &mut self.entries,
            vec![Entry::EMPTY; capacity].into_boxed_slice(),
        );
        self.count = 0;
        for entry in old.iter() {
            if let Some(key) = entry.key {
                let index = Self::find_entry(&self.entries, key);
                self.entries[index] = *entry;
                self.count += 1;
            }
        }
    }
}

fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 { 8 } else { capacity * 2 }
}
