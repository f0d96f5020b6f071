// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Open-addressing hash table keyed by interned strings.
//!
//! Used for the VM's global-variable table, each class's method table,
//! each instance's field table, and the interner's own string-dedup table.
//! Algorithm follows the reference implementation's `table.c` exactly:
//! linear probing, tombstone deletion, 0.75 max load factor, power-of-two
//! capacity.

use crate::value::{GcRef, Value};

const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Clone, Copy)]
struct Entry {
    /// `None` means this slot is empty or a tombstone; `value` tells them
    /// apart (`Nil` = empty, `Bool(true)` = tombstone).
    key: Option<GcRef>,
    value: Value,
}

impl Entry {
    const fn empty() -> Self {
        Self {
            key: None,
            value: Value::Nil,
        }
    }
}

/// A hash table from interned strings to language values.
#[derive(Default)]
pub struct Table {
    count: usize,
    entries: Vec<Entry>,
}

impl Table {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn hash_of(key: GcRef) -> u64 {
        key.as_string().hash
    }

    /// Linear probe starting at `hash & (capacity - 1)`. Returns the index
    /// of a matching key, or the first tombstone/empty slot if the key
    /// isn't present, matching `findEntry` in the reference implementation.
    fn find_entry(entries: &[Entry], hash: u64, key: GcRef) -> usize {
        let mask = entries.len() - 1;
        let mut index = (hash as usize) & mask;
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match entry.key {
                None => {
                    if entry.value == Value::Nil {
                        return tombstone.unwrap_or(index);
                    }
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Some(k) if k == key => return index,
                Some(_) => {}
            }
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut new_entries = vec![Entry::empty(); new_capacity];
        let mut new_count = 0;
        for entry in &self.entries {
            if let Some(key) = entry.key {
                let idx = Self::find_entry(&new_entries, Self::hash_of(key), key);
                new_entries[idx] = *entry;
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    fn ensure_capacity(&mut self) {
        if self.entries.is_empty() {
            self.grow(8);
            return;
        }
        if (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD_FACTOR {
            self.grow(self.capacity() * 2);
        }
    }

    /// Insert or overwrite `key`. Returns `true` if `key` was not already
    /// present.
    pub fn set(&mut self, key: GcRef, value: Value) -> bool {
        self.ensure_capacity();
        let hash = Self::hash_of(key);
        let index = Self::find_entry(&self.entries, hash, key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        if is_new_key && entry.value == Value::Nil {
            self.count += 1;
        }
        entry.key = Some(key);
        entry.value = value;
        is_new_key
    }

    #[must_use]
    pub fn get(&self, key: GcRef) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let index = Self::find_entry(&self.entries, Self::hash_of(key), key);
        self.entries[index].key.map(|_| self.entries[index].value)
    }

    /// Delete `key`, leaving a tombstone. Per the reference algorithm, the
    /// live `count` is not decremented, so later resizes correctly account
    /// for tombstone slots that still need probing past.
    pub fn delete(&mut self, key: GcRef) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let index = Self::find_entry(&self.entries, Self::hash_of(key), key);
        if self.entries[index].key.is_none() {
            return false;
        }
        self.entries[index].key = None;
        self.entries[index].value = Value::Bool(true);
        true
    }

    /// Copy every entry of `self` into `dest` (used for inheriting
    /// superclass methods into a subclass).
    pub fn copy_into(&self, dest: &mut Table) {
        for entry in &self.entries {
            if let Some(key) = entry.key {
                dest.set(key, entry.value);
            }
        }
    }

    /// Find an already-interned string by raw content without needing a
    /// `GcRef` key to compare against (used by the interner before a new
    /// `ObjString` is allocated for `chars`).
    #[must_use]
    pub fn find_string(&self, chars: &str, hash: u64) -> Option<GcRef> {
        if self.entries.is_empty() {
            return None;
        }
        let mask = self.entries.len() - 1;
        let mut index = (hash as usize) & mask;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None if entry.value == Value::Nil => return None,
                Some(key) => {
                    let s = key.as_string();
                    if s.hash == hash && &*s.chars == chars {
                        return Some(key);
                    }
                }
                None => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Mark every live key and value for the GC's mark phase.
    pub fn mark(&self, gray_stack: &mut Vec<GcRef>) {
        for entry in &self.entries {
            if let Some(key) = entry.key {
                if !key.is_marked() {
                    key.mark();
                    gray_stack.push(key);
                }
                if let Value::Obj(obj) = entry.value {
                    if !obj.is_marked() {
                        obj.mark();
                        gray_stack.push(obj);
                    }
                }
            }
        }
    }

    /// Remove entries whose string key did not survive the mark phase
    /// (used to purge dead strings from the interner after sweeping would
    /// otherwise free them while this table still held a weak reference).
    pub fn remove_unmarked_keys(&mut self) {
        for entry in &mut self.entries {
            if let Some(key) = entry.key {
                if !key.is_marked() {
                    entry.key = None;
                    entry.value = Value::Bool(true);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (GcRef, Value)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.key.map(|k| (k, e.value)))
    }
}
