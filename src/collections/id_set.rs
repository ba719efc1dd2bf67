/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::collections::hash_u32;
use crate::mem::{record_alloc, record_free};

const DEFAULT_CAPACITY: usize = 32;
const MAX_LOAD: f64 = 0.6;

/// A set of 32-bit ids.
///
/// Open addressing with linear probing; the capacity doubles when the load
/// factor would exceed 0.6. A slot holding 0 is empty and a slot holding
/// [`IdSet::TOMBSTONE`] marks a removed id, so neither value can be stored as
/// a real id. Record ids are 1-based and the stores never allocate anywhere
/// near the tombstone, so the restriction costs nothing in practice.
#[derive(Debug)]
pub struct IdSet {
    ids: Vec<u32>,
    count: usize,
}

impl IdSet {
    /// Marks a removed id. Must never be inserted as a real id.
    pub const TOMBSTONE: u32 = 0x1111_1111;

    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = if capacity < 1 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        record_alloc(capacity * core::mem::size_of::<u32>());
        Self {
            ids: vec![0; capacity],
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.ids.len()
    }

    pub fn has(&self, id: u32) -> bool {
        let capacity = self.ids.len();
        let mut pos = hash_u32(id) as usize % capacity;
        while self.ids[pos] != 0 {
            if self.ids[pos] == id {
                return true;
            }
            pos = (pos + 1) % capacity;
        }
        false
    }

    /// Adds an id to the set. Adding an id already present is a no-op.
    ///
    /// # Panics
    ///
    /// In debug builds, if `id` is 0 or [`IdSet::TOMBSTONE`].
    pub fn add(&mut self, id: u32) {
        debug_assert!(id != 0, "0 is the empty-slot sentinel");
        debug_assert!(id != Self::TOMBSTONE, "the tombstone cannot be a real id");
        if self.has(id) {
            return;
        }
        if (self.count + 1) as f64 / self.ids.len() as f64 > MAX_LOAD {
            self.resize(self.ids.len() * 2);
        }
        self.add_no_checks(id);
    }

    fn add_no_checks(&mut self, id: u32) {
        let capacity = self.ids.len();
        let mut pos = hash_u32(id) as usize % capacity;
        while self.ids[pos] != 0 && self.ids[pos] != Self::TOMBSTONE {
            pos = (pos + 1) % capacity;
        }
        self.ids[pos] = id;
        self.count += 1;
    }

    fn resize(&mut self, new_capacity: usize) {
        record_alloc(new_capacity * core::mem::size_of::<u32>());
        let old = core::mem::replace(&mut self.ids, vec![0; new_capacity]);
        self.count = 0;
        for id in &old {
            if *id != 0 && *id != Self::TOMBSTONE {
                self.add_no_checks(*id);
            }
        }
        record_free(old.len() * core::mem::size_of::<u32>());
    }

    pub fn remove(&mut self, id: u32) {
        let capacity = self.ids.len();
        let mut pos = hash_u32(id) as usize % capacity;
        while self.ids[pos] != 0 {
            if self.ids[pos] == id {
                self.ids[pos] = Self::TOMBSTONE;
                self.count -= 1;
                return;
            }
            pos = (pos + 1) % capacity;
        }
    }

    /// Snapshots the set into an array of exactly `len()` ids, in unspecified
    /// order.
    pub fn to_array(&self) -> Vec<u32> {
        self.ids
            .iter()
            .filter(|&&id| id != 0 && id != Self::TOMBSTONE)
            .copied()
            .collect()
    }
}

impl Default for IdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IdSet {
    fn drop(&mut self) {
        record_free(self.ids.len() * core::mem::size_of::<u32>());
    }
}
