/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The machinery shared by every fixed-slot store.
//!
//! A store's region is laid out as a counters header followed by fixed-size
//! slots. Each slot is either *live* (its record's in-use field is nonzero)
//! or *free*; free slots form a linked list threaded through one field of the
//! dead record (the parent id for classes, the refs field for labels, and so
//! on), headed by `next_free_id`. `last_free_id` is the bump pointer: it
//! always names a slot that has never been written, so taking it requires no
//! read.

use log::debug;

use crate::collections::{EntityMap, IdSet};
use crate::error::{Result, StoreError, StoreKind};
use crate::graph::file::GraphFile;

/// Width of a store's ids, header counters, and free-list links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdWidth {
    U16,
    U32,
}

impl IdWidth {
    fn bytes(self) -> u64 {
        match self {
            IdWidth::U16 => 2,
            IdWidth::U32 => 4,
        }
    }

    fn max_value(self) -> u32 {
        match self {
            IdWidth::U16 => u16::MAX as u32,
            IdWidth::U32 => u32::MAX,
        }
    }
}

/// A record that lives in a fixed-size slot.
///
/// A slot is a tagged variant of *live record* or *free-list node*; the tag
/// is the record's in-use sentinel and the free-list link aliases the field
/// at [`LINK_OFFSET`](SlotRecord::LINK_OFFSET).
pub(crate) trait SlotRecord: Sized {
    const KIND: StoreKind;
    const SLOT_SIZE: usize;
    const ID_WIDTH: IdWidth;
    /// Offset within a slot of the field that aliases the free-list link.
    const LINK_OFFSET: u64;

    fn decode(id: u32, bytes: &[u8]) -> Result<Self>;
    fn encode(&self, bytes: &mut [u8]);
    fn in_use(&self) -> bool;
    /// The free-list link stored in a retired record.
    fn free_link(&self) -> u32;
    /// Clears the in-use sentinel and stores the free-list link.
    fn retire(&mut self, next_free: u32);
    /// A retired record for a freed slot that has no cached live form.
    fn retired(id: u32, next_free: u32) -> Self;
}

/// The generic slot store: counters, cache, dirty set, free-list protocol.
#[derive(Debug)]
pub(crate) struct SlotStore<R: SlotRecord> {
    /// Absolute file offset of the store's region.
    pub(crate) offset: u64,
    /// Size of the region in bytes.
    pub(crate) size: u64,
    /// Number of live records.
    pub(crate) count: u32,
    /// Head of the free-list.
    pub(crate) next_free_id: u32,
    /// The first id that has never been written.
    pub(crate) last_free_id: u32,
    /// Holds at least every record with pending changes.
    pub(crate) cache: EntityMap<R>,
    /// Ids whose in-memory state has diverged from disk.
    pub(crate) dirty: IdSet,
}

impl<R: SlotRecord> SlotStore<R> {
    /// A store for a freshly created region: no live records, id 1 is the
    /// first never-written slot.
    pub(crate) fn new(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            count: 0,
            next_free_id: 1,
            last_free_id: 1,
            cache: EntityMap::new(),
            dirty: IdSet::new(),
        }
    }

    /// A store initialized from the counters persisted in an existing file.
    pub(crate) fn load(file: &mut GraphFile, offset: u64, size: u64) -> Result<Self> {
        let width = R::ID_WIDTH.bytes();
        let count = Self::read_counter(file, offset)?;
        let next_free_id = Self::read_counter(file, offset + width)?;
        let last_free_id = Self::read_counter(file, offset + 2 * width)?;
        Ok(Self {
            offset,
            size,
            count,
            next_free_id,
            last_free_id,
            cache: EntityMap::new(),
            dirty: IdSet::new(),
        })
    }

    fn read_counter(file: &mut GraphFile, at: u64) -> Result<u32> {
        match R::ID_WIDTH {
            IdWidth::U16 => Ok(file.read_u16(at)? as u32),
            IdWidth::U32 => file.read_u32(at),
        }
    }

    fn write_counter(file: &mut GraphFile, at: u64, value: u32) -> Result<()> {
        match R::ID_WIDTH {
            IdWidth::U16 => file.write_u16(at, value as u16),
            IdWidth::U32 => file.write_u32(at, value),
        }
    }

    fn header_size() -> u64 {
        3 * R::ID_WIDTH.bytes()
    }

    /// The highest id this region can hold.
    pub(crate) fn max_id(&self) -> u32 {
        let slots = (self.size - Self::header_size()) / R::SLOT_SIZE as u64;
        slots.min(R::ID_WIDTH.max_value() as u64) as u32
    }

    pub(crate) fn slot_offset(&self, id: u32) -> u64 {
        self.offset + Self::header_size() + (id as u64 - 1) * R::SLOT_SIZE as u64
    }

    /// Exclusive upper bound on the ids that may have been written.
    pub(crate) fn id_bound(&self) -> u32 {
        self.last_free_id
    }

    /// Takes an id off the free-list, or bumps the never-written pointer when
    /// the list is exhausted.
    ///
    /// No bounds check happens here: an id past the end of the region is
    /// caught by [`flush`](SlotStore::flush), which reports *needs resize* so
    /// the caller can grow the region and retry.
    pub(crate) fn allocate(&mut self, file: &mut GraphFile) -> Result<u32> {
        let id = self.next_free_id;
        if self.next_free_id == self.last_free_id {
            self.next_free_id += 1;
            self.last_free_id += 1;
        } else if let Some(record) = self.cache.get(id) {
            // The cached record is the tombstone form of a freed slot.
            self.next_free_id = record.free_link();
        } else {
            let link_at = self.slot_offset(id) + R::LINK_OFFSET;
            self.next_free_id = Self::read_counter(file, link_at)?;
        }
        Ok(id)
    }

    /// Pushes an id back on the free-list, retiring its cached record (or
    /// caching a fresh tombstone). The record stays cached and dirty so the
    /// next flush persists the cleared in-use field and the link.
    pub(crate) fn release(&mut self, id: u32) {
        let next = self.next_free_id;
        match self.cache.get_mut(id) {
            Some(record) => record.retire(next),
            None => self.cache.set(id, R::retired(id, next)),
        }
        self.next_free_id = id;
        self.dirty.add(id);
    }

    /// Caches a freshly constructed record and marks it dirty.
    pub(crate) fn insert(&mut self, id: u32, record: R) {
        self.cache.set(id, record);
        self.dirty.add(id);
    }

    pub(crate) fn mark_dirty(&mut self, id: u32) {
        self.dirty.add(id);
    }

    fn ensure_cached(&mut self, file: &mut GraphFile, id: u32) -> Result<()> {
        if self.cache.has(id) {
            return Ok(());
        }
        if id < 1 || id > self.max_id() {
            return Err(StoreError::InvalidId(R::KIND, id));
        }
        let mut buf = vec![0u8; R::SLOT_SIZE];
        file.read_bytes(self.slot_offset(id), &mut buf)?;
        let record = R::decode(id, &buf)?;
        self.cache.set(id, record);
        Ok(())
    }

    /// Returns the record with the given id, reading it from disk if it is
    /// not cached. A cached copy always wins: it may carry changes the file
    /// does not yet reflect.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: u32) -> Result<&mut R> {
        self.ensure_cached(file, id)?;
        let record = self.cache.get_mut(id).expect("cached by ensure_cached");
        if record.in_use() {
            Ok(record)
        } else {
            Err(StoreError::DoesNotExist(R::KIND, id))
        }
    }

    /// Like [`get`](SlotStore::get), but also returns records that are not in
    /// use. Used when scanning slots wholesale.
    pub(crate) fn raw(&mut self, file: &mut GraphFile, id: u32) -> Result<&R> {
        self.ensure_cached(file, id)?;
        Ok(self.cache.get(id).expect("cached by ensure_cached"))
    }

    /// Serializes every dirty record to its slot, then overwrites the
    /// counters header. Slots first, header second: the header is the source
    /// of truth for liveness and free-list state, so slot bytes that got
    /// ahead of it are ignored on the next open.
    ///
    /// If any dirty id falls outside the region, nothing is written and the
    /// dirty set is left untouched, so the caller can grow the region and
    /// retry.
    ///
    /// Returns whether anything was written.
    pub(crate) fn flush(&mut self, file: &mut GraphFile) -> Result<bool> {
        if self.dirty.is_empty() {
            return Ok(false);
        }
        let ids = self.dirty.to_array();
        let max_id = self.max_id();
        if ids.iter().any(|&id| id > max_id) {
            return Err(StoreError::NeedsResize(R::KIND));
        }
        let mut buf = vec![0u8; R::SLOT_SIZE];
        for &id in &ids {
            {
                let record = self.cache.get(id).expect("dirty records are always cached");
                record.encode(&mut buf);
            }
            file.write_bytes(self.slot_offset(id), &buf)?;
            self.dirty.remove(id);
        }
        self.write_counters(file)?;
        debug!("flushed {} {} records", ids.len(), R::KIND);
        Ok(true)
    }

    /// Overwrites the store's counters header.
    pub(crate) fn write_counters(&mut self, file: &mut GraphFile) -> Result<()> {
        let width = R::ID_WIDTH.bytes();
        Self::write_counter(file, self.offset, self.count)?;
        Self::write_counter(file, self.offset + width, self.next_free_id)?;
        Self::write_counter(file, self.offset + 2 * width, self.last_free_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use anyhow::Result;

    /// A minimal 8-byte record: a payload word that doubles as the in-use
    /// sentinel, and a link word aliasing the free-list.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestRecord {
        id: u32,
        payload: u32,
        link: u32,
    }

    impl SlotRecord for TestRecord {
        const KIND: StoreKind = StoreKind::Label;
        const SLOT_SIZE: usize = 8;
        const ID_WIDTH: IdWidth = IdWidth::U32;
        const LINK_OFFSET: u64 = 4;

        fn decode(id: u32, bytes: &[u8]) -> crate::error::Result<Self> {
            Ok(Self {
                id,
                payload: codec::read_u32(bytes, 0),
                link: codec::read_u32(bytes, 4),
            })
        }

        fn encode(&self, bytes: &mut [u8]) {
            codec::write_u32(bytes, 0, self.payload);
            codec::write_u32(bytes, 4, self.link);
        }

        fn in_use(&self) -> bool {
            self.payload != 0
        }

        fn free_link(&self) -> u32 {
            self.link
        }

        fn retire(&mut self, next_free: u32) {
            self.payload = 0;
            self.link = next_free;
        }

        fn retired(id: u32, next_free: u32) -> Self {
            Self {
                id,
                payload: 0,
                link: next_free,
            }
        }
    }

    fn scratch_store(slots: u32) -> Result<(tempfile::TempDir, GraphFile, SlotStore<TestRecord>)> {
        let dir = tempfile::tempdir()?;
        let mut file = GraphFile::create(dir.path().join("slots.fdb"))?;
        let size = 12 + slots as u64 * 8;
        file.set_len(size)?;
        Ok((dir, file, SlotStore::new(0, size)))
    }

    #[test]
    fn test_bump_allocation() -> Result<()> {
        let (_dir, mut file, mut store) = scratch_store(16)?;
        assert_eq!(store.allocate(&mut file)?, 1);
        assert_eq!(store.allocate(&mut file)?, 2);
        assert_eq!(store.allocate(&mut file)?, 3);
        assert_eq!(store.next_free_id, 4);
        assert_eq!(store.last_free_id, 4);
        Ok(())
    }

    #[test]
    fn test_free_list_is_lifo() -> Result<()> {
        let (_dir, mut file, mut store) = scratch_store(16)?;
        for i in 1..=4u32 {
            let id = store.allocate(&mut file)?;
            store.insert(id, TestRecord { id, payload: i, link: 0 });
        }
        store.release(2);
        store.release(4);
        // Walking the threaded links yields the freed ids in LIFO order,
        // terminating at the bump pointer.
        assert_eq!(store.next_free_id, 4);
        assert_eq!(store.cache.get(4).unwrap().free_link(), 2);
        assert_eq!(store.cache.get(2).unwrap().free_link(), 5);
        assert_eq!(store.last_free_id, 5);

        assert_eq!(store.allocate(&mut file)?, 4);
        assert_eq!(store.allocate(&mut file)?, 2);
        assert_eq!(store.allocate(&mut file)?, 5);
        Ok(())
    }

    #[test]
    fn test_free_link_read_from_disk() -> Result<()> {
        let (_dir, mut file, mut store) = scratch_store(16)?;
        for i in 1..=3u32 {
            let id = store.allocate(&mut file)?;
            store.insert(id, TestRecord { id, payload: i, link: 0 });
        }
        store.release(1);
        store.release(3);
        store.flush(&mut file)?;

        // A reloaded store has an empty cache, so allocation follows the
        // links on disk.
        let mut reloaded: SlotStore<TestRecord> = SlotStore::load(&mut file, 0, store.size)?;
        assert_eq!(reloaded.count, store.count);
        assert_eq!(reloaded.allocate(&mut file)?, 3);
        assert_eq!(reloaded.allocate(&mut file)?, 1);
        assert_eq!(reloaded.allocate(&mut file)?, 4);
        Ok(())
    }

    #[test]
    fn test_lookup_returns_cached_record() -> Result<()> {
        let (_dir, mut file, mut store) = scratch_store(16)?;
        let id = store.allocate(&mut file)?;
        store.insert(id, TestRecord { id, payload: 99, link: 0 });
        // Before any flush the lookup must see the in-memory record.
        assert_eq!(store.get(&mut file, id)?.payload, 99);
        assert!(matches!(
            store.get(&mut file, 7),
            Err(StoreError::DoesNotExist(StoreKind::Label, 7))
        ));
        assert!(matches!(
            store.get(&mut file, 17),
            Err(StoreError::InvalidId(StoreKind::Label, 17))
        ));
        Ok(())
    }

    #[test]
    fn test_flush_round_trip() -> Result<()> {
        let (_dir, mut file, mut store) = scratch_store(16)?;
        for i in 1..=5u32 {
            let id = store.allocate(&mut file)?;
            store.insert(id, TestRecord { id, payload: i * 10, link: 0 });
            store.count += 1;
        }
        assert!(store.flush(&mut file)?);
        assert!(store.dirty.is_empty());
        // A second flush with no mutations writes nothing.
        assert!(!store.flush(&mut file)?);

        let mut reloaded: SlotStore<TestRecord> = SlotStore::load(&mut file, 0, store.size)?;
        assert_eq!(reloaded.count, 5);
        assert_eq!(reloaded.next_free_id, 6);
        assert_eq!(reloaded.last_free_id, 6);
        for i in 1..=5u32 {
            assert_eq!(reloaded.get(&mut file, i)?.payload, i * 10);
        }
        Ok(())
    }

    #[test]
    fn test_flush_needs_resize() -> Result<()> {
        let (_dir, mut file, mut store) = scratch_store(2)?;
        assert_eq!(store.max_id(), 2);
        for i in 1..=3u32 {
            let id = store.allocate(&mut file)?;
            store.insert(id, TestRecord { id, payload: i, link: 0 });
            store.count += 1;
        }
        // Id 3 is past the region, so the whole flush aborts and the dirty
        // set is unchanged for a retry.
        assert!(matches!(
            store.flush(&mut file),
            Err(StoreError::NeedsResize(StoreKind::Label))
        ));
        assert_eq!(store.dirty.len(), 3);

        // Grow the region and retry.
        file.set_len(12 + 8 * 8)?;
        store.size = 12 + 8 * 8;
        assert!(store.flush(&mut file)?);
        assert!(store.dirty.is_empty());
        Ok(())
    }
}
