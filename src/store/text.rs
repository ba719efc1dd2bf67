/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::debug;

use crate::collections::{EntityMap, IdSet};
use crate::error::{Result, StoreError, StoreKind};
use crate::graph::file::GraphFile;
use crate::record::{TextId, TextRecord};

/// Size of the text store's counters header.
const TEXT_HEADER_SIZE: u64 = 12;

/// Manages the storage of variable-length text in fixed blocks.
///
/// A text of `s` bytes occupies `⌈(s + 4) / block_size⌉` contiguous blocks
/// (the 4 bytes are the size header); its id is the 1-based index of the
/// first block. Blocks are handed out by a bump pointer and are not
/// reclaimed when a text is deleted: a deleted text keeps its blocks, with
/// the size header zeroed so the record reads as not in use.
#[derive(Debug)]
pub struct TextStore {
    offset: u64,
    size: u64,
    block_size: u32,
    count: u32,
    next_free_block: u32,
    last_free_block: u32,
    cache: EntityMap<TextRecord>,
    dirty: IdSet,
}

impl TextStore {
    pub(crate) fn new(offset: u64, size: u64, block_size: u32) -> Self {
        Self {
            offset,
            size,
            block_size,
            count: 0,
            next_free_block: 1,
            last_free_block: 1,
            cache: EntityMap::new(),
            dirty: IdSet::new(),
        }
    }

    pub(crate) fn load(
        file: &mut GraphFile,
        offset: u64,
        size: u64,
        block_size: u32,
    ) -> Result<Self> {
        let count = file.read_u32(offset)?;
        let next_free_block = file.read_u32(offset + 4)?;
        let last_free_block = file.read_u32(offset + 8)?;
        Ok(Self {
            offset,
            size,
            block_size,
            count,
            next_free_block,
            last_free_block,
            cache: EntityMap::new(),
            dirty: IdSet::new(),
        })
    }

    /// The number of live texts.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    fn block_offset(&self, id: TextId) -> u64 {
        self.offset + TEXT_HEADER_SIZE + (id as u64 - 1) * self.block_size as u64
    }

    fn blocks_for(&self, size: usize) -> u32 {
        ((size as u64 + 4).div_ceil(self.block_size as u64)) as u32
    }

    /// Returns the text with the given id.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: TextId) -> Result<&TextRecord> {
        if !self.cache.has(id) {
            if id < 1 || self.block_offset(id) + 4 > self.offset + self.size {
                return Err(StoreError::InvalidId(StoreKind::Text, id));
            }
            let size = file.read_u32(self.block_offset(id))?;
            if size == 0 {
                return Err(StoreError::DoesNotExist(StoreKind::Text, id));
            }
            if self.block_offset(id) + 4 + size as u64 > self.offset + self.size {
                return Err(StoreError::Store(StoreKind::Text));
            }
            let mut buf = vec![0u8; size as usize];
            file.read_bytes(self.block_offset(id) + 4, &mut buf)?;
            let value =
                String::from_utf8(buf).map_err(|_| StoreError::Store(StoreKind::Text))?;
            self.cache.set(id, TextRecord::new(id, value));
        }
        let record = self.cache.get(id).expect("cached above");
        if record.is_in_use() {
            Ok(record)
        } else {
            Err(StoreError::DoesNotExist(StoreKind::Text, id))
        }
    }

    /// Stores a new text and returns its id.
    ///
    /// Zero-length text is rejected: a zero size header is the not-in-use
    /// sentinel, and empty strings are represented inline by their owners.
    pub(crate) fn create(&mut self, value: &str) -> Result<TextId> {
        if value.is_empty() {
            return Err(StoreError::Store(StoreKind::Text));
        }
        let id = self.next_free_block;
        self.next_free_block += self.blocks_for(value.len());
        self.last_free_block = self.next_free_block;
        self.cache.set(id, TextRecord::new(id, value.to_owned()));
        self.dirty.add(id);
        self.count += 1;
        Ok(id)
    }

    /// Deletes a text. Its blocks stay allocated; only the size header is
    /// zeroed at the next flush.
    pub(crate) fn delete(&mut self, file: &mut GraphFile, id: TextId) -> Result<()> {
        self.get(file, id)?;
        let record = self.cache.get_mut(id).expect("cached by get");
        record.clear();
        self.dirty.add(id);
        self.count -= 1;
        Ok(())
    }

    /// Serializes every dirty text, then overwrites the counters header.
    /// Same needs-resize contract as the fixed-slot stores: if any dirty
    /// text falls outside the region, nothing is written.
    pub(crate) fn flush(&mut self, file: &mut GraphFile) -> Result<bool> {
        if self.dirty.is_empty() {
            return Ok(false);
        }
        let ids = self.dirty.to_array();
        for &id in &ids {
            let record = self.cache.get(id).expect("dirty texts are always cached");
            let end = self.block_offset(id) + 4 + record.value().len() as u64;
            if end > self.offset + self.size {
                return Err(StoreError::NeedsResize(StoreKind::Text));
            }
        }
        for &id in &ids {
            {
                let record = self.cache.get(id).expect("dirty texts are always cached");
                file.write_u32(self.block_offset(id), record.size())?;
                if record.is_in_use() {
                    file.write_bytes(self.block_offset(id) + 4, record.value().as_bytes())?;
                }
            }
            self.dirty.remove(id);
        }
        self.write_header(file)?;
        debug!("flushed {} text records", ids.len());
        Ok(true)
    }

    /// Overwrites the store's counters header.
    pub(crate) fn write_header(&mut self, file: &mut GraphFile) -> Result<()> {
        file.write_u32(self.offset, self.count)?;
        file.write_u32(self.offset + 4, self.next_free_block)?;
        file.write_u32(self.offset + 8, self.last_free_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn scratch() -> Result<(tempfile::TempDir, GraphFile, TextStore)> {
        let dir = tempfile::tempdir()?;
        let mut file = GraphFile::create(dir.path().join("texts.fdb"))?;
        file.set_len(TEXT_HEADER_SIZE + 32 * 64)?;
        Ok((dir, file, TextStore::new(0, TEXT_HEADER_SIZE + 32 * 64, 32)))
    }

    #[test]
    fn test_block_spans() -> Result<()> {
        let (_dir, mut file, mut store) = scratch()?;
        // 4-byte header + 28 bytes exactly fills one block.
        let one_block = store.create(&"a".repeat(28))?;
        let two_blocks = store.create(&"b".repeat(29))?;
        let next = store.create("c")?;
        assert_eq!(one_block, 1);
        assert_eq!(two_blocks, 2);
        assert_eq!(next, 4);
        assert_eq!(store.count(), 3);

        store.flush(&mut file)?;
        let mut reloaded = TextStore::load(&mut file, 0, store.size, 32)?;
        assert_eq!(reloaded.count(), 3);
        assert_eq!(reloaded.get(&mut file, 2)?.value(), "b".repeat(29));
        assert_eq!(reloaded.get(&mut file, 4)?.value(), "c");
        Ok(())
    }

    #[test]
    fn test_delete_zeroes_header() -> Result<()> {
        let (_dir, mut file, mut store) = scratch()?;
        let id = store.create("ephemeral")?;
        store.flush(&mut file)?;
        store.delete(&mut file, id)?;
        assert_eq!(store.count(), 0);
        store.flush(&mut file)?;

        let mut reloaded = TextStore::load(&mut file, 0, store.size, 32)?;
        assert!(matches!(
            reloaded.get(&mut file, id),
            Err(StoreError::DoesNotExist(StoreKind::Text, _))
        ));
        // The bump pointer does not move backwards.
        assert_eq!(reloaded.create("successor")?, 2);
        Ok(())
    }
}
